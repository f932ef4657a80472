//! Finance Ledger Library
//! # Overview
//!
//! This library tracks bank accounts, categorized income and expense
//! operations, and the balances they produce, for a single user.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Category, Operation, errors)
//! - [`cli`] - CLI arguments parsing and log setup
//! - [`core`] - Business logic components:
//!   - [`core::record_store`] - Keyed entity storage with monotonic identifiers
//!   - [`core::cache`] - Read-through / write-through cache in front of a store
//!   - [`core::ledger`] - Account access; the only writer of balances
//!   - [`core::pipeline`] - Validate, execute, update-balance, finalize
//!   - [`core::facade`] - `FinanceTracker`, the entry point for callers
//! - [`io`] - Ledger script parsing and CSV reports
//! - [`runner`] - Applies a script to a tracker and writes a report
//!
//! # Operation Kinds
//!
//! - **Income**: credits the account; must use an income category
//! - **Expense**: debits the account; must use an expense category and is
//!   rejected when it exceeds the balance
//!
//! # Guarantees
//!
//! - A rejected or failed operation never changes a balance
//! - No operation stays recorded without its balance effect
//! - Caches never diverge from their stores and never hand out shared state

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod runner;
pub mod types;

pub use core::{FinanceTracker, IsolationLevel, LedgerConfig};
pub use io::{write_accounts_csv, write_operations_csv};
pub use runner::{RunSummary, ScriptRunner};
pub use types::{
    Account, AccountId, Category, CategoryId, CategoryKind, LedgerError, Operation, OperationId,
    OperationKind,
};
