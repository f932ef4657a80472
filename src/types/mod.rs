//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account type and identifier aliases
//! - `category`: Category and category kind
//! - `operation`: Operation and operation kind
//! - `command`: Parsed ledger script commands
//! - `error`: Error types for the finance ledger

pub mod account;
pub mod category;
pub mod command;
pub mod error;
pub mod operation;

pub use account::{Account, AccountId, EntityId};
pub use category::{Category, CategoryId, CategoryKind};
pub use command::ScriptCommand;
pub use error::LedgerError;
pub use operation::{Operation, OperationId, OperationKind};
