//! Error types for the finance ledger
//!
//! This module defines all error types that can occur while storing entities
//! or processing operations. Errors are designed to be descriptive enough to
//! show to a user directly.
//!
//! # Error Categories
//!
//! - **Lookup Errors**: an update targets an entity that does not exist
//! - **Validation Errors**: invalid operation, insufficient funds
//! - **Store Errors**: the backing record store failed
//! - **Script Errors**: file not found, I/O errors, malformed CSV rows

use super::account::{AccountId, EntityId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the finance ledger
///
/// Validation variants (`InvalidOperation`, `InsufficientFunds`) are always
/// raised before any store or cache is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// An entity addressed by id does not exist
    ///
    /// Plain lookups return `Ok(None)` instead; this is raised by updates.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity type name ("account", "category", "operation")
        entity: &'static str,
        /// Identifier that was looked up
        id: EntityId,
    },

    /// The proposed operation or update is not acceptable
    ///
    /// Covers non-positive amounts, unknown accounts or categories, category
    /// kind mismatches and attempts to change immutable fields.
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Why the operation was rejected
        reason: String,
    },

    /// Expense exceeds the current account balance
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Account ID
        account: AccountId,
        /// Balance at validation time
        balance: Decimal,
        /// Requested expense amount
        requested: Decimal,
    },

    /// The backing record store failed
    ///
    /// The in-memory store never raises this, but any store implementation
    /// may; the cache and pipeline surface it unchanged.
    #[error("Store failure: {message}")]
    StoreFailure {
        /// Description supplied by the store
        message: String,
    },

    /// The new balance cannot be represented
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Step that would overflow
        operation: String,
        /// Account ID
        account: AccountId,
    },

    /// Deletion refused because operations still reference the entity
    #[error("{entity} {id} is referenced by {operations} operation(s)")]
    EntityInUse {
        /// Entity type name
        entity: &'static str,
        /// Identifier of the entity
        id: EntityId,
        /// Number of operations referencing it
        operations: usize,
    },

    /// Script file not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error while reading a script or writing a report
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// Malformed script row
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create a NotFound error
    pub fn not_found(entity: &'static str, id: EntityId) -> Self {
        LedgerError::NotFound { entity, id }
    }

    /// Create an InvalidOperation error
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        LedgerError::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account,
            balance,
            requested,
        }
    }

    /// Create a StoreFailure error
    pub fn store_failure(message: impl Into<String>) -> Self {
        LedgerError::StoreFailure {
            message: message.into(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create an EntityInUse error
    pub fn entity_in_use(entity: &'static str, id: EntityId, operations: usize) -> Self {
        LedgerError::EntityInUse {
            entity,
            id,
            operations,
        }
    }
}
