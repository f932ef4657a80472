//! Ledger configuration
//!
//! The only tunable is how strongly operations on the same account are
//! isolated from each other.

use std::fmt;

/// Isolation between concurrent operations on one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Each pipeline step commits on its own
    ///
    /// Two expenses racing on one account may both validate against the
    /// same balance, so the account can be driven below zero.
    ReadCommittedPerStep,

    /// A per-account lock is held across the whole pipeline invocation
    ///
    /// Validation, persistence and the balance write of one operation are
    /// observed atomically by every other operation on the same account.
    #[default]
    SerializablePerOperation,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::ReadCommittedPerStep => write!(f, "read-committed"),
            IsolationLevel::SerializablePerOperation => write!(f, "serializable"),
        }
    }
}

/// Configuration for a `FinanceTracker`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerConfig {
    /// Isolation level for balance-changing calls
    pub isolation: IsolationLevel,
}

impl LedgerConfig {
    /// Create a configuration with the given isolation level
    pub fn new(isolation: IsolationLevel) -> Self {
        Self { isolation }
    }
}
