//! Account-related types for the finance ledger
//!
//! This module defines the Account structure and the identifier types shared
//! by every stored entity.

use rust_decimal::Decimal;

/// Identifier assigned by a record store
///
/// Identifiers start at 1 and are never reused within a process lifetime.
pub type EntityId = u64;

/// Account identifier
pub type AccountId = EntityId;

/// Bank account state
///
/// The balance is only ever changed by the operation pipeline (through the
/// ledger service). Renaming goes through the facade and leaves the balance
/// untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Store-assigned identifier, `None` until the account is first saved
    pub id: Option<AccountId>,

    /// Display name
    pub name: String,

    /// Current balance
    ///
    /// Signed and unbounded in sign: an account may be opened with a negative
    /// balance, and under read-committed isolation concurrent expenses can
    /// drive it below zero.
    pub balance: Decimal,
}

impl Account {
    /// Create an unsaved account with the given opening balance
    pub fn new(name: impl Into<String>, balance: Decimal) -> Self {
        Account {
            id: None,
            name: name.into(),
            balance,
        }
    }
}
