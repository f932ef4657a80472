//! Script command types
//!
//! A ledger script is a sequence of commands, one per CSV row. Each command
//! maps onto exactly one `FinanceTracker` call.

use super::category::CategoryKind;
use super::operation::Operation;
use rust_decimal::Decimal;

/// One parsed script row
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    /// Open an account
    ///
    /// The script's `amount` column is the initial balance (zero when empty).
    OpenAccount { name: String, balance: Decimal },

    /// Create a category of the given kind
    CreateCategory { kind: CategoryKind, name: String },

    /// Record an unsaved income or expense through the pipeline
    Record(Operation),
}
