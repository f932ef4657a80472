//! Operation types for the finance ledger
//!
//! An operation is a single income or expense event recorded against one
//! account. Operations are created by the operation pipeline and never
//! edited afterwards; they can only be deleted.

use super::account::{AccountId, EntityId};
use super::category::{CategoryId, CategoryKind};
use rust_decimal::Decimal;
use std::fmt;
use time::Date;

/// Operation identifier
pub type OperationId = EntityId;

/// Operation kinds supported by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Credit the owning account
    ///
    /// Must reference an income category.
    Income,

    /// Debit the owning account
    ///
    /// Must reference an expense category and requires the account balance
    /// to cover the amount at validation time.
    Expense,
}

impl OperationKind {
    /// The category kind an operation of this kind must reference
    pub fn category_kind(self) -> CategoryKind {
        match self {
            OperationKind::Income => CategoryKind::Income,
            OperationKind::Expense => CategoryKind::Expense,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Income => write!(f, "income"),
            OperationKind::Expense => write!(f, "expense"),
        }
    }
}

/// Recorded income or expense
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Store-assigned identifier, `None` until the pipeline persists it
    pub id: Option<OperationId>,

    /// Income or expense
    pub kind: OperationKind,

    /// Account whose balance this operation affects
    pub account_id: AccountId,

    /// Positive amount; the sign of the balance effect comes from `kind`
    pub amount: Decimal,

    /// Calendar date, no timezone
    pub date: Date,

    /// Free-text description
    pub description: String,

    /// Category of matching kind
    pub category_id: CategoryId,
}

impl Operation {
    /// Build an unsaved income operation
    pub fn income(
        account_id: AccountId,
        amount: Decimal,
        date: Date,
        description: impl Into<String>,
        category_id: CategoryId,
    ) -> Self {
        Self::new(
            OperationKind::Income,
            account_id,
            amount,
            date,
            description,
            category_id,
        )
    }

    /// Build an unsaved expense operation
    pub fn expense(
        account_id: AccountId,
        amount: Decimal,
        date: Date,
        description: impl Into<String>,
        category_id: CategoryId,
    ) -> Self {
        Self::new(
            OperationKind::Expense,
            account_id,
            amount,
            date,
            description,
            category_id,
        )
    }

    fn new(
        kind: OperationKind,
        account_id: AccountId,
        amount: Decimal,
        date: Date,
        description: impl Into<String>,
        category_id: CategoryId,
    ) -> Self {
        Operation {
            id: None,
            kind,
            account_id,
            amount,
            date,
            description: description.into(),
            category_id,
        }
    }
}
