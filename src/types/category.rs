//! Category types
//!
//! A category labels operations. Its kind is fixed when it is created and
//! decides which operations may reference it.

use super::account::EntityId;
use std::fmt;

/// Category identifier
pub type CategoryId = EntityId;

/// Whether a category groups income or expenses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKind {
    Income,
    Expense,
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKind::Income => write!(f, "income"),
            CategoryKind::Expense => write!(f, "expense"),
        }
    }
}

/// Operation category
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// Store-assigned identifier, `None` until the category is first saved
    pub id: Option<CategoryId>,

    /// Display name
    pub name: String,

    /// Income or expense; immutable after creation
    pub kind: CategoryKind,
}

impl Category {
    /// Create an unsaved category
    pub fn new(kind: CategoryKind, name: impl Into<String>) -> Self {
        Category {
            id: None,
            name: name.into(),
            kind,
        }
    }
}
