//! Core traits for entity storage
//!
//! This module defines the abstractions that let the coherent cache sit in
//! front of any record store, and that let one generic store and one generic
//! cache serve accounts, categories and operations alike.

use crate::types::{Account, Category, EntityId, LedgerError, Operation};
use std::sync::Arc;

/// A value that can be kept in a record store
///
/// Entities are plain values: `Clone` is the copy taken at every store and
/// cache boundary, so a caller never shares an instance with the store.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Entity type name used in errors and logs
    const NAME: &'static str;

    /// Identifier, `None` until first saved
    fn id(&self) -> Option<EntityId>;

    /// Set the identifier (called by the store on first save)
    fn assign_id(&mut self, id: EntityId);
}

impl Entity for Account {
    const NAME: &'static str = "account";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}

impl Entity for Category {
    const NAME: &'static str = "category";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}

impl Entity for Operation {
    const NAME: &'static str = "operation";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}

/// Keyed storage of one entity type
///
/// Every method takes or returns owned values. Implementations must keep
/// their own copy of what they store, assign identifiers monotonically
/// starting at 1, and never reuse an identifier after deletion.
pub trait RecordStore<E: Entity>: Send + Sync {
    /// Store an entity, assigning an identifier when it carries none
    ///
    /// Returns a copy of what was stored (always with an identifier).
    fn save(&self, entity: E) -> Result<E, LedgerError>;

    /// Get a copy of the entity with the given identifier
    fn find_by_id(&self, id: EntityId) -> Result<Option<E>, LedgerError>;

    /// Get copies of every stored entity in ascending identifier order
    fn find_all(&self) -> Result<Vec<E>, LedgerError>;

    /// Remove the entity with the given identifier
    ///
    /// Deleting an absent identifier is not an error.
    fn delete_by_id(&self, id: EntityId) -> Result<(), LedgerError>;
}

impl<E: Entity, S: RecordStore<E> + ?Sized> RecordStore<E> for Arc<S> {
    fn save(&self, entity: E) -> Result<E, LedgerError> {
        (**self).save(entity)
    }

    fn find_by_id(&self, id: EntityId) -> Result<Option<E>, LedgerError> {
        (**self).find_by_id(id)
    }

    fn find_all(&self) -> Result<Vec<E>, LedgerError> {
        (**self).find_all()
    }

    fn delete_by_id(&self, id: EntityId) -> Result<(), LedgerError> {
        (**self).delete_by_id(id)
    }
}
