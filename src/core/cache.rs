//! Read-through / write-through cache in front of a record store
//!
//! This module provides `CoherentCache`, the single generic cache used for
//! accounts, categories and operations.
//!
//! # Coherence
//!
//! - Construction loads every entity from the store into the mirror.
//! - Writes go to the store first; the mirror is only updated with what the
//!   store returned, and only after the store call succeeded. A failing
//!   store therefore leaves the mirror exactly as it was.
//! - Reads are served from the mirror. A miss falls through to the store and
//!   populates the mirror when the store has the entity.
//! - Listing and filtering never touch the store: after construction every
//!   committed write has passed through the mirror.
//!
//! Writers (save, update, delete, miss population) are serialized by one lock per
//! cache so a store write and its mirror update are never interleaved with
//! another writer's. Readers of mirror hits take no cache lock; `DashMap`
//! makes each single-key read and insert atomic.
//!
//! # Copies
//!
//! Every value going in or out is cloned. Nothing returned by the cache
//! shares state with the mirror or with the store.

use crate::core::record_store::InMemoryStore;
use crate::core::traits::{Entity, RecordStore};
use crate::types::{
    AccountId, Category, CategoryId, CategoryKind, EntityId, LedgerError, Operation,
    OperationKind,
};
use dashmap::DashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::Date;

/// Coherent in-memory mirror of one record store
pub struct CoherentCache<E: Entity> {
    /// Backing store, exclusively owned by this cache
    store: Box<dyn RecordStore<E>>,

    /// Mirror of committed store content by identifier
    mirror: DashMap<EntityId, E>,

    /// Serializes store writes together with their mirror update
    write_lock: Mutex<()>,
}

impl<E: Entity> CoherentCache<E> {
    /// Bind a cache to a store and load all of its entities
    ///
    /// # Errors
    ///
    /// Returns the store's error if the initial `find_all` fails, or a
    /// `StoreFailure` if the store returns an entity without an identifier.
    pub fn new(store: impl RecordStore<E> + 'static) -> Result<Self, LedgerError> {
        Self::from_boxed(Box::new(store))
    }

    /// Bind a cache to an already boxed store
    pub fn from_boxed(store: Box<dyn RecordStore<E>>) -> Result<Self, LedgerError> {
        let mirror = DashMap::new();
        for entity in store.find_all()? {
            let id = Self::stored_id(&entity)?;
            mirror.insert(id, entity);
        }

        tracing::debug!(entity = E::NAME, loaded = mirror.len(), "cache populated");

        Ok(CoherentCache {
            store,
            mirror,
            write_lock: Mutex::new(()),
        })
    }

    /// Cache over a fresh, empty in-memory store
    pub fn in_memory() -> Self {
        CoherentCache {
            store: Box::new(InMemoryStore::new()),
            mirror: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Save through to the store, then mirror the stored copy
    ///
    /// Returns the copy the store produced, carrying its identifier.
    pub fn save(&self, entity: E) -> Result<E, LedgerError> {
        let _writer = self.lock_writes();

        let saved = self.store.save(entity)?;
        let id = Self::stored_id(&saved)?;
        self.mirror.insert(id, saved.clone());

        Ok(saved)
    }

    /// Read, modify and save an existing entity as one writer step
    ///
    /// The current copy is taken from the mirror (or the store on a miss),
    /// handed to `modify`, and the result saved through to the store, all
    /// while holding the writer lock. No other save or delete on this cache
    /// can land between the read and the write.
    ///
    /// Returns `Ok(None)` without calling `modify` or the store's `save`
    /// when the entity does not exist, so a concurrently deleted entity is
    /// never written back. An error from `modify` aborts the update with
    /// nothing written.
    pub fn update<F>(&self, id: EntityId, modify: F) -> Result<Option<E>, LedgerError>
    where
        F: FnOnce(&mut E) -> Result<(), LedgerError>,
    {
        let _writer = self.lock_writes();

        let current = match self.cached(id) {
            Some(cached) => Some(cached),
            None => self.store.find_by_id(id)?,
        };
        let Some(mut entity) = current else {
            return Ok(None);
        };

        modify(&mut entity)?;

        let saved = self.store.save(entity)?;
        let saved_id = Self::stored_id(&saved)?;
        self.mirror.insert(saved_id, saved.clone());

        Ok(Some(saved))
    }

    /// Look up an entity by identifier
    ///
    /// A mirror hit does not call the store.
    pub fn find_by_id(&self, id: EntityId) -> Result<Option<E>, LedgerError> {
        if let Some(cached) = self.cached(id) {
            return Ok(Some(cached));
        }

        let _writer = self.lock_writes();

        // Another writer may have filled the slot while we waited.
        if let Some(cached) = self.cached(id) {
            return Ok(Some(cached));
        }

        tracing::debug!(entity = E::NAME, id, "cache miss");
        let found = self.store.find_by_id(id)?;
        if let Some(entity) = &found {
            self.mirror.insert(id, entity.clone());
        }

        Ok(found)
    }

    /// Snapshot of every mirrored entity in ascending identifier order
    pub fn find_all(&self) -> Vec<E> {
        self.filter(|_| true)
    }

    /// Snapshot of the mirrored entities matching `predicate`
    ///
    /// Results are in ascending identifier order.
    pub fn filter<P>(&self, predicate: P) -> Vec<E>
    where
        P: Fn(&E) -> bool,
    {
        let mut matching: Vec<(EntityId, E)> = self
            .mirror
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        matching.sort_by_key(|(id, _)| *id);
        matching.into_iter().map(|(_, entity)| entity).collect()
    }

    /// Number of mirrored entities matching `predicate`
    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&E) -> bool,
    {
        self.mirror
            .iter()
            .filter(|entry| predicate(entry.value()))
            .count()
    }

    /// Delete the given entity
    ///
    /// An entity that was never saved has nothing to delete.
    pub fn delete(&self, entity: &E) -> Result<(), LedgerError> {
        match entity.id() {
            Some(id) => self.delete_by_id(id),
            None => Ok(()),
        }
    }

    /// Delete by identifier from the store, then from the mirror
    ///
    /// If the store fails the mirror entry is kept. Deleting an absent
    /// identifier is not an error.
    pub fn delete_by_id(&self, id: EntityId) -> Result<(), LedgerError> {
        let _writer = self.lock_writes();

        self.store.delete_by_id(id)?;
        self.mirror.remove(&id);

        Ok(())
    }

    /// Whether the mirror holds the identifier
    pub fn contains(&self, id: EntityId) -> bool {
        self.mirror.contains_key(&id)
    }

    /// Number of mirrored entities
    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    /// Whether the mirror is empty
    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }

    /// The backing store
    pub fn store(&self) -> &dyn RecordStore<E> {
        self.store.as_ref()
    }

    fn cached(&self, id: EntityId) -> Option<E> {
        self.mirror.get(&id).map(|entry| entry.value().clone())
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn stored_id(entity: &E) -> Result<EntityId, LedgerError> {
        entity.id().ok_or_else(|| {
            LedgerError::store_failure(format!("store returned {} without an id", E::NAME))
        })
    }
}

impl CoherentCache<Operation> {
    /// Operations belonging to an account
    pub fn by_account(&self, account_id: AccountId) -> Vec<Operation> {
        self.filter(|op| op.account_id == account_id)
    }

    /// Operations of one kind
    pub fn by_kind(&self, kind: OperationKind) -> Vec<Operation> {
        self.filter(|op| op.kind == kind)
    }

    /// Operations filed under a category
    pub fn by_category(&self, category_id: CategoryId) -> Vec<Operation> {
        self.filter(|op| op.category_id == category_id)
    }

    /// Operations dated within `start..=end`
    ///
    /// An inverted range matches nothing.
    pub fn between(&self, start: Date, end: Date) -> Vec<Operation> {
        self.filter(|op| start <= op.date && op.date <= end)
    }
}

impl CoherentCache<Category> {
    /// Categories of one kind
    pub fn by_kind(&self, kind: CategoryKind) -> Vec<Category> {
        self.filter(|category| category.kind == kind)
    }
}
