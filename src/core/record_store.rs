//! In-memory record store
//!
//! This module provides `InMemoryStore`, the backing store behind every
//! coherent cache. It keeps one entity type per instance and assigns
//! identifiers from an atomic counter.
//!
//! # Identifier Assignment
//!
//! Identifiers start at 1 and grow by one per newly saved entity. Deleting an
//! entity never gives its identifier back. Saving an entity that already
//! carries an identifier stores it under that identifier and moves the
//! counter past it, so a later assignment cannot collide with it.
//!
//! # Copies
//!
//! The store keeps its own clone of every saved entity and hands out clones
//! on every read. Mutating a value returned by the store never changes what
//! the store holds.

use crate::core::traits::{Entity, RecordStore};
use crate::types::{EntityId, LedgerError};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-lifetime store for one entity type
///
/// Uses `DashMap` so individual saves, reads and deletes are atomic per key
/// and safe to call from several threads.
#[derive(Debug)]
pub struct InMemoryStore<E: Entity> {
    /// Stored entities by identifier
    records: DashMap<EntityId, E>,

    /// Highest identifier handed out or observed so far
    last_id: AtomicU64,
}

impl<E: Entity> InMemoryStore<E> {
    /// Create an empty store
    pub fn new() -> Self {
        InMemoryStore {
            records: DashMap::new(),
            last_id: AtomicU64::new(0),
        }
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no entities
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<E: Entity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> RecordStore<E> for InMemoryStore<E> {
    fn save(&self, mut entity: E) -> Result<E, LedgerError> {
        let id = match entity.id() {
            Some(id) => {
                self.last_id.fetch_max(id, Ordering::SeqCst);
                id
            }
            None => {
                let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
                entity.assign_id(id);
                id
            }
        };

        self.records.insert(id, entity.clone());
        Ok(entity)
    }

    fn find_by_id(&self, id: EntityId) -> Result<Option<E>, LedgerError> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    fn find_all(&self) -> Result<Vec<E>, LedgerError> {
        let mut all: Vec<(EntityId, E)> = self
            .records
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        Ok(all.into_iter().map(|(_, entity)| entity).collect())
    }

    fn delete_by_id(&self, id: EntityId) -> Result<(), LedgerError> {
        self.records.remove(&id);
        Ok(())
    }
}
