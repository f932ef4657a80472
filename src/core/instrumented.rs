//! Call-counting record store wrapper
//!
//! `InstrumentedStore` forwards every call to an inner store and counts it.
//! It can also be told to fail saves or deletes, which is how the cache and
//! pipeline failure paths are exercised without a real external store.

use crate::core::record_store::InMemoryStore;
use crate::core::traits::{Entity, RecordStore};
use crate::types::{EntityId, LedgerError};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Snapshot of how often each store method was called
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub save: usize,
    pub find_by_id: usize,
    pub find_all: usize,
    pub delete_by_id: usize,
}

impl StoreCalls {
    /// Total number of calls of any kind
    pub fn total(&self) -> usize {
        self.save + self.find_by_id + self.find_all + self.delete_by_id
    }
}

/// Record store wrapper that counts calls and can inject failures
#[derive(Debug)]
pub struct InstrumentedStore<E: Entity, S: RecordStore<E> = InMemoryStore<E>> {
    inner: S,
    save_calls: AtomicUsize,
    find_by_id_calls: AtomicUsize,
    find_all_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_saves: AtomicBool,
    fail_deletes: AtomicBool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> InstrumentedStore<E> {
    /// Wrap a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }
}

impl<E: Entity, S: RecordStore<E>> InstrumentedStore<E, S> {
    /// Wrap an existing store
    pub fn new(inner: S) -> Self {
        InstrumentedStore {
            inner,
            save_calls: AtomicUsize::new(0),
            find_by_id_calls: AtomicUsize::new(0),
            find_all_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            _entity: PhantomData,
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Calls observed so far
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            save: self.save_calls.load(Ordering::SeqCst),
            find_by_id: self.find_by_id_calls.load(Ordering::SeqCst),
            find_all: self.find_all_calls.load(Ordering::SeqCst),
            delete_by_id: self.delete_calls.load(Ordering::SeqCst),
        }
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent deletes fail (or succeed again)
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

impl<E: Entity, S: RecordStore<E>> RecordStore<E> for InstrumentedStore<E, S> {
    fn save(&self, entity: E) -> Result<E, LedgerError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(LedgerError::store_failure(format!(
                "{} save rejected",
                E::NAME
            )));
        }
        self.inner.save(entity)
    }

    fn find_by_id(&self, id: EntityId) -> Result<Option<E>, LedgerError> {
        self.find_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(id)
    }

    fn find_all(&self) -> Result<Vec<E>, LedgerError> {
        self.find_all_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_all()
    }

    fn delete_by_id(&self, id: EntityId) -> Result<(), LedgerError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(LedgerError::store_failure(format!(
                "{} {id} delete rejected",
                E::NAME
            )));
        }
        self.inner.delete_by_id(id)
    }
}
