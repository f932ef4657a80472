//! Core business logic module
//!
//! This module contains the ledger components, leaves first:
//! - `traits` - Entity and record store abstractions
//! - `record_store` - In-memory record store with monotonic identifiers
//! - `instrumented` - Call-counting, fault-injecting store wrapper
//! - `cache` - Read-through / write-through coherent cache
//! - `config` - Isolation level and ledger configuration
//! - `ledger` - Account access and the only writer of balances
//! - `pipeline` - Validate, execute, update-balance and finalize stages
//! - `facade` - `FinanceTracker`, the entry point for callers

pub mod cache;
pub mod config;
pub mod facade;
pub mod instrumented;
pub mod ledger;
pub mod pipeline;
pub mod record_store;
pub mod traits;

pub use cache::CoherentCache;
pub use config::{IsolationLevel, LedgerConfig};
pub use facade::{AccountSummary, FinanceTracker};
pub use instrumented::{InstrumentedStore, StoreCalls};
pub use ledger::LedgerService;
pub use pipeline::{FinalizeHook, OperationPipeline, PipelineStage, TimingHook};
pub use record_store::InMemoryStore;
pub use traits::{Entity, RecordStore};
