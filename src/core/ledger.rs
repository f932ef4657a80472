//! Ledger service
//!
//! `LedgerService` coordinates the account and operation caches. It is the
//! only component that writes account balances, and it owns the per-account
//! locks that implement `IsolationLevel::SerializablePerOperation`.
//!
//! # Locking
//!
//! `isolated` takes the account's lock (serializable mode) and runs a
//! closure under it. The lock is not reentrant: code running inside
//! `isolated` must call the unlocked primitives (`apply_balance_delta`,
//! `get_account`) and never `isolated`, `rename_account` or
//! `delete_account` for the same account.

use crate::core::cache::CoherentCache;
use crate::core::config::IsolationLevel;
use crate::types::{Account, AccountId, LedgerError, Operation};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, PoisonError};

/// Account access and balance updates over the coherent caches
pub struct LedgerService {
    accounts: Arc<CoherentCache<Account>>,
    operations: Arc<CoherentCache<Operation>>,
    isolation: IsolationLevel,

    /// One lock per account, created on first use
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl LedgerService {
    pub fn new(
        accounts: Arc<CoherentCache<Account>>,
        operations: Arc<CoherentCache<Operation>>,
        isolation: IsolationLevel,
    ) -> Self {
        LedgerService {
            accounts,
            operations,
            isolation,
            locks: DashMap::new(),
        }
    }

    /// The account cache
    pub fn accounts(&self) -> &CoherentCache<Account> {
        &self.accounts
    }

    /// The operation cache
    pub fn operations(&self) -> &CoherentCache<Operation> {
        &self.operations
    }

    /// Configured isolation level
    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Copy of the account, or `None` if it does not exist
    pub fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.accounts.find_by_id(id)
    }

    /// Persist a new account
    ///
    /// The account must not carry an identifier yet.
    pub fn open_account(&self, account: Account) -> Result<Account, LedgerError> {
        if let Some(id) = account.id {
            return Err(LedgerError::invalid_operation(format!(
                "account {id} already exists; use rename to change it"
            )));
        }

        let opened = self.accounts.save(account)?;
        tracing::info!(
            account = ?opened.id,
            name = %opened.name,
            balance = %opened.balance,
            "account opened"
        );
        Ok(opened)
    }

    /// Add `delta` to the account's current balance
    ///
    /// The read, the checked addition and the write happen as one cache
    /// update, so a concurrent rename or balance update can neither be lost
    /// nor undo this one. Callers needing validation and update to be atomic
    /// together run both inside `isolated`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the account does not exist
    /// - `ArithmeticOverflow` if the new balance is not representable
    /// - the cache's error if the write fails (the balance is then unchanged)
    pub fn apply_balance_delta(
        &self,
        id: AccountId,
        delta: Decimal,
    ) -> Result<Account, LedgerError> {
        let saved = self
            .accounts
            .update(id, |account| {
                account.balance = account
                    .balance
                    .checked_add(delta)
                    .ok_or_else(|| LedgerError::arithmetic_overflow("balance update", id))?;
                Ok(())
            })?
            .ok_or_else(|| LedgerError::not_found("account", id))?;

        tracing::debug!(account = id, %delta, balance = %saved.balance, "balance updated");
        Ok(saved)
    }

    /// Replace the account's name, keeping the stored balance
    ///
    /// Whatever balance `account` carries is ignored; balances only change
    /// through operations.
    pub fn rename_account(&self, account: Account) -> Result<Account, LedgerError> {
        let id = account
            .id
            .ok_or_else(|| LedgerError::invalid_operation("account has no id"))?;

        self.isolated(id, || {
            self.accounts
                .update(id, |stored| {
                    stored.name = account.name;
                    Ok(())
                })?
                .ok_or_else(|| LedgerError::not_found("account", id))
        })
    }

    /// Delete an account that no operation references
    ///
    /// Deleting an absent account succeeds.
    ///
    /// # Errors
    ///
    /// `EntityInUse` if at least one operation still belongs to the account.
    pub fn delete_account(&self, id: AccountId) -> Result<(), LedgerError> {
        self.isolated(id, || {
            let operations = self.operations.count(|op| op.account_id == id);
            if operations > 0 {
                return Err(LedgerError::entity_in_use("account", id, operations));
            }

            self.accounts.delete_by_id(id)?;
            tracing::info!(account = id, "account deleted");
            Ok(())
        })
    }

    /// Run `f` isolated from other balance-changing calls on the account
    ///
    /// Under `SerializablePerOperation` the account's lock is held for the
    /// whole call. Under `ReadCommittedPerStep` `f` simply runs.
    pub fn isolated<T, F>(&self, id: AccountId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce() -> Result<T, LedgerError>,
    {
        match self.isolation {
            IsolationLevel::ReadCommittedPerStep => f(),
            IsolationLevel::SerializablePerOperation => {
                let lock = self.lock_for(id);
                let result = {
                    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
                    f()
                };
                drop(lock);
                self.prune_lock(id);
                result
            }
        }
    }

    /// Number of per-account locks currently tracked
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    fn lock_for(&self, id: AccountId) -> Arc<Mutex<()>> {
        // Clone out of the map so no shard guard is held while waiting
        self.locks.entry(id).or_default().clone()
    }

    /// Forget the lock of an account that does not exist
    ///
    /// Only removed while the table holds the sole reference: a caller that
    /// cloned the lock keeps it in the table, so two callers never hold
    /// different locks for the same account.
    fn prune_lock(&self, id: AccountId) {
        if !self.accounts.contains(id) {
            self.locks
                .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}
