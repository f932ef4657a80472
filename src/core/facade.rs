//! Finance tracker facade
//!
//! `FinanceTracker` wires the stores, caches, ledger service and operation
//! pipeline together and is the entry point for every caller. Income and
//! expenses are always recorded through the pipeline; nothing else changes
//! a balance.
//!
//! # Referential Integrity
//!
//! Accounts and categories still referenced by an operation cannot be
//! deleted (`LedgerError::EntityInUse`). Deleting an operation is allowed at
//! any time and does not reverse its balance effect.

use crate::core::cache::CoherentCache;
use crate::core::config::LedgerConfig;
use crate::core::ledger::LedgerService;
use crate::core::pipeline::{FinalizeHook, OperationPipeline};
use crate::core::traits::RecordStore;
use crate::types::{
    Account, AccountId, Category, CategoryId, CategoryKind, LedgerError, Operation, OperationId,
    OperationKind,
};
use rust_decimal::Decimal;
use std::sync::{Arc, PoisonError, RwLock};
use time::Date;

/// Totals of the operations recorded against one account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    /// Current account state
    pub account: Account,
    /// Sum of income amounts
    pub income: Decimal,
    /// Sum of expense amounts
    pub expenses: Decimal,
    /// Number of operations
    pub operations: usize,
}

/// Entry point for accounts, categories and operations
pub struct FinanceTracker {
    config: LedgerConfig,
    ledger: Arc<LedgerService>,
    categories: Arc<CoherentCache<Category>>,
    pipeline: OperationPipeline,

    /// Held shared while recording, exclusively while deleting a category
    category_guard: RwLock<()>,
}

impl FinanceTracker {
    /// Create a tracker over fresh in-memory stores
    pub fn new(config: LedgerConfig) -> Self {
        Self::assemble(
            Arc::new(CoherentCache::in_memory()),
            Arc::new(CoherentCache::in_memory()),
            Arc::new(CoherentCache::in_memory()),
            config,
        )
    }

    /// Create a tracker over existing stores
    ///
    /// Each store is wrapped in its own coherent cache, which loads the
    /// store's current content.
    pub fn with_stores(
        accounts: impl RecordStore<Account> + 'static,
        categories: impl RecordStore<Category> + 'static,
        operations: impl RecordStore<Operation> + 'static,
        config: LedgerConfig,
    ) -> Result<Self, LedgerError> {
        Ok(Self::assemble(
            Arc::new(CoherentCache::new(accounts)?),
            Arc::new(CoherentCache::new(categories)?),
            Arc::new(CoherentCache::new(operations)?),
            config,
        ))
    }

    fn assemble(
        accounts: Arc<CoherentCache<Account>>,
        categories: Arc<CoherentCache<Category>>,
        operations: Arc<CoherentCache<Operation>>,
        config: LedgerConfig,
    ) -> Self {
        let ledger = Arc::new(LedgerService::new(accounts, operations, config.isolation));
        let pipeline = OperationPipeline::new(Arc::clone(&ledger), Arc::clone(&categories));

        tracing::debug!(isolation = %config.isolation, "finance tracker ready");

        FinanceTracker {
            config,
            ledger,
            categories,
            pipeline,
            category_guard: RwLock::new(()),
        }
    }

    /// Replace the pipeline's finalize hook
    pub fn with_finalize_hook(mut self, hook: Arc<dyn FinalizeHook>) -> Self {
        self.pipeline = self.pipeline.with_finalize_hook(hook);
        self
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    // Accounts

    /// Open an account with an initial balance
    pub fn create_account(
        &self,
        name: impl Into<String>,
        initial_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        self.ledger
            .open_account(Account::new(name, initial_balance))
    }

    pub fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.ledger.get_account(id)
    }

    /// All accounts in creation order
    pub fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.ledger.accounts().find_all())
    }

    /// Rename an account
    ///
    /// Only the name is taken from `account`; the stored balance is kept.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account does not exist, `InvalidOperation` if
    /// `account` was never saved.
    pub fn update_account(&self, account: Account) -> Result<Account, LedgerError> {
        self.ledger.rename_account(account)
    }

    /// Delete an account without operations
    ///
    /// # Errors
    ///
    /// `EntityInUse` if operations still belong to the account.
    pub fn delete_account(&self, id: AccountId) -> Result<(), LedgerError> {
        self.ledger.delete_account(id)
    }

    // Categories

    pub fn create_category(
        &self,
        kind: CategoryKind,
        name: impl Into<String>,
    ) -> Result<Category, LedgerError> {
        let category = self.categories.save(Category::new(kind, name))?;
        tracing::info!(category = ?category.id, %kind, name = %category.name, "category created");
        Ok(category)
    }

    pub fn get_category(&self, id: CategoryId) -> Result<Option<Category>, LedgerError> {
        self.categories.find_by_id(id)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, LedgerError> {
        Ok(self.categories.find_all())
    }

    pub fn list_categories_by_kind(&self, kind: CategoryKind) -> Result<Vec<Category>, LedgerError> {
        Ok(self.categories.by_kind(kind))
    }

    /// Rename a category
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if `category` was never saved or its kind
    ///   differs from the stored kind
    /// - `NotFound` if the category does not exist
    pub fn update_category(&self, category: Category) -> Result<Category, LedgerError> {
        let id = category
            .id
            .ok_or_else(|| LedgerError::invalid_operation("category has no id"))?;

        // One cache update: a category deleted meanwhile is reported
        // missing instead of being written back under its old id.
        self.categories
            .update(id, |stored| {
                if stored.kind != category.kind {
                    return Err(LedgerError::invalid_operation(format!(
                        "category {id} is {} and cannot become {}",
                        stored.kind, category.kind
                    )));
                }
                stored.name = category.name;
                Ok(())
            })?
            .ok_or_else(|| LedgerError::not_found("category", id))
    }

    /// Delete a category no operation is filed under
    ///
    /// # Errors
    ///
    /// `EntityInUse` if operations still reference the category.
    pub fn delete_category(&self, id: CategoryId) -> Result<(), LedgerError> {
        let _exclusive = self
            .category_guard
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let operations = self.ledger.operations().count(|op| op.category_id == id);
        if operations > 0 {
            return Err(LedgerError::entity_in_use("category", id, operations));
        }

        self.categories.delete_by_id(id)?;
        tracing::info!(category = id, "category deleted");
        Ok(())
    }

    // Operations

    /// Record income through the operation pipeline
    pub fn record_income(
        &self,
        account_id: AccountId,
        amount: Decimal,
        date: Date,
        description: impl Into<String>,
        category_id: CategoryId,
    ) -> Result<Operation, LedgerError> {
        self.record(Operation::income(
            account_id,
            amount,
            date,
            description,
            category_id,
        ))
    }

    /// Record an expense through the operation pipeline
    pub fn record_expense(
        &self,
        account_id: AccountId,
        amount: Decimal,
        date: Date,
        description: impl Into<String>,
        category_id: CategoryId,
    ) -> Result<Operation, LedgerError> {
        self.record(Operation::expense(
            account_id,
            amount,
            date,
            description,
            category_id,
        ))
    }

    /// Record a prepared, unsaved operation through the pipeline
    pub fn record(&self, operation: Operation) -> Result<Operation, LedgerError> {
        let _shared = self
            .category_guard
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        self.pipeline.process(operation)
    }

    pub fn get_operation(&self, id: OperationId) -> Result<Option<Operation>, LedgerError> {
        self.ledger.operations().find_by_id(id)
    }

    /// All operations in recording order
    pub fn list_operations(&self) -> Result<Vec<Operation>, LedgerError> {
        Ok(self.ledger.operations().find_all())
    }

    pub fn list_operations_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Operation>, LedgerError> {
        Ok(self.ledger.operations().by_account(account_id))
    }

    pub fn list_operations_by_kind(
        &self,
        kind: OperationKind,
    ) -> Result<Vec<Operation>, LedgerError> {
        Ok(self.ledger.operations().by_kind(kind))
    }

    pub fn list_operations_by_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Operation>, LedgerError> {
        Ok(self.ledger.operations().by_category(category_id))
    }

    /// Operations dated from `start` to `end`, both inclusive
    pub fn list_operations_between(
        &self,
        start: Date,
        end: Date,
    ) -> Result<Vec<Operation>, LedgerError> {
        Ok(self.ledger.operations().between(start, end))
    }

    /// Delete an operation record
    ///
    /// The account balance keeps the operation's effect.
    pub fn delete_operation(&self, id: OperationId) -> Result<(), LedgerError> {
        self.ledger.operations().delete_by_id(id)?;
        tracing::info!(operation = id, "operation deleted");
        Ok(())
    }

    /// Income and expense totals for one account
    ///
    /// Returns `None` if the account does not exist.
    pub fn account_summary(
        &self,
        account_id: AccountId,
    ) -> Result<Option<AccountSummary>, LedgerError> {
        let Some(account) = self.ledger.get_account(account_id)? else {
            return Ok(None);
        };

        let operations = self.ledger.operations().by_account(account_id);
        let mut income = Decimal::ZERO;
        let mut expenses = Decimal::ZERO;
        for op in &operations {
            let total = match op.kind {
                OperationKind::Income => &mut income,
                OperationKind::Expense => &mut expenses,
            };
            *total = total
                .checked_add(op.amount)
                .ok_or_else(|| LedgerError::arithmetic_overflow("summary", account_id))?;
        }

        Ok(Some(AccountSummary {
            account,
            income,
            expenses,
            operations: operations.len(),
        }))
    }
}

impl Default for FinanceTracker {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
