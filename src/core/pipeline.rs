//! Operation pipeline
//!
//! Every income and expense goes through the same four stages:
//!
//! 1. **Validate**: the operation is new, its amount is positive, its
//!    account and category exist, the category kind matches, and the
//!    kind-specific check passes (expenses must be covered by the balance).
//! 2. **Execute**: the operation is persisted through the operation cache,
//!    which assigns its identifier.
//! 3. **Update balance**: the signed amount is applied to the account
//!    through the ledger service. If this fails the persisted operation is
//!    deleted again, so an operation is never left recorded without its
//!    balance effect.
//! 4. **Finalize**: the finalize hook runs. Hook failures are logged and
//!    never fail the operation.
//!
//! Validation failures happen before any store or cache is written.
//!
//! The kind-specific behavior is confined to two pure functions, `sign` and
//! `extra_validate`; the stages themselves are shared.

use crate::core::cache::CoherentCache;
use crate::core::ledger::LedgerService;
use crate::types::{Account, Category, LedgerError, Operation, OperationKind};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Signed balance effect of an operation
pub fn sign(kind: OperationKind, amount: Decimal) -> Decimal {
    match kind {
        OperationKind::Income => amount,
        OperationKind::Expense => -amount,
    }
}

/// Kind-specific validation against the account as read at validation time
///
/// # Errors
///
/// `InsufficientFunds` when an expense exceeds the balance. An expense equal
/// to the balance is allowed.
pub fn extra_validate(
    kind: OperationKind,
    account: &Account,
    amount: Decimal,
) -> Result<(), LedgerError> {
    match kind {
        OperationKind::Income => Ok(()),
        OperationKind::Expense => {
            if account.balance < amount {
                Err(LedgerError::insufficient_funds(
                    account.id.unwrap_or_default(),
                    account.balance,
                    amount,
                ))
            } else {
                Ok(())
            }
        }
    }
}

/// Progress of one operation through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Created,
    Validated,
    Persisted,
    BalanceUpdated,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Created => "created",
            PipelineStage::Validated => "validated",
            PipelineStage::Persisted => "persisted",
            PipelineStage::BalanceUpdated => "balance-updated",
            PipelineStage::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Last stage of the pipeline
///
/// Called once per committed operation with the time spent since the
/// operation entered the pipeline. An error is logged, never propagated.
pub trait FinalizeHook: Send + Sync {
    fn finalize(&self, operation: &Operation, elapsed: Duration) -> Result<(), LedgerError>;
}

/// Default finalize hook: logs how long the operation took
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingHook;

impl FinalizeHook for TimingHook {
    fn finalize(&self, operation: &Operation, elapsed: Duration) -> Result<(), LedgerError> {
        tracing::debug!(
            operation = ?operation.id,
            elapsed_us = elapsed_micros(elapsed),
            "operation timing"
        );
        Ok(())
    }
}

/// Whole microseconds in `elapsed`, saturating at `u64::MAX`
fn elapsed_micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

/// Validate, persist and apply income and expense operations
pub struct OperationPipeline {
    ledger: Arc<LedgerService>,
    categories: Arc<CoherentCache<Category>>,
    finalize: Arc<dyn FinalizeHook>,
}

impl OperationPipeline {
    /// Create a pipeline with the default timing hook
    pub fn new(ledger: Arc<LedgerService>, categories: Arc<CoherentCache<Category>>) -> Self {
        OperationPipeline {
            ledger,
            categories,
            finalize: Arc::new(TimingHook),
        }
    }

    /// Replace the finalize hook
    pub fn with_finalize_hook(mut self, hook: Arc<dyn FinalizeHook>) -> Self {
        self.finalize = hook;
        self
    }

    /// Run an operation through every stage
    ///
    /// Returns the persisted operation carrying its new identifier. Under
    /// serializable isolation the whole run holds the account's lock.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` / `InsufficientFunds` / `ArithmeticOverflow`
    ///   from validation, with nothing written
    /// - a store error from execute, with nothing written
    /// - a store error from the balance update, after the persisted
    ///   operation was deleted again
    pub fn process(&self, operation: Operation) -> Result<Operation, LedgerError> {
        let started = Instant::now();
        let span = tracing::debug_span!(
            "process",
            kind = %operation.kind,
            account = operation.account_id,
            amount = %operation.amount
        );
        let _entered = span.enter();
        Self::trace_stage(PipelineStage::Created);

        let result = self.ledger.isolated(operation.account_id, || {
            self.validate(&operation)?;
            Self::trace_stage(PipelineStage::Validated);

            let persisted = self.execute(operation)?;
            Self::trace_stage(PipelineStage::Persisted);

            self.update_balance(&persisted)?;
            Self::trace_stage(PipelineStage::BalanceUpdated);

            self.finish(&persisted, started.elapsed());
            Self::trace_stage(PipelineStage::Done);
            Ok(persisted)
        });

        match &result {
            Ok(persisted) => tracing::info!(operation = ?persisted.id, "operation recorded"),
            Err(e) => tracing::warn!(error = %e, "operation rejected"),
        }
        result
    }

    fn validate(&self, operation: &Operation) -> Result<(), LedgerError> {
        if let Some(id) = operation.id {
            return Err(LedgerError::invalid_operation(format!(
                "operation {id} has already been recorded"
            )));
        }

        if operation.amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_operation(format!(
                "amount must be positive, got {}",
                operation.amount
            )));
        }

        let account = self
            .ledger
            .get_account(operation.account_id)?
            .ok_or_else(|| {
                LedgerError::invalid_operation(format!(
                    "account {} does not exist",
                    operation.account_id
                ))
            })?;

        let category = self
            .categories
            .find_by_id(operation.category_id)?
            .ok_or_else(|| {
                LedgerError::invalid_operation(format!(
                    "category {} does not exist",
                    operation.category_id
                ))
            })?;

        if category.kind != operation.kind.category_kind() {
            return Err(LedgerError::invalid_operation(format!(
                "{} operation cannot use {} category {}",
                operation.kind, category.kind, operation.category_id
            )));
        }

        extra_validate(operation.kind, &account, operation.amount)?;

        if account
            .balance
            .checked_add(sign(operation.kind, operation.amount))
            .is_none()
        {
            return Err(LedgerError::arithmetic_overflow(
                &operation.kind.to_string(),
                operation.account_id,
            ));
        }

        Ok(())
    }

    fn execute(&self, operation: Operation) -> Result<Operation, LedgerError> {
        self.ledger.operations().save(operation)
    }

    fn update_balance(&self, persisted: &Operation) -> Result<(), LedgerError> {
        let delta = sign(persisted.kind, persisted.amount);
        let Err(e) = self.ledger.apply_balance_delta(persisted.account_id, delta) else {
            return Ok(());
        };

        if let Some(id) = persisted.id {
            if let Err(undo) = self.ledger.operations().delete_by_id(id) {
                tracing::error!(
                    operation = id,
                    error = %undo,
                    "operation recorded without its balance effect"
                );
            }
        }
        Err(e)
    }

    fn finish(&self, persisted: &Operation, elapsed: Duration) {
        if let Err(e) = self.finalize.finalize(persisted, elapsed) {
            tracing::warn!(operation = ?persisted.id, error = %e, "finalize hook failed");
        }
    }

    fn trace_stage(stage: PipelineStage) {
        tracing::debug!(%stage, "pipeline stage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::IsolationLevel;
    use crate::core::instrumented::InstrumentedStore;
    use crate::core::traits::RecordStore;
    use crate::types::CategoryKind;
    use rstest::rstest;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use time::macros::date;

    const SALARY: u64 = 1;
    const FOOD: u64 = 2;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    struct Fixture {
        accounts: Arc<InstrumentedStore<Account>>,
        operations: Arc<InstrumentedStore<Operation>>,
        ledger: Arc<LedgerService>,
        pipeline: OperationPipeline,
    }

    /// One account (id 1) with the given balance, an income category
    /// (SALARY) and an expense category (FOOD)
    fn fixture(balance: &str, isolation: IsolationLevel) -> Fixture {
        let accounts = Arc::new(InstrumentedStore::in_memory());
        let operations = Arc::new(InstrumentedStore::in_memory());
        let ledger = Arc::new(LedgerService::new(
            Arc::new(CoherentCache::new(Arc::clone(&accounts)).unwrap()),
            Arc::new(CoherentCache::new(Arc::clone(&operations)).unwrap()),
            isolation,
        ));
        let categories = Arc::new(CoherentCache::in_memory());
        categories
            .save(Category::new(CategoryKind::Income, "Salary"))
            .unwrap();
        categories
            .save(Category::new(CategoryKind::Expense, "Food"))
            .unwrap();
        ledger
            .open_account(Account::new("Checking", dec(balance)))
            .unwrap();

        let pipeline = OperationPipeline::new(Arc::clone(&ledger), categories);
        Fixture {
            accounts,
            operations,
            ledger,
            pipeline,
        }
    }

    fn balance(fixture: &Fixture) -> Decimal {
        fixture.ledger.get_account(1).unwrap().unwrap().balance
    }

    fn expense(amount: &str) -> Operation {
        Operation::expense(1, dec(amount), date!(2025 - 02 - 14), "groceries", FOOD)
    }

    fn income(amount: &str) -> Operation {
        Operation::income(1, dec(amount), date!(2025 - 02 - 01), "pay", SALARY)
    }

    #[rstest]
    #[case(OperationKind::Income, "12.5", "12.5")]
    #[case(OperationKind::Expense, "12.5", "-12.5")]
    fn test_sign(#[case] kind: OperationKind, #[case] amount: &str, #[case] expected: &str) {
        assert_eq!(sign(kind, dec(amount)), dec(expected));
    }

    #[rstest]
    #[case::income_ignores_balance(OperationKind::Income, "0", "500", true)]
    #[case::expense_below_balance(OperationKind::Expense, "100", "99.99", true)]
    #[case::expense_equal_to_balance(OperationKind::Expense, "100", "100", true)]
    #[case::expense_above_balance(OperationKind::Expense, "100", "100.01", false)]
    fn test_extra_validate(
        #[case] kind: OperationKind,
        #[case] balance: &str,
        #[case] amount: &str,
        #[case] accepted: bool,
    ) {
        let mut account = Account::new("Checking", dec(balance));
        account.id = Some(4);

        let result = extra_validate(kind, &account, dec(amount));

        assert_eq!(result.is_ok(), accepted);
        if !accepted {
            assert_eq!(
                result,
                Err(LedgerError::insufficient_funds(4, dec(balance), dec(amount)))
            );
        }
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::BalanceUpdated.to_string(), "balance-updated");
        assert_eq!(PipelineStage::Done.to_string(), "done");
    }

    #[rstest]
    #[case(Duration::ZERO, 0)]
    #[case(Duration::from_millis(3), 3_000)]
    #[case(Duration::MAX, u64::MAX)]
    fn test_elapsed_micros_saturates(#[case] elapsed: Duration, #[case] expected: u64) {
        assert_eq!(elapsed_micros(elapsed), expected);
    }

    #[test]
    fn test_unknown_accounts_leave_no_tracked_locks() {
        let f = fixture("100", IsolationLevel::SerializablePerOperation);
        f.pipeline.process(income("1")).unwrap();
        let tracked = f.ledger.tracked_locks();

        for account_id in 1_000..1_100 {
            let result = f.pipeline.process(Operation::income(
                account_id,
                Decimal::ONE,
                date!(2025 - 01 - 01),
                "x",
                SALARY,
            ));
            assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
        }

        assert_eq!(f.ledger.tracked_locks(), tracked);
        assert_eq!(tracked, 1);
    }

    #[test]
    fn test_income_credits_account() {
        let f = fixture("250", IsolationLevel::default());

        let recorded = f.pipeline.process(income("100")).unwrap();

        assert_eq!(recorded.id, Some(1));
        assert_eq!(balance(&f), dec("350"));
        let for_account = f.ledger.operations().filter(|op| op.account_id == 1);
        assert_eq!(for_account, vec![recorded]);
    }

    #[test]
    fn test_expense_then_insufficient_funds() {
        let f = fixture("1000", IsolationLevel::default());

        f.pipeline.process(expense("300")).unwrap();
        assert_eq!(balance(&f), dec("700"));

        let result = f.pipeline.process(expense("800"));

        assert_eq!(
            result,
            Err(LedgerError::insufficient_funds(1, dec("700"), dec("800")))
        );
        assert_eq!(balance(&f), dec("700"));
        assert_eq!(f.ledger.operations().len(), 1);
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-5")]
    fn test_non_positive_amount_rejected(#[case] amount: &str) {
        let f = fixture("100", IsolationLevel::default());
        let before = f.operations.calls();

        let result = f.pipeline.process(income(amount));

        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
        assert_eq!(balance(&f), dec("100"));
        assert_eq!(f.operations.calls().save, before.save);
    }

    #[rstest]
    #[case::income_with_expense_category(
        Operation::income(1, Decimal::TEN, date!(2025 - 01 - 01), "x", FOOD)
    )]
    #[case::expense_with_income_category(
        Operation::expense(1, Decimal::TEN, date!(2025 - 01 - 01), "x", SALARY)
    )]
    #[case::unknown_category(Operation::income(1, Decimal::TEN, date!(2025 - 01 - 01), "x", 99))]
    #[case::unknown_account(Operation::income(42, Decimal::TEN, date!(2025 - 01 - 01), "x", SALARY))]
    fn test_invalid_references_have_no_side_effects(#[case] operation: Operation) {
        let f = fixture("100", IsolationLevel::default());
        let account_saves = f.accounts.calls().save;

        let result = f.pipeline.process(operation);

        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
        assert_eq!(balance(&f), dec("100"));
        assert!(f.ledger.operations().is_empty());
        assert_eq!(f.operations.calls().save, 0);
        assert_eq!(f.accounts.calls().save, account_saves);
    }

    #[test]
    fn test_already_recorded_operation_rejected() {
        let f = fixture("100", IsolationLevel::default());
        let recorded = f.pipeline.process(income("10")).unwrap();

        let result = f.pipeline.process(recorded);

        assert!(matches!(result, Err(LedgerError::InvalidOperation { .. })));
        assert_eq!(balance(&f), dec("110"));
        assert_eq!(f.ledger.operations().len(), 1);
    }

    #[test]
    fn test_overflowing_income_rejected_at_validation() {
        let f = fixture("0", IsolationLevel::default());
        f.ledger.apply_balance_delta(1, Decimal::MAX).unwrap();

        let result = f.pipeline.process(income("1"));

        assert!(matches!(
            result,
            Err(LedgerError::ArithmeticOverflow { account: 1, .. })
        ));
        assert!(f.ledger.operations().is_empty());
        assert_eq!(balance(&f), Decimal::MAX);
    }

    #[test]
    fn test_store_failure_during_execute_leaves_balance() {
        let f = fixture("100", IsolationLevel::default());
        f.operations.fail_saves(true);

        let result = f.pipeline.process(expense("40"));

        assert!(matches!(result, Err(LedgerError::StoreFailure { .. })));
        assert_eq!(balance(&f), dec("100"));
        assert!(f.ledger.operations().is_empty());
    }

    #[test]
    fn test_failed_balance_update_removes_persisted_operation() {
        let f = fixture("100", IsolationLevel::default());
        f.accounts.fail_saves(true);

        let result = f.pipeline.process(expense("40"));

        assert!(matches!(result, Err(LedgerError::StoreFailure { .. })));
        assert_eq!(balance(&f), dec("100"));
        assert!(f.ledger.operations().is_empty());
        assert!(f.operations.inner().find_all().unwrap().is_empty());
    }

    struct FailingHook;

    impl FinalizeHook for FailingHook {
        fn finalize(&self, _: &Operation, _: Duration) -> Result<(), LedgerError> {
            Err(LedgerError::store_failure("audit log unavailable"))
        }
    }

    #[test]
    fn test_failing_finalize_hook_does_not_fail_operation() {
        let f = fixture("100", IsolationLevel::default());
        let pipeline = f.pipeline.with_finalize_hook(Arc::new(FailingHook));

        let recorded = pipeline.process(income("5")).unwrap();

        assert_eq!(recorded.id, Some(1));
        assert_eq!(f.ledger.get_account(1).unwrap().unwrap().balance, dec("105"));
        assert_eq!(f.ledger.operations().len(), 1);
    }

    #[derive(Default)]
    struct CountingHook {
        calls: AtomicUsize,
    }

    impl FinalizeHook for CountingHook {
        fn finalize(&self, operation: &Operation, _: Duration) -> Result<(), LedgerError> {
            assert!(operation.id.is_some());
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_finalize_runs_only_for_committed_operations() {
        let hook = Arc::new(CountingHook::default());
        let f = fixture("100", IsolationLevel::default());
        let pipeline = f.pipeline.with_finalize_hook(hook.clone());

        pipeline.process(income("5")).unwrap();
        pipeline.process(expense("500")).unwrap_err();
        pipeline.process(expense("5")).unwrap();

        assert_eq!(hook.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_expenses_never_overdraw_when_serializable() {
        let f = fixture("100", IsolationLevel::SerializablePerOperation);
        let pipeline = Arc::new(f.pipeline);
        let mut handles = vec![];

        for _ in 0..16 {
            let pipeline_clone = Arc::clone(&pipeline);
            handles.push(thread::spawn(move || {
                (0..5)
                    .filter(|_| pipeline_clone.process(expense("3")).is_ok())
                    .count()
            }));
        }

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // 100 / 3 = 33 expenses fit, leaving 1
        assert_eq!(accepted, 33);
        assert_eq!(f.ledger.get_account(1).unwrap().unwrap().balance, dec("1"));
        assert_eq!(f.ledger.operations().len(), 33);
    }

    #[test]
    fn test_read_committed_processes_sequential_operations() {
        let f = fixture("50", IsolationLevel::ReadCommittedPerStep);

        f.pipeline.process(income("25")).unwrap();
        f.pipeline.process(expense("75")).unwrap();
        let result = f.pipeline.process(expense("0.01"));

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(balance(&f), Decimal::ZERO);
    }
}
