//! CSV format handling for ledger scripts and reports
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to script commands
//! - Account and operation report serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Script Format
//!
//! ```text
//! type,name,kind,account,category,amount,date
//! account,Checking,,,,1000,
//! category,Salary,income,,,,
//! category,Food,expense,,,,
//! income,March pay,,1,1,2500,2025-03-01
//! expense,Groceries,,1,2,84.20,2025-03-02
//! ```
//!
//! Accounts and categories are referenced by the identifiers the ledger
//! assigns, which start at 1 in creation order.

use crate::types::{Account, AccountId, CategoryId, CategoryKind, Operation, ScriptCommand};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// CSV record structure for deserialization
///
/// Every column except `type` is optional; which ones are required depends
/// on the command.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub command: String,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub account: Option<AccountId>,
    pub category: Option<CategoryId>,
    pub amount: Option<String>,
    pub date: Option<String>,
}

/// Convert a CsvRecord to a ScriptCommand
///
/// Command and kind names are case insensitive. Business rules (positive
/// amounts, existing references) are not checked here; the ledger rejects
/// those when the command is applied.
///
/// # Returns
///
/// Result containing either:
/// - Ok(ScriptCommand) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<ScriptCommand, String> {
    match csv_record.command.to_lowercase().as_str() {
        "account" => {
            let name = required_text(csv_record.name, "account", "name")?;
            let balance = parse_amount(csv_record.amount)?.unwrap_or(Decimal::ZERO);
            Ok(ScriptCommand::OpenAccount { name, balance })
        }
        "category" => {
            let name = required_text(csv_record.name, "category", "name")?;
            let kind = required_text(csv_record.kind, "category", "kind")?;
            let kind = match kind.to_lowercase().as_str() {
                "income" => CategoryKind::Income,
                "expense" => CategoryKind::Expense,
                _ => return Err(format!("Invalid category kind: '{}'", kind)),
            };
            Ok(ScriptCommand::CreateCategory { kind, name })
        }
        kind @ ("income" | "expense") => {
            let account = csv_record
                .account
                .ok_or_else(|| format!("{} requires an account", kind))?;
            let category = csv_record
                .category
                .ok_or_else(|| format!("{} requires a category", kind))?;
            let amount = parse_amount(csv_record.amount)?
                .ok_or_else(|| format!("{} requires an amount", kind))?;
            let date = required_text(csv_record.date, kind, "date")?;
            let date = Date::parse(&date, DATE_FORMAT)
                .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;
            let description = csv_record.name.unwrap_or_default();

            let operation = if kind == "income" {
                Operation::income(account, amount, date, description, category)
            } else {
                Operation::expense(account, amount, date, description, category)
            };
            Ok(ScriptCommand::Record(operation))
        }
        _ => Err(format!("Invalid command type: '{}'", csv_record.command)),
    }
}

fn required_text(value: Option<String>, command: &str, column: &str) -> Result<String, String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(format!("{} requires a {}", command, column)),
    }
}

fn parse_amount(amount: Option<String>) -> Result<Option<Decimal>, String> {
    match amount {
        Some(amount_str) if !amount_str.trim().is_empty() => Decimal::from_str(amount_str.trim())
            .map(Some)
            .map_err(|_| format!("Invalid amount '{}'", amount_str)),
        _ => Ok(None),
    }
}

/// Write account states to CSV format
///
/// Writes accounts with columns: id, name, balance. Accounts are sorted by
/// id for deterministic output; balances have two decimal places.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["id", "name", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer
            .write_record(&[
                display_id(account.id),
                account.name,
                format!("{:.2}", account.balance),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write operations to CSV format
///
/// Columns: id, kind, account, category, amount, date, description, sorted
/// by id.
pub fn write_operations_csv(
    operations: &[Operation],
    output: &mut dyn Write,
) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "id",
            "kind",
            "account",
            "category",
            "amount",
            "date",
            "description",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_operations = operations.to_vec();
    sorted_operations.sort_by_key(|operation| operation.id);

    for operation in sorted_operations {
        writer
            .write_record(&[
                display_id(operation.id),
                operation.kind.to_string(),
                operation.account_id.to_string(),
                operation.category_id.to_string(),
                format!("{:.2}", operation.amount),
                operation.date.to_string(),
                operation.description,
            ])
            .map_err(|e| format!("Failed to write operation record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

fn display_id(id: Option<u64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationKind;
    use rstest::rstest;
    use time::macros::date;

    fn record(command: &str) -> CsvRecord {
        CsvRecord {
            command: command.to_string(),
            ..CsvRecord::default()
        }
    }

    fn operation_record(command: &str, amount: &str, date: &str) -> CsvRecord {
        CsvRecord {
            name: Some("weekly shop".to_string()),
            account: Some(1),
            category: Some(2),
            amount: Some(amount.to_string()),
            date: Some(date.to_string()),
            ..record(command)
        }
    }

    #[rstest]
    #[case::with_balance(Some("1000.50"), Decimal::new(100050, 2))]
    #[case::empty_balance(Some(""), Decimal::ZERO)]
    #[case::missing_balance(None, Decimal::ZERO)]
    fn test_convert_account(#[case] amount: Option<&str>, #[case] expected: Decimal) {
        let csv_record = CsvRecord {
            name: Some("Checking".to_string()),
            amount: amount.map(|s| s.to_string()),
            ..record("account")
        };

        let command = convert_csv_record(csv_record).unwrap();

        assert_eq!(
            command,
            ScriptCommand::OpenAccount {
                name: "Checking".to_string(),
                balance: expected,
            }
        );
    }

    #[rstest]
    #[case("income", CategoryKind::Income)]
    #[case("EXPENSE", CategoryKind::Expense)] // case insensitive
    fn test_convert_category(#[case] kind: &str, #[case] expected: CategoryKind) {
        let csv_record = CsvRecord {
            name: Some("Food".to_string()),
            kind: Some(kind.to_string()),
            ..record("Category")
        };

        let command = convert_csv_record(csv_record).unwrap();

        assert_eq!(
            command,
            ScriptCommand::CreateCategory {
                kind: expected,
                name: "Food".to_string(),
            }
        );
    }

    #[rstest]
    #[case("income", OperationKind::Income)]
    #[case("expense", OperationKind::Expense)]
    fn test_convert_operation(#[case] command: &str, #[case] expected: OperationKind) {
        let csv_record = operation_record(command, " 84.20 ", "2025-03-02");

        let ScriptCommand::Record(operation) = convert_csv_record(csv_record).unwrap() else {
            panic!("expected an operation");
        };

        assert_eq!(operation.kind, expected);
        assert_eq!(operation.id, None);
        assert_eq!(operation.account_id, 1);
        assert_eq!(operation.category_id, 2);
        assert_eq!(operation.amount, Decimal::new(8420, 2));
        assert_eq!(operation.date, date!(2025 - 03 - 02));
        assert_eq!(operation.description, "weekly shop");
    }

    #[test]
    fn test_operation_without_description() {
        let csv_record = CsvRecord {
            name: None,
            ..operation_record("income", "5", "2025-01-01")
        };

        let ScriptCommand::Record(operation) = convert_csv_record(csv_record).unwrap() else {
            panic!("expected an operation");
        };
        assert_eq!(operation.description, "");
    }

    #[rstest]
    #[case::invalid_type(record("transfer"), "Invalid command type")]
    #[case::account_missing_name(record("account"), "account requires a name")]
    #[case::category_missing_kind(
        CsvRecord { name: Some("Food".to_string()), ..record("category") },
        "category requires a kind"
    )]
    #[case::category_invalid_kind(
        CsvRecord {
            name: Some("Food".to_string()),
            kind: Some("savings".to_string()),
            ..record("category")
        },
        "Invalid category kind"
    )]
    #[case::invalid_amount(operation_record("expense", "ten", "2025-01-01"), "Invalid amount")]
    #[case::missing_amount(operation_record("expense", " ", "2025-01-01"), "requires an amount")]
    #[case::invalid_date(operation_record("income", "1", "01/02/2025"), "Invalid date")]
    #[case::missing_date(operation_record("income", "1", ""), "income requires a date")]
    #[case::missing_account(
        CsvRecord { account: None, ..operation_record("income", "1", "2025-01-01") },
        "income requires an account"
    )]
    #[case::missing_category(
        CsvRecord { category: None, ..operation_record("expense", "1", "2025-01-01") },
        "expense requires a category"
    )]
    fn test_convert_csv_record_errors(#[case] csv_record: CsvRecord, #[case] expected_error: &str) {
        let result = convert_csv_record(csv_record);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains(expected_error));
    }

    fn account(id: u64, name: &str, balance: Decimal) -> Account {
        Account {
            id: Some(id),
            name: name.to_string(),
            balance,
        }
    }

    #[rstest]
    #[case::single_account(
        vec![account(1, "Checking", Decimal::new(100000, 2))],
        "id,name,balance\n1,Checking,1000.00\n"
    )]
    #[case::sorted_by_id(
        vec![
            account(3, "Cash", Decimal::ZERO),
            account(1, "Checking", Decimal::new(5, 1)),
            account(2, "Savings", Decimal::new(-1234, 2)),
        ],
        "id,name,balance\n1,Checking,0.50\n2,Savings,-12.34\n3,Cash,0.00\n"
    )]
    #[case::name_with_comma(
        vec![account(1, "Bills, shared", Decimal::ONE)],
        "id,name,balance\n1,\"Bills, shared\",1.00\n"
    )]
    #[case::empty_accounts(vec![], "id,name,balance\n")]
    fn test_write_accounts_csv(#[case] accounts: Vec<Account>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        let result = write_accounts_csv(&accounts, &mut output);
        assert!(result.is_ok());

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str, expected_output);
    }

    #[test]
    fn test_write_operations_csv() {
        let mut expense = Operation::expense(
            1,
            Decimal::new(8420, 2),
            date!(2025 - 03 - 02),
            "Groceries",
            2,
        );
        expense.id = Some(2);
        let mut income =
            Operation::income(1, Decimal::new(2500, 0), date!(2025 - 03 - 01), "March pay", 1);
        income.id = Some(1);

        let mut output = Vec::new();
        write_operations_csv(&[expense, income], &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,kind,account,category,amount,date,description\n\
             1,income,1,1,2500.00,2025-03-01,March pay\n\
             2,expense,1,2,84.20,2025-03-02,Groceries\n"
        );
    }
}
