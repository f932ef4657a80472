//! End-to-end integration tests
//!
//! These tests validate the complete script pipeline using predefined CSV
//! fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Applies every command through a fresh ledger
//! 3. Writes the requested report
//! 4. Compares it with expected_accounts.csv or expected_operations.csv
//!
//! Test fixtures are located in tests/fixtures/ and cover:
//! - Happy path scenarios
//! - Insufficient funds and exact-balance expenses
//! - Category kind mismatches
//! - Error conditions (unknown references, non-positive amounts)
//! - Malformed rows
//! - Decimal precision and negative balances
//!
//! Each fixture runs for both reports under both isolation levels.

#[cfg(test)]
mod tests {
    use finance_ledger::cli::ReportKind;
    use finance_ledger::{IsolationLevel, LedgerConfig, ScriptRunner};
    use rstest::rstest;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Run a fixture script and compare the report with the expected file
    ///
    /// # Panics
    ///
    /// Panics if fixture files cannot be read or the report differs.
    fn run_test_fixture(fixture_name: &str, report: ReportKind, isolation: IsolationLevel) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = match report {
            ReportKind::Accounts => format!("{}/expected_accounts.csv", fixture_dir),
            ReportKind::Operations => format!("{}/expected_operations.csv", fixture_dir),
        };

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let runner = ScriptRunner::new(LedgerConfig::new(isolation));

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        runner
            .process(Path::new(&input_path), report, &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to apply script: {}", e));

        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));

        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (report: {:?}, isolation: {})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, report, isolation, actual_output, expected_output
        );
    }

    #[rstest]
    #[case("happy_path")]
    #[case("insufficient_funds")]
    #[case("category_mismatch")]
    #[case("invalid_references")]
    #[case("malformed_data")]
    #[case("precision_testing")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(ReportKind::Accounts, ReportKind::Operations)] report: ReportKind,
        #[values(
            IsolationLevel::SerializablePerOperation,
            IsolationLevel::ReadCommittedPerStep
        )]
        isolation: IsolationLevel,
    ) {
        run_test_fixture(fixture, report, isolation);
    }

    #[test]
    fn test_missing_script_is_an_error() {
        let runner = ScriptRunner::new(LedgerConfig::default());
        let mut output = Vec::new();

        let result = runner.process(
            Path::new("tests/fixtures/no_such_fixture/input.csv"),
            ReportKind::Accounts,
            &mut output,
        );

        assert!(result.is_err());
    }
}
