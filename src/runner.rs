//! Script runner
//!
//! Applies a ledger script to a `FinanceTracker` and writes a report. It
//! coordinates the `ScriptReader` (CSV input), the tracker (business logic)
//! and the `csv_format` writers (report output).
//!
//! # Error Handling
//!
//! Fatal errors (file not found, I/O errors, report write failures) are
//! returned. Malformed rows and commands the ledger rejects are logged at
//! `warn` and counted, and the script continues with the next row.

use crate::cli::ReportKind;
use crate::core::{FinanceTracker, LedgerConfig};
use crate::io::csv_format::{write_accounts_csv, write_operations_csv};
use crate::io::ScriptReader;
use crate::types::{LedgerError, ScriptCommand};
use std::io::{Read, Write};
use std::path::Path;

/// Outcome counts of one script run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Commands the ledger accepted
    pub applied: usize,
    /// Commands the ledger rejected
    pub rejected: usize,
    /// Rows that could not be parsed
    pub malformed: usize,
}

/// Applies script commands to one tracker
pub struct ScriptRunner {
    tracker: FinanceTracker,
}

impl ScriptRunner {
    /// Runner over a fresh in-memory tracker
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_tracker(FinanceTracker::new(config))
    }

    pub fn with_tracker(tracker: FinanceTracker) -> Self {
        ScriptRunner { tracker }
    }

    pub fn tracker(&self) -> &FinanceTracker {
        &self.tracker
    }

    /// Apply a script file and write the requested report
    pub fn process(
        &self,
        input_path: &Path,
        report: ReportKind,
        output: &mut dyn Write,
    ) -> Result<RunSummary, LedgerError> {
        let summary = self.run(ScriptReader::new(input_path)?);
        tracing::info!(
            path = %input_path.display(),
            applied = summary.applied,
            rejected = summary.rejected,
            malformed = summary.malformed,
            "script applied"
        );

        self.write_report(report, output)?;
        Ok(summary)
    }

    /// Apply every command the reader yields, in order
    pub fn run<R: Read>(&self, reader: ScriptReader<R>) -> RunSummary {
        let mut summary = RunSummary::default();

        for result in reader {
            match result {
                Ok(command) => match self.apply(command) {
                    Ok(()) => summary.applied += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, "command rejected");
                        summary.rejected += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed row");
                    summary.malformed += 1;
                }
            }
        }

        summary
    }

    /// Apply one command to the tracker
    pub fn apply(&self, command: ScriptCommand) -> Result<(), LedgerError> {
        match command {
            ScriptCommand::OpenAccount { name, balance } => {
                self.tracker.create_account(name, balance)?;
            }
            ScriptCommand::CreateCategory { kind, name } => {
                self.tracker.create_category(kind, name)?;
            }
            ScriptCommand::Record(operation) => {
                self.tracker.record(operation)?;
            }
        }
        Ok(())
    }

    /// Write the current accounts or operations as CSV
    pub fn write_report(
        &self,
        report: ReportKind,
        output: &mut dyn Write,
    ) -> Result<(), LedgerError> {
        let written = match report {
            ReportKind::Accounts => write_accounts_csv(&self.tracker.list_accounts()?, output),
            ReportKind::Operations => {
                write_operations_csv(&self.tracker.list_operations()?, output)
            }
        };
        written.map_err(|message| LedgerError::IoError { message })
    }
}
