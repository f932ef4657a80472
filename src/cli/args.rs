use crate::core::{IsolationLevel, LedgerConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Apply a ledger script and report the resulting accounts or operations
#[derive(Parser, Debug)]
#[command(name = "finance-ledger")]
#[command(about = "Apply a ledger script and report accounts or operations", long_about = None)]
pub struct CliArgs {
    /// Ledger script CSV file path
    #[arg(value_name = "SCRIPT", help = "Path to the ledger script CSV file")]
    pub input_file: PathBuf,

    /// Which table to write to stdout
    #[arg(
        long = "report",
        value_name = "REPORT",
        default_value = "accounts",
        help = "Report to write: 'accounts' or 'operations'"
    )]
    pub report: ReportKind,

    /// Isolation between operations on the same account
    #[arg(
        long = "isolation",
        value_name = "LEVEL",
        default_value = "serializable",
        help = "Isolation level: 'serializable' or 'read-committed'"
    )]
    pub isolation: IsolationArg,

    /// Log verbosity (overrides RUST_LOG)
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        help = "Log level written to stderr (default: RUST_LOG or 'warn')"
    )]
    pub log_level: Option<LogLevel>,
}

/// Report tables the runner can write
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    Accounts,
    Operations,
}

/// Isolation levels accepted on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IsolationArg {
    Serializable,
    ReadCommitted,
}

impl From<IsolationArg> for IsolationLevel {
    fn from(arg: IsolationArg) -> Self {
        match arg {
            IsolationArg::Serializable => IsolationLevel::SerializablePerOperation,
            IsolationArg::ReadCommitted => IsolationLevel::ReadCommittedPerStep,
        }
    }
}

/// Log levels accepted on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl CliArgs {
    /// Create a LedgerConfig from CLI arguments
    pub fn to_ledger_config(&self) -> LedgerConfig {
        LedgerConfig::new(self.isolation.into())
    }
}
