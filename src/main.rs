//! Finance Ledger CLI
//!
//! Command-line interface for applying a ledger script and reporting the
//! result.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- ledger.csv > accounts.csv
//! cargo run -- --report operations ledger.csv > operations.csv
//! cargo run -- --isolation read-committed --log-level info ledger.csv
//! ```
//!
//! The program reads commands from the script, applies them in order and
//! writes the requested report to stdout. Rejected commands and malformed
//! rows are logged to stderr and skipped.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use finance_ledger::cli;
use finance_ledger::ScriptRunner;
use std::process;

fn main() {
    let args = cli::parse_args();
    cli::init_logging(args.log_level);

    let runner = ScriptRunner::new(args.to_ledger_config());

    // Report goes to stdout, logs to stderr
    let mut output = std::io::stdout();
    if let Err(e) = runner.process(&args.input_file, args.report, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
