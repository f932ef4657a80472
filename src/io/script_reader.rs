//! Ledger script reader with iterator interface
//!
//! Provides a streaming iterator over script commands from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! ScriptReader implements the Iterator trait, yielding
//! `Result<ScriptCommand, LedgerError>` for each CSV row:
//!
//! ```no_run
//! use finance_ledger::io::ScriptReader;
//! use std::path::Path;
//!
//! let reader = ScriptReader::new(Path::new("ledger.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(command) => println!("Command: {:?}", command),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as `ParseError` items carrying the
//!   line number, and reading continues with the next row

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerError, ScriptCommand};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Streaming ledger script reader
#[derive(Debug)]
pub struct ScriptReader<R: Read = File> {
    reader: csv::Reader<R>,
    record: StringRecord,
}

impl ScriptReader<File> {
    /// Open a script file
    ///
    /// The CSV reader trims whitespace from all fields and allows rows with
    /// fewer columns than the header, since most commands leave trailing
    /// columns empty.
    ///
    /// # Errors
    ///
    /// `FileNotFound` if the path does not exist, `IoError` if it cannot be
    /// opened.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LedgerError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => LedgerError::IoError {
                message: format!("Failed to open file '{}': {}", path.display(), e),
            },
        })?;

        Ok(Self::from_reader(file))
    }
}

impl<R: Read> ScriptReader<R> {
    /// Read a script from any byte source
    pub fn from_reader(source: R) -> Self {
        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(source);

        Self {
            reader,
            record: StringRecord::new(),
        }
    }
}

impl<R: Read> Iterator for ScriptReader<R> {
    type Item = Result<ScriptCommand, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                return Some(Err(LedgerError::ParseError {
                    line: e.position().map(|position| position.line()),
                    message: e.to_string(),
                }))
            }
        }

        // Line the record starts on, counting blank lines and embedded
        // newlines in quoted fields
        let line = self.record.position().map(|position| position.line());

        let parsed = self
            .reader
            .headers()
            .and_then(|headers| self.record.deserialize::<CsvRecord>(Some(headers)));

        Some(match parsed {
            Ok(csv_record) => {
                convert_csv_record(csv_record).map_err(|message| LedgerError::ParseError {
                    line,
                    message,
                })
            }
            Err(e) => Err(LedgerError::ParseError {
                line,
                message: e.to_string(),
            }),
        })
    }
}
