//! CSV cleaning pipeline
//!
//! Turns a directory of bank/credit card exports into canonical
//! `date, description, category, amount` rows, one [`AccountRecord`] per file.
//!
//! Per file, in order:
//! 1. Sniff the account kind (`Transaction Date` column → credit, else checking)
//! 2. Keep only `Type == Sale` rows when a `Type` column exists
//! 3. Parse `Date` (bad values become missing dates)
//! 4. Coerce `Amount` (bad values become 0)
//! 5. Drop configured columns, then rename to canonical names
//! 6. Assign categories from the description lookup
//! 7. Project onto the four canonical columns
//!
//! A file that cannot be read or lacks a canonical column is skipped with a
//! warning; only a missing directory fails the whole load.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::categorize::CategoryMapper;
use crate::config::NormalizationConfig;
use crate::error::{Error, Result};
use crate::frame::{Cell, Frame};
use crate::models::{
    AccountKind, AccountRecord, LoadReport, SkippedFile, Transaction, CANONICAL_COLUMNS,
};

/// Column whose presence marks a credit card export
pub const CREDIT_MARKER_COLUMN: &str = "Transaction Date";

/// Detect the account kind from CSV column names
///
/// Credit exports carry a `Transaction Date` column; everything else,
/// including shapes we have never seen, is treated as checking.
pub fn detect_account_kind<S: AsRef<str>>(columns: &[S]) -> AccountKind {
    if columns
        .iter()
        .any(|c| c.as_ref().trim() == CREDIT_MARKER_COLUMN)
    {
        AccountKind::Credit
    } else {
        AccountKind::Checking
    }
}

/// Parse a date string in various common formats
///
/// Returns `None` instead of failing; the row is kept with a missing date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // 01/15/24 style: the year needs %y, since %Y would read it as year 24
    let parts: Vec<&str> = s.split(['/', '-']).collect();
    let two_digit_year = parts.len() == 3 && parts[0].len() <= 2 && parts[2].len() == 2;

    let formats: &[&str] = if two_digit_year {
        &["%m/%d/%y", "%m-%d-%y"]
    } else {
        &[
            "%Y-%m-%d", // 2024-01-15
            "%m/%d/%Y", // 01/15/2024
            "%m-%d-%Y", // 01-15-2024
            "%Y/%m/%d", // 2024/01/15
        ]
    };

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    // Timestamps: 2024-01-15T08:30:00, 2024-01-15 08:30:00
    let date_part = s.split(['T', ' ']).next()?;
    if date_part.len() < s.len() {
        return parse_date(date_part);
    }

    None
}

/// Parse an amount string, handling currency symbols and commas
///
/// Anything that is not a finite number comes back as `0.0`.
pub fn parse_amount(s: &str) -> f64 {
    let cleaned = s.trim().replace(['$', ',', ' ', '"'], "");

    let (negative, body) = match cleaned
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    match body.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if negative {
                -value
            } else {
                value
            }
        }
        _ => 0.0,
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Cleans CSV exports according to a [`NormalizationConfig`]
#[derive(Debug, Clone)]
pub struct CsvCleaner {
    config: NormalizationConfig,
    mapper: CategoryMapper,
}

impl CsvCleaner {
    pub fn new(config: &NormalizationConfig) -> Self {
        Self {
            mapper: CategoryMapper::new(&config.description_category_map, config.case_insensitive),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    /// Clean every CSV in `directory`, skipping files that fail
    pub fn load_and_clean(&self, directory: impl AsRef<Path>) -> Result<Vec<AccountRecord>> {
        Ok(self.load_with_report(directory)?.records)
    }

    /// Like [`load_and_clean`](Self::load_and_clean), also listing skipped files
    pub fn load_with_report(&self, directory: impl AsRef<Path>) -> Result<LoadReport> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(Error::DirectoryNotFound(directory.to_path_buf()));
        }

        let files = self.discover(directory)?;
        debug!("Found {} CSV files in {}", files.len(), directory.display());

        let mut report = LoadReport::default();
        for file in files {
            match self.clean_file(&file) {
                Ok(record) => report.records.push(record),
                Err(e) => {
                    warn!("Skipping {}: {}", file.display(), e);
                    report.skipped.push(SkippedFile {
                        path: file,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Cleaned {} files from {} ({} skipped)",
            report.records.len(),
            directory.display(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Clean a single CSV file
    pub fn clean_file(&self, path: impl AsRef<Path>) -> Result<AccountRecord> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::unreadable(path, e))?;
        let frame = Frame::from_reader(BufReader::new(file)).map_err(|e| Error::unreadable(path, e))?;

        let mut record = self.clean_frame(frame)?;
        debug!(
            "Cleaned {} as {} ({} rows)",
            path.display(),
            record.kind,
            record.transactions.len()
        );
        record.source = Some(path.to_path_buf());
        Ok(record)
    }

    /// Clean CSV data from any reader
    pub fn clean_reader<R: Read>(&self, reader: R) -> Result<AccountRecord> {
        self.clean_frame(Frame::from_reader(reader)?)
    }

    /// Run the cleaning steps over an already-parsed table
    pub fn clean_frame(&self, frame: Frame) -> Result<AccountRecord> {
        let kind = detect_account_kind(frame.columns());
        let config = &self.config;

        let before = frame.len();
        let frame = if frame.has_column("Type") {
            frame.retain_rows("Type", |cell| cell.as_text().trim() == config.sale_type)
        } else {
            frame
        };
        if frame.len() != before {
            debug!(
                "Dropped {} non-{} rows",
                before - frame.len(),
                config.sale_type
            );
        }

        let frame = frame
            .map_column("Date", |cell| Cell::Date(parse_date(&cell.as_text())))
            .map_column("Amount", |cell| Cell::Number(parse_amount(&cell.as_text())))
            .drop_columns(&config.drop_list)
            .rename_columns(&config.columns_map);

        let frame = self.mapper.assign_owned(
            frame,
            "description",
            "category",
            &config.default_category,
        );

        let frame = frame
            .select(&CANONICAL_COLUMNS)
            .map_err(|missing| Error::MissingColumn(missing.join(", ")))?;

        let transactions: Vec<Transaction> = frame
            .rows()
            .iter()
            .map(|row| to_transaction(row))
            .collect();

        let undated = transactions.iter().filter(|t| t.date.is_none()).count();
        if undated > 0 {
            debug!("{} rows have unparseable dates", undated);
        }

        Ok(AccountRecord::new(kind, transactions))
    }

    /// `*.csv` files under `directory`, sorted by path.
    ///
    /// Each directory is visited once by canonical path, so symlink cycles
    /// cannot yield the same file twice.
    fn discover(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![directory.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let canonical = fs::canonicalize(&dir).unwrap_or_else(|_| dir.clone());
            if !visited.insert(canonical) {
                debug!("Already scanned {}, skipping", dir.display());
                continue;
            }

            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if dir != directory => {
                    warn!("Cannot read {}: {}", dir.display(), e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            for entry in entries {
                let path = match entry {
                    Ok(entry) => entry.path(),
                    Err(e) => {
                        warn!("Cannot read entry in {}: {}", dir.display(), e);
                        continue;
                    }
                };
                if path.is_dir() {
                    if self.config.recursive {
                        pending.push(path);
                    }
                } else if path.is_file() && is_csv(&path) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Build a transaction from a row already projected to canonical order
fn to_transaction(row: &[Cell]) -> Transaction {
    let date = match &row[0] {
        Cell::Date(date) => *date,
        Cell::Text(s) => parse_date(s),
        Cell::Number(_) => None,
    };
    let amount = match &row[3] {
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Number(_) => 0.0,
        other => parse_amount(&other.as_text()),
    };

    Transaction {
        date,
        description: row[1].as_text().trim().to_string(),
        category: row[2].as_text().into_owned(),
        amount,
    }
}
