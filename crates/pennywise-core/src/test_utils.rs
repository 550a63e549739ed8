//! Test utilities for pennywise-core
//!
//! Fixture builders shared by unit tests and, behind the `test-utils`
//! feature, by downstream crates.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::models::Transaction;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

pub fn tx(date: NaiveDate, description: &str, category: &str, amount: f64) -> Transaction {
    Transaction::new(Some(date), description, category, amount)
}

/// Write `content` to `dir/name`, creating parent directories as needed
pub fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(&path, content).expect("write fixture file");
    path
}
