//! Pennywise Core Library
//!
//! Shared functionality for the Pennywise personal finance tool:
//! - CSV cleaning for checking and credit card exports
//! - Description-based category assignment
//! - Normalization config with embedded defaults and a data-dir override
//! - Calendar window helpers
//! - Summary metrics and recurring-charge detection

pub mod categorize;
pub mod clean;
pub mod config;
pub mod dates;
pub mod error;
pub mod finances;
pub mod frame;
pub mod models;

/// Test fixtures: dates, transactions and scratch CSV files
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use categorize::{assign_categories, CategoryMapper};
pub use clean::{detect_account_kind, parse_amount, parse_date, CsvCleaner};
pub use config::{NormalizationConfig, ResolutionStrategy};
pub use dates::DateRange;
pub use error::{Error, Result};
pub use finances::FinanceManager;
pub use frame::{Cell, Frame};
pub use models::{
    AccountKind, AccountRecord, BudgetStatus, LoadReport, MonthlySummary, SkippedFile,
    Subscription, Transaction,
};
