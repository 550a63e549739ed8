//! Domain models for Pennywise

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical column names, in canonical order
pub const CANONICAL_COLUMNS: [&str; 4] = ["date", "description", "category", "amount"];

/// Category given to transactions nothing else could categorize
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Account kinds, sniffed from CSV columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Checking,
    Credit,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(Self::Checking),
            "credit" | "credit_card" => Ok(Self::Credit),
            _ => Err(format!("Unknown account kind: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cleaned transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// `None` when the source value could not be parsed as a date
    pub date: Option<NaiveDate>,
    pub description: String,
    /// Never empty after cleaning
    pub category: String,
    /// Negative = outflow, positive = inflow
    pub amount: f64,
}

impl Transaction {
    pub fn new(
        date: Option<NaiveDate>,
        description: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            category: category.into(),
            amount,
        }
    }
}

/// Everything cleaned out of one CSV file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRecord {
    pub kind: AccountKind,
    /// File the record came from (absent for in-memory input)
    pub source: Option<PathBuf>,
    pub transactions: Vec<Transaction>,
}

impl AccountRecord {
    pub fn new(kind: AccountKind, transactions: Vec<Transaction>) -> Self {
        Self {
            kind,
            source: None,
            transactions,
        }
    }
}

/// A file the directory scan gave up on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of cleaning a directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub records: Vec<AccountRecord>,
    pub skipped: Vec<SkippedFile>,
}

/// A recurring charge found in recent history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub description: String,
    pub category: String,
    /// Amount of the first occurrence in the window
    pub amount: f64,
    /// Date of the first occurrence in the window
    pub date: Option<NaiveDate>,
    /// How many times the description appeared in the window
    pub occurrences: usize,
    /// Most common day of month the charge lands on (ties go to the earlier day)
    pub typical_day: u32,
}

/// Income and spending for one calendar month
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// Sum of inflows
    pub income: f64,
    /// Absolute sum of outflows
    pub expenses: f64,
}

impl MonthlySummary {
    pub fn net(&self) -> f64 {
        self.income - self.expenses
    }
}

/// Spending compared against a budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "difference", rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Under budget by the given amount
    Under(f64),
    On,
    /// Over budget by the given amount
    Over(f64),
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Under(by) => write!(f, "under budget by {:.2}", by),
            Self::On => write!(f, "on budget"),
            Self::Over(by) => write!(f, "over budget by {:.2}", by),
        }
    }
}
