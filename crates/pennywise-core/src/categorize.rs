//! Description → category assignment
//!
//! Categories come from an exact-match lookup of the (trimmed, optionally
//! case-folded) description. Priority order:
//! 1. Lookup hit: overwrites whatever category the row already had
//! 2. Existing non-empty category from the bank export
//! 3. The default label
//!
//! There is no fuzzy or substring matching: a new merchant spelling simply
//! falls through to the existing category or the default.

use std::collections::HashMap;

use tracing::debug;

use crate::frame::{Cell, Frame};
use crate::models::Transaction;

/// Normalized description lookup, built once per cleaning pass
#[derive(Debug, Clone, Default)]
pub struct CategoryMapper {
    lookup: HashMap<String, String>,
    case_insensitive: bool,
}

impl CategoryMapper {
    /// Normalize the keys of `mapping`.
    ///
    /// When two keys collide after normalization the lexicographically
    /// smallest original key wins, so the result never depends on hash order.
    /// Entries with an empty category are ignored.
    pub fn new(mapping: &HashMap<String, String>, case_insensitive: bool) -> Self {
        let mut entries: Vec<(&String, &String)> = mapping
            .iter()
            .filter(|(_, category)| !category.trim().is_empty())
            .collect();
        entries.sort();

        let mut lookup = HashMap::with_capacity(entries.len());
        for (description, category) in entries {
            lookup
                .entry(normalize(description, case_insensitive))
                .or_insert_with(|| category.clone());
        }

        Self {
            lookup,
            case_insensitive,
        }
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Exact-match lookup for a raw description
    pub fn lookup(&self, description: &str) -> Option<&str> {
        self.lookup
            .get(&normalize(description, self.case_insensitive))
            .map(String::as_str)
    }

    /// Resolve the category for one row
    pub fn resolve(&self, description: &str, existing: &str, default_label: &str) -> String {
        if let Some(category) = self.lookup(description) {
            return category.to_string();
        }
        if !existing.trim().is_empty() {
            return existing.to_string();
        }
        default_label.to_string()
    }

    /// Write categories into `target_field`, creating it if absent.
    ///
    /// The input frame is left untouched. A missing `source_field` reads as
    /// blank descriptions, so every row keeps its category or gets the default.
    pub fn assign(
        &self,
        frame: &Frame,
        source_field: &str,
        target_field: &str,
        default_label: &str,
    ) -> Frame {
        self.assign_owned(frame.clone(), source_field, target_field, default_label)
    }

    /// Same as [`assign`](Self::assign), consuming the frame
    pub fn assign_owned(
        &self,
        frame: Frame,
        source_field: &str,
        target_field: &str,
        default_label: &str,
    ) -> Frame {
        let source = frame.column_index(source_field);
        let target = frame.column_index(target_field);

        let mut matched = 0usize;
        let categories: Vec<Cell> = frame
            .rows()
            .iter()
            .map(|row| {
                let description = source.map(|i| row[i].as_text()).unwrap_or_default();
                let existing = target
                    .map(|i| &row[i])
                    .filter(|cell| !cell.is_blank())
                    .map(Cell::as_text)
                    .unwrap_or_default();
                if self.lookup(&description).is_some() {
                    matched += 1;
                }
                Cell::Text(self.resolve(&description, &existing, default_label))
            })
            .collect();

        debug!(
            "Category lookup matched {} of {} rows",
            matched,
            frame.len()
        );

        frame.with_column(target_field, categories)
    }

    /// Same rules as [`assign`](Self::assign), over already-cleaned transactions
    pub fn assign_transactions(
        &self,
        transactions: &[Transaction],
        default_label: &str,
    ) -> Vec<Transaction> {
        transactions
            .iter()
            .map(|tx| Transaction {
                category: self.resolve(&tx.description, &tx.category, default_label),
                ..tx.clone()
            })
            .collect()
    }
}

fn normalize(text: &str, case_insensitive: bool) -> String {
    let trimmed = text.trim();
    if case_insensitive {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

/// One-shot form of [`CategoryMapper::assign`]
pub fn assign_categories(
    frame: &Frame,
    lookup: &HashMap<String, String>,
    source_field: &str,
    target_field: &str,
    default_label: &str,
    case_insensitive: bool,
) -> Frame {
    CategoryMapper::new(lookup, case_insensitive).assign(
        frame,
        source_field,
        target_field,
        default_label,
    )
}
