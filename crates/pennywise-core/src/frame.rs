//! In-memory table for a single raw CSV
//!
//! Columns are addressed by header name. Cells start out as text and are
//! replaced with typed values as the cleaner coerces them. Transformations
//! consume the frame and hand back the result.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use csv::ReaderBuilder;

use crate::error::Result;

/// A single table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    /// `None` marks a value that failed date parsing
    Date(Option<NaiveDate>),
    Number(f64),
}

impl Cell {
    /// Textual view of the cell; unparsed dates read as empty
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s.as_str()),
            Self::Date(Some(d)) => Cow::Owned(d.to_string()),
            Self::Date(None) => Cow::Borrowed(""),
            Self::Number(n) => Cow::Owned(n.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Date(d) => d.is_none(),
            Self::Number(n) => n.is_nan(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    /// Build a frame from headers and rows; short rows are padded with empty text
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Text(String::new()));
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Read CSV with a header row. Header names are trimmed.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD, so one
    /// Latin-1 merchant name does not cost the rest of the file.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = rdr
            .byte_headers()?
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();

        let mut rows = Vec::new();
        for result in rdr.byte_records() {
            let record = result?;
            rows.push(
                record
                    .iter()
                    .map(|field| Cell::from(&*String::from_utf8_lossy(field)))
                    .collect(),
            );
        }

        Ok(Self::new(columns, rows))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` in the named column
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Keep rows whose cell in `column` satisfies `keep`. No-op if the column is absent.
    pub fn retain_rows<F>(mut self, column: &str, mut keep: F) -> Self
    where
        F: FnMut(&Cell) -> bool,
    {
        if let Some(idx) = self.column_index(column) {
            self.rows.retain(|row| keep(&row[idx]));
        }
        self
    }

    /// Replace every cell of `column`. No-op if the column is absent.
    pub fn map_column<F>(mut self, column: &str, mut f: F) -> Self
    where
        F: FnMut(Cell) -> Cell,
    {
        if let Some(idx) = self.column_index(column) {
            for row in &mut self.rows {
                let cell = std::mem::replace(&mut row[idx], Cell::Text(String::new()));
                row[idx] = f(cell);
            }
        }
        self
    }

    /// Append a column, or overwrite it if it already exists
    pub fn with_column(mut self, column: &str, values: Vec<Cell>) -> Self {
        let idx = match self.column_index(column) {
            Some(idx) => idx,
            None => {
                self.columns.push(column.to_string());
                for row in &mut self.rows {
                    row.push(Cell::Text(String::new()));
                }
                self.columns.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        self
    }

    /// Remove every listed column that is present
    pub fn drop_columns<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.iter().any(|n| n.as_ref() == c))
            .collect();
        if keep.iter().all(|k| *k) {
            return self;
        }

        self.columns = retain_by_mask(std::mem::take(&mut self.columns), &keep);
        self.rows = std::mem::take(&mut self.rows)
            .into_iter()
            .map(|row| retain_by_mask(row, &keep))
            .collect();
        self
    }

    /// Rename columns found in `map`; others keep their names
    pub fn rename_columns(mut self, map: &HashMap<String, String>) -> Self {
        for column in &mut self.columns {
            if let Some(new_name) = map.get(column.as_str()) {
                *column = new_name.clone();
            }
        }
        self
    }

    /// Reorder to exactly `names`, dropping everything else.
    ///
    /// Returns the missing column names if any are absent.
    pub fn select(self, names: &[&str]) -> std::result::Result<Self, Vec<String>> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }

        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                indices
                    .iter()
                    .map(|&i| std::mem::replace(&mut row[i], Cell::Text(String::new())))
                    .collect()
            })
            .collect();
        Ok(Self {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }
}

fn retain_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, k)| k.then_some(item))
        .collect()
}
