//! Normalization configuration
//!
//! Holds the column map, drop list, description→category lookup and
//! subscription exclusions the cleaner and aggregator work from. Built once
//! and passed by reference; nothing here is global.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/pennywise/config/normalization.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Files ending in `.json` are read in the flat `columns_map` / `drop_list` /
//! `description_category_map` / `exclude_list` layout; everything else is TOML.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::UNCATEGORIZED;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/normalization.toml");

/// How the aggregator picks a table when several files share an account kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Keep only the first file of each kind
    #[default]
    FirstWins,
    /// Append every file of a kind, in load order
    Concatenate,
}

impl std::str::FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first_wins" | "first" => Ok(Self::FirstWins),
            "concatenate" | "concat" => Ok(Self::Concatenate),
            _ => Err(format!("Unknown resolution strategy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationConfig {
    /// Raw column name -> canonical column name
    pub columns_map: HashMap<String, String>,
    /// Raw column names discarded before renaming
    pub drop_list: Vec<String>,
    /// Transaction description -> category label
    pub description_category_map: HashMap<String, String>,
    /// Category labels never reported as subscriptions
    pub exclude_list: Vec<String>,
    pub default_category: String,
    /// Value of the `Type` column that marks a genuine purchase
    pub sale_type: String,
    pub case_insensitive: bool,
    /// Descend into sub-directories when scanning for CSVs
    pub recursive: bool,
    pub resolution: ResolutionStrategy,
    /// Subscription window starts this many months before the current one
    pub subscription_window_months: u32,
    /// A description must appear at least this often to count as recurring
    pub min_occurrences: usize,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        parse_config(DEFAULT_CONFIG).unwrap_or_else(|_| Self::bare())
    }
}

impl NormalizationConfig {
    /// Hardcoded baseline that every file is layered onto
    fn bare() -> Self {
        Self {
            columns_map: HashMap::new(),
            drop_list: Vec::new(),
            description_category_map: HashMap::new(),
            exclude_list: Vec::new(),
            default_category: UNCATEGORIZED.to_string(),
            sale_type: "Sale".to_string(),
            case_insensitive: true,
            recursive: false,
            resolution: ResolutionStrategy::FirstWins,
            subscription_window_months: 2,
            min_occurrences: 2,
        }
    }

    /// Load from the data-dir override, or the embedded defaults
    pub fn load() -> Result<Self> {
        load_config(None)
    }

    /// Load from an explicit file, falling back to defaults if it does not exist
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        load_config(Some(path.as_ref()))
    }

    /// Parse TOML content layered over the embedded defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config = Self::default();
        apply_toml(&mut config, content)?;
        Ok(config)
    }

    /// Parse the flat JSON layout layered over the embedded defaults
    pub fn from_json(content: &str) -> Result<Self> {
        let mut config = Self::default();
        apply_json(&mut config, content)?;
        Ok(config)
    }

    /// Replace the description lookup
    pub fn with_category_map(mut self, map: HashMap<String, String>) -> Self {
        self.description_category_map = map;
        self
    }

    /// Merge entries from a separate lookup file into the description lookup
    pub fn merge_category_map_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let map = load_category_map(path)?;
        self.description_category_map.extend(map);
        Ok(())
    }

    pub fn with_exclude_list<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_list = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resolution(mut self, resolution: ResolutionStrategy) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| {
        d.join("pennywise")
            .join("config")
            .join("normalization.toml")
    })
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<NormalizationConfig> {
    let path = match override_path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };

    let Some(path) = path.filter(|p| p.exists()) else {
        debug!("No config override found, using embedded defaults");
        return parse_config(DEFAULT_CONFIG);
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| Error::InvalidConfig(format!("Failed to read config: {}", e)))?;
    debug!("Loading config from {}", path.display());

    if is_json(&path) {
        NormalizationConfig::from_json(&content)
    } else {
        NormalizationConfig::from_toml(&content)
    }
}

/// Load a standalone description -> category lookup (JSON object or TOML table)
pub fn load_category_map(path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    if is_json(path) {
        Ok(serde_json::from_str(&content)?)
    } else {
        toml::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("Invalid category map TOML: {}", e)))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    columns: Option<HashMap<String, String>>,
    cleaner: Option<RawCleaner>,
    categories: Option<HashMap<String, String>>,
    subscriptions: Option<RawSubscriptions>,
    accounts: Option<RawAccounts>,
}

#[derive(Debug, Deserialize)]
struct RawCleaner {
    drop: Option<Vec<String>>,
    sale_type: Option<String>,
    default_category: Option<String>,
    case_insensitive: Option<bool>,
    recursive: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawSubscriptions {
    exclude: Option<Vec<String>>,
    window_months: Option<u32>,
    min_occurrences: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawAccounts {
    resolution: Option<ResolutionStrategy>,
}

/// Flat layout used by JSON config files
#[derive(Debug, Deserialize)]
struct RawJsonConfig {
    columns_map: Option<HashMap<String, String>>,
    drop_list: Option<Vec<String>>,
    description_category_map: Option<HashMap<String, String>>,
    exclude_list: Option<Vec<String>>,
}

/// Parse config from TOML content over the hardcoded baseline
fn parse_config(content: &str) -> Result<NormalizationConfig> {
    let mut config = NormalizationConfig::bare();
    apply_toml(&mut config, content)?;
    Ok(config)
}

fn apply_toml(config: &mut NormalizationConfig, content: &str) -> Result<()> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::InvalidConfig(format!("Invalid config TOML: {}", e)))?;

    if let Some(columns) = raw.columns {
        config.columns_map = columns;
    }

    if let Some(cleaner) = raw.cleaner {
        if let Some(drop) = cleaner.drop {
            config.drop_list = drop;
        }
        if let Some(sale_type) = cleaner.sale_type {
            config.sale_type = sale_type;
        }
        if let Some(label) = cleaner.default_category.filter(|l| !l.trim().is_empty()) {
            config.default_category = label;
        }
        if let Some(case_insensitive) = cleaner.case_insensitive {
            config.case_insensitive = case_insensitive;
        }
        if let Some(recursive) = cleaner.recursive {
            config.recursive = recursive;
        }
    }

    if let Some(categories) = raw.categories {
        config.description_category_map = categories;
    }

    if let Some(subscriptions) = raw.subscriptions {
        if let Some(exclude) = subscriptions.exclude {
            config.exclude_list = exclude;
        }
        if let Some(months) = subscriptions.window_months {
            config.subscription_window_months = months;
        }
        if let Some(min) = subscriptions.min_occurrences {
            config.min_occurrences = min.max(1);
        }
    }

    if let Some(resolution) = raw.accounts.and_then(|a| a.resolution) {
        config.resolution = resolution;
    }

    Ok(())
}

fn apply_json(config: &mut NormalizationConfig, content: &str) -> Result<()> {
    let raw: RawJsonConfig = serde_json::from_str(content)?;

    if let Some(columns) = raw.columns_map {
        config.columns_map = columns;
    }
    if let Some(drop) = raw.drop_list {
        config.drop_list = drop;
    }
    if let Some(categories) = raw.description_category_map {
        config.description_category_map = categories;
    }
    if let Some(exclude) = raw.exclude_list {
        config.exclude_list = exclude;
    }

    Ok(())
}
