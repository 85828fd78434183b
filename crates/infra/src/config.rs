//! Ledger configuration.
//!
//! Values come from `STOCKLEDGER_*` environment variables; anything missing or
//! unparsable falls back to the default.

use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use stockledger_inventory::SeedDefaults;

pub const ENV_STORAGE_KEY: &str = "STOCKLEDGER_STORAGE_KEY";
pub const ENV_DEFAULT_QUANTITY: &str = "STOCKLEDGER_DEFAULT_QUANTITY";
pub const ENV_DEFAULT_MIN_STOCK: &str = "STOCKLEDGER_DEFAULT_MIN_STOCK";
pub const ENV_MAX_COMMIT_ATTEMPTS: &str = "STOCKLEDGER_MAX_COMMIT_ATTEMPTS";
pub const ENV_DATA_DIR: &str = "STOCKLEDGER_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Store key the ledger snapshot lives under.
    pub storage_key: String,
    /// Quantity for catalog entries that omit one.
    pub default_quantity: u64,
    /// Low-stock threshold for catalog entries that omit one.
    pub default_min_stock: u64,
    /// How many times a mutation is re-decided after losing a revision race.
    pub max_commit_attempts: u32,
    /// Directory for the file-backed store; in-memory when unset.
    pub data_dir: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let seed = SeedDefaults::default();
        Self {
            storage_key: "inventory".to_string(),
            default_quantity: seed.quantity,
            default_min_stock: seed.min_stock,
            max_commit_attempts: 16,
            data_dir: None,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            storage_key: lookup(ENV_STORAGE_KEY)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.storage_key),
            default_quantity: parse_or(&lookup, ENV_DEFAULT_QUANTITY, defaults.default_quantity),
            default_min_stock: parse_or(&lookup, ENV_DEFAULT_MIN_STOCK, defaults.default_min_stock),
            max_commit_attempts: parse_or(
                &lookup,
                ENV_MAX_COMMIT_ATTEMPTS,
                defaults.max_commit_attempts,
            )
            .max(1),
            data_dir: lookup(ENV_DATA_DIR)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn seed_defaults(&self) -> SeedDefaults {
        SeedDefaults {
            quantity: self.default_quantity,
            min_stock: self.default_min_stock,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "unparsable config value; using default");
            default
        }),
    }
}
