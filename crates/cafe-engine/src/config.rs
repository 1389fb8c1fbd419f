//! # Engine Configuration
//!
//! Settings loaded once at startup and read-only afterwards.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`CAFE_*`)
//! 2. Defaults (this file)

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use cafe_core::{DEFAULT_REORDER_THRESHOLD, DEFAULT_TABLE_COUNT};
use cafe_db::DbConfig;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Tables registered at startup (numbered `1..=table_count`).
    pub table_count: i64,

    /// Café name (shown on receipts by the UI).
    pub store_name: String,

    /// Currency symbol for display.
    pub currency_symbol: String,

    /// Minor-unit digits of the currency.
    pub currency_decimals: u8,

    /// Threshold given to stock items auto-created by a restock.
    pub default_reorder_threshold: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: PathBuf::from("cafe.db"),
            table_count: DEFAULT_TABLE_COUNT,
            store_name: "Cafe".to_string(),
            currency_symbol: "₹".to_string(),
            currency_decimals: 2,
            default_reorder_threshold: DEFAULT_REORDER_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Builds the configuration from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `CAFE_DB_PATH`: database file (default: platform data dir)
    /// - `CAFE_TABLE_COUNT`: number of tables
    /// - `CAFE_STORE_NAME`: café name
    /// - `CAFE_REORDER_THRESHOLD`: threshold for auto-created stock items
    ///
    /// Unparseable numbers are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();

        match std::env::var("CAFE_DB_PATH") {
            Ok(path) => config.database_path = PathBuf::from(path),
            Err(_) => {
                if let Some(path) = default_database_path() {
                    config.database_path = path;
                }
            }
        }

        if let Some(count) = parse_env("CAFE_TABLE_COUNT") {
            if count > 0 {
                config.table_count = count;
            } else {
                warn!(count, "CAFE_TABLE_COUNT must be positive, keeping default");
            }
        }

        if let Ok(store_name) = std::env::var("CAFE_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(threshold) = parse_env("CAFE_REORDER_THRESHOLD") {
            if threshold >= 0 {
                config.default_reorder_threshold = threshold;
            } else {
                warn!(threshold, "CAFE_REORDER_THRESHOLD must not be negative, keeping default");
            }
        }

        config
    }

    /// Database settings for this configuration's file.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
    }

    /// Formats a paise amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = EngineConfig::default();
    /// assert_eq!(config.format_currency(39_000), "₹390.00");
    /// ```
    pub fn format_currency(&self, paise: i64) -> String {
        let divisor = 10_i64.pow(self.currency_decimals as u32);
        let whole = paise / divisor;
        let frac = (paise % divisor).abs();

        format!(
            "{}{}{}",
            if paise < 0 { "-" } else { "" },
            self.currency_symbol,
            if self.currency_decimals > 0 {
                format!(
                    "{}.{:0width$}",
                    whole.abs(),
                    frac,
                    width = self.currency_decimals as usize
                )
            } else {
                whole.abs().to_string()
            }
        )
    }
}

fn parse_env(key: &str) -> Option<i64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

/// `cafe.db` in the platform data directory, created if missing.
///
/// - Linux: `~/.local/share/pos/cafe.db`
/// - macOS: `~/Library/Application Support/com.cafe.pos/cafe.db`
/// - Windows: `C:\Users\<User>\AppData\Roaming\cafe\pos\data\cafe.db`
///
/// Returns `None` when no home directory is known or it can't be created.
pub fn default_database_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("com", "cafe", "pos")?;
    let data_dir = dirs.data_dir();

    if let Err(e) = std::fs::create_dir_all(data_dir) {
        warn!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return None;
    }

    Some(data_dir.join("cafe.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency_positive() {
        let config = EngineConfig::default();
        assert_eq!(config.format_currency(39_000), "₹390.00");
        assert_eq!(config.format_currency(100), "₹1.00");
        assert_eq!(config.format_currency(5), "₹0.05");
        assert_eq!(config.format_currency(0), "₹0.00");
    }

    #[test]
    fn test_format_currency_negative() {
        let config = EngineConfig::default();
        assert_eq!(config.format_currency(-4_500), "-₹45.00");
    }

    #[test]
    fn test_format_currency_without_decimals() {
        let config = EngineConfig {
            currency_decimals: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.format_currency(390), "₹390");
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.table_count, 15);
        assert_eq!(config.default_reorder_threshold, 10);
        assert_eq!(config.db_config().database_path, PathBuf::from("cafe.db"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(EngineConfig::default()).unwrap();
        assert_eq!(json["tableCount"], 15);
        assert_eq!(json["currencySymbol"], "₹");
    }
}
