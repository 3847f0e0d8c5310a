//! # Configuration
//!
//! `rugpos.toml`, environment overrides and defaults.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RUGPOS_DB_PATH=/var/lib/rugpos/rugpos.db                           │
//! │     RUGPOS_EXCHANGE_RATE=12650                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/rugpos/rugpos.toml (Linux)                               │
//! │     ~/Library/Application Support/com.rugpos.rugpos/rugpos.toml        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stored rate in the `settings` table always wins over
//! `currency.default_rate`; the latter only applies to a fresh database.
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/rugpos/rugpos.db"
//! max_connections = 5
//!
//! [currency]
//! base_code = "USD"
//! display_code = "UZS"
//! default_rate = "12200"
//!
//! [debts]
//! default_term_days = 7
//! ```

use rugpos_core::{CurrencyPair, ExchangeRate, DEFAULT_DEBT_TERM_DAYS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::{Database, DbConfig};

const MAX_DEBT_TERM_DAYS: i64 = 365;

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "rugpos", "rugpos")
        .map(|dirs| dirs.data_dir().join("rugpos.db"))
        .unwrap_or_else(|| PathBuf::from("rugpos.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[currency]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencySettings {
    #[serde(default = "default_base_code")]
    pub base_code: String,

    #[serde(default = "default_display_code")]
    pub display_code: String,

    /// Used until an administrator stores a rate.
    #[serde(default)]
    pub default_rate: ExchangeRate,
}

fn default_base_code() -> String {
    "USD".to_string()
}

fn default_display_code() -> String {
    "UZS".to_string()
}

impl Default for CurrencySettings {
    fn default() -> Self {
        CurrencySettings {
            base_code: default_base_code(),
            display_code: default_display_code(),
            default_rate: ExchangeRate::DEFAULT,
        }
    }
}

/// `[debts]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSettings {
    #[serde(default = "default_term_days")]
    pub default_term_days: i64,
}

fn default_term_days() -> i64 {
    DEFAULT_DEBT_TERM_DAYS
}

impl Default for DebtSettings {
    fn default() -> Self {
        DebtSettings {
            default_term_days: default_term_days(),
        }
    }
}

// =============================================================================
// RugposConfig
// =============================================================================

/// Complete rugpos configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RugposConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub currency: CurrencySettings,

    #[serde(default)]
    pub debts: DebtSettings,
}

impl RugposConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (rugpos.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading rugpos config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load rugpos config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file, creating its directory.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| DbError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "rugpos config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::InvalidConfig("database.path is empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be at least 1".into(),
            ));
        }

        for (field, code) in [
            ("currency.base_code", &self.currency.base_code),
            ("currency.display_code", &self.currency.display_code),
        ] {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(DbError::InvalidConfig(format!(
                    "{field} must be a three-letter ISO code, got '{code}'"
                )));
            }
        }

        let term = self.debts.default_term_days;
        if !(1..=MAX_DEBT_TERM_DAYS).contains(&term) {
            return Err(DbError::InvalidConfig(format!(
                "debts.default_term_days must be between 1 and {MAX_DEBT_TERM_DAYS}, got {term}"
            )));
        }

        Ok(())
    }

    /// The currency pair used for formatting.
    pub fn currency_pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.currency.base_code, &self.currency.display_code)
    }

    /// Pool configuration for this config.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .default_rate(self.currency.default_rate)
            .debt_term_days(self.debts.default_term_days)
    }

    /// Opens the configured database, creating its directory.
    pub async fn connect(&self) -> DbResult<Database> {
        if let Some(parent) = self.database.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
            }
        }
        Database::new(self.db_config()).await
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `RUGPOS_*` overrides from `lookup`. Unparseable values are
    /// ignored with a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("RUGPOS_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("RUGPOS_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %max, "Ignoring RUGPOS_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(code) = lookup("RUGPOS_BASE_CURRENCY") {
            self.currency.base_code = code.trim().to_uppercase();
        }

        if let Some(code) = lookup("RUGPOS_DISPLAY_CURRENCY") {
            self.currency.display_code = code.trim().to_uppercase();
        }

        if let Some(rate) = lookup("RUGPOS_EXCHANGE_RATE") {
            match Decimal::from_str(rate.trim())
                .ok()
                .and_then(|r| ExchangeRate::new(r).ok())
            {
                Some(parsed) => {
                    debug!(rate = %parsed, "Overriding default exchange rate from environment");
                    self.currency.default_rate = parsed;
                }
                None => warn!(value = %rate, "Ignoring RUGPOS_EXCHANGE_RATE"),
            }
        }

        if let Some(days) = lookup("RUGPOS_DEBT_TERM_DAYS") {
            match days.parse::<i64>() {
                Ok(days) => self.debts.default_term_days = days,
                Err(_) => warn!(value = %days, "Ignoring RUGPOS_DEBT_TERM_DAYS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "rugpos", "rugpos")
            .map(|dirs| dirs.config_dir().join("rugpos.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
