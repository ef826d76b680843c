//! Configuration management for the scanner.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::dedup::DEFAULT_DEDUP_WINDOW_MS;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::price::CurrencyFormat;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration problems detected by [`ScannerConfig::validate`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `PUERTA_API_BASE_URL` is empty
    #[error("API base URL must not be empty")]
    EmptyBaseUrl,

    /// `PUERTA_HISTORY_LIMIT` is zero
    #[error("History limit must be at least 1")]
    ZeroHistoryLimit,

    /// `PUERTA_CURRENCY_LOCALE` names a locale without a known format
    #[error("Unsupported currency locale: {0}")]
    UnsupportedLocale(String),
}

/// Scanner configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Backend configuration
    pub api: ApiConfig,
    /// Scan flow tuning
    pub scan: ScanSettings,
    /// Price display
    pub currency: CurrencyConfig,
    /// Log filter (trace, debug, info, warn, error or an `EnvFilter` directive)
    pub log_level: String,
}

/// Backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the endpoint paths are appended to
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Per-request timeout in seconds (none: client default)
    pub timeout_secs: Option<u64>,
}

impl ApiConfig {
    /// Per-request timeout
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Scan flow tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Same raw text inside this many milliseconds is dropped (default: 5000)
    pub dedup_window_ms: i64,
    /// Rows kept in the session history (default: 20)
    pub history_limit: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Price display configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Currency symbol (default: `$`)
    pub symbol: String,
    /// Locale deciding the separators: `es-AR` (default) or `en-US`
    pub locale: String,
}

impl CurrencyConfig {
    /// Currency format for the configured locale and symbol
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedLocale`] for an unknown locale.
    pub fn format(&self) -> Result<CurrencyFormat, ConfigError> {
        CurrencyFormat::for_locale(&self.locale)
            .map(|format| format.with_symbol(self.symbol.clone()))
            .ok_or_else(|| ConfigError::UnsupportedLocale(self.locale.clone()))
    }
}

impl ScannerConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Missing or unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: lookup("PUERTA_API_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:8080/api".to_string()),
                token: lookup("PUERTA_API_TOKEN").filter(|token| !token.is_empty()),
                timeout_secs: lookup("PUERTA_API_TIMEOUT_SECS").and_then(|s| s.parse().ok()),
            },
            scan: ScanSettings {
                dedup_window_ms: lookup("PUERTA_DEDUP_WINDOW_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DEDUP_WINDOW_MS),
                history_limit: lookup("PUERTA_HISTORY_LIMIT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_HISTORY_LIMIT),
            },
            currency: CurrencyConfig {
                symbol: lookup("PUERTA_CURRENCY_SYMBOL").unwrap_or_else(|| "$".to_string()),
                locale: lookup("PUERTA_CURRENCY_LOCALE").unwrap_or_else(|| "es-AR".to_string()),
            },
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Check values that have no usable default
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.scan.history_limit == 0 {
            return Err(ConfigError::ZeroHistoryLimit);
        }
        self.currency.format().map(|_| ())
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
