//! User settings for the project ledger
//!
//! Defaults applied when creating budgets and invoices, plus display and
//! logging preferences.

use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::error::LedgerError;
use crate::models::{Percentage, DEFAULT_CRITICAL_THRESHOLD, DEFAULT_WARNING_THRESHOLD};

/// User settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Currency symbol used in terminal output
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Date format preference (strftime format)
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Warning threshold for new budgets, as a fraction in [0, 1]
    #[serde(default = "default_warning_threshold")]
    pub default_warning_threshold: f64,

    /// Critical threshold for new budgets, as a fraction in [0, 1]
    #[serde(default = "default_critical_threshold")]
    pub default_critical_threshold: f64,

    /// Tax rate applied when an invoice request does not give one
    #[serde(default = "Percentage::zero")]
    pub default_tax_rate: Percentage,

    /// Days between invoice date and due date when none is given
    #[serde(default = "default_payment_terms")]
    pub payment_terms_days: u32,

    /// Prefix for sequential invoice numbers
    #[serde(default = "default_invoice_prefix")]
    pub invoice_number_prefix: String,

    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_warning_threshold() -> f64 {
    DEFAULT_WARNING_THRESHOLD
}

fn default_critical_threshold() -> f64 {
    DEFAULT_CRITICAL_THRESHOLD
}

fn default_payment_terms() -> u32 {
    30
}

fn default_invoice_prefix() -> String {
    "INV".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            currency_symbol: default_currency(),
            date_format: default_date_format(),
            default_warning_threshold: default_warning_threshold(),
            default_critical_threshold: default_critical_threshold(),
            default_tax_rate: Percentage::zero(),
            payment_terms_days: default_payment_terms(),
            invoice_number_prefix: default_invoice_prefix(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &LedgerPaths) -> Result<Self, LedgerError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Don't save yet - let caller decide when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| LedgerError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| LedgerError::Config(format!("Failed to parse settings file: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &LedgerPaths) -> Result<(), LedgerError> {
        self.validate()?;
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| LedgerError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| LedgerError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Check that configured defaults are usable
    pub fn validate(&self) -> Result<(), LedgerError> {
        for (name, value) in [
            ("default_warning_threshold", self.default_warning_threshold),
            ("default_critical_threshold", self.default_critical_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(LedgerError::Config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        if self.default_warning_threshold > self.default_critical_threshold {
            return Err(LedgerError::Config(
                "default_warning_threshold cannot exceed default_critical_threshold".into(),
            ));
        }

        if !self.default_tax_rate.is_valid_rate() {
            return Err(LedgerError::Config(format!(
                "default_tax_rate must be between 0 and 100, got {}",
                self.default_tax_rate
            )));
        }

        Ok(())
    }
}
