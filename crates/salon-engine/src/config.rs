//! # Engine Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`SALON_*`)
//! 2. Defaults (this file)
//!
//! ## Thread Safety
//! Configuration is read-only after the engine is built, so no mutex.

use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use salon_core::reconcile::{DailySalesPolicy, ToleranceBand};
use salon_core::Money;

/// Largest offset any timezone uses, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// SQLite ledger file.
    /// Default: `./salon.db`
    pub database_path: PathBuf,

    /// Largest deposit difference still reported as a match.
    /// Default: 1.00
    pub deposit_tolerance: Money,

    /// Largest deposit difference still sent to manual review; anything
    /// above is a mismatch.
    /// Default: 100.00
    pub deposit_mismatch_ceiling: Money,

    /// Offset of the business timezone from UTC, in minutes. Decides where
    /// one business day ends and the next begins.
    /// Default: 0
    pub utc_offset_minutes: i32,

    /// Which invoices count toward daily sales.
    /// Default: `rung_up`
    pub daily_sales_policy: DailySalesPolicy,

    /// Currency symbol (for display)
    pub currency_symbol: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let band = ToleranceBand::default();
        EngineConfig {
            database_path: PathBuf::from("./salon.db"),
            deposit_tolerance: band.tolerance,
            deposit_mismatch_ceiling: band.mismatch_ceiling,
            utc_offset_minutes: 0,
            daily_sales_policy: DailySalesPolicy::default(),
            currency_symbol: "₱".to_string(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `SALON_DB_PATH`: ledger database file
    /// - `SALON_DEPOSIT_TOLERANCE`: match tolerance (e.g., "1.00")
    /// - `SALON_DEPOSIT_MISMATCH_CEILING`: review ceiling (e.g., "100.00")
    /// - `SALON_UTC_OFFSET_MINUTES`: business timezone (e.g., "480")
    /// - `SALON_DAILY_SALES_POLICY`: `rung_up` or `collected`
    /// - `SALON_CURRENCY_SYMBOL`: display symbol
    ///
    /// Unparseable values are logged and the default is kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = EngineConfig::default();

        if let Some(path) = lookup("SALON_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("SALON_DEPOSIT_TOLERANCE") {
            match raw.parse::<Money>() {
                Ok(amount) if !amount.is_negative() => config.deposit_tolerance = amount,
                _ => warn!(value = %raw, "Ignoring invalid SALON_DEPOSIT_TOLERANCE"),
            }
        }

        if let Some(raw) = lookup("SALON_DEPOSIT_MISMATCH_CEILING") {
            match raw.parse::<Money>() {
                Ok(amount) if !amount.is_negative() => config.deposit_mismatch_ceiling = amount,
                _ => warn!(value = %raw, "Ignoring invalid SALON_DEPOSIT_MISMATCH_CEILING"),
            }
        }

        if let Some(raw) = lookup("SALON_UTC_OFFSET_MINUTES") {
            match raw.trim().parse::<i32>() {
                Ok(minutes) if minutes.abs() <= MAX_UTC_OFFSET_MINUTES => {
                    config.utc_offset_minutes = minutes
                }
                _ => warn!(value = %raw, "Ignoring invalid SALON_UTC_OFFSET_MINUTES"),
            }
        }

        if let Some(raw) = lookup("SALON_DAILY_SALES_POLICY") {
            match raw.parse::<DailySalesPolicy>() {
                Ok(policy) => config.daily_sales_policy = policy,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid SALON_DAILY_SALES_POLICY"),
            }
        }

        if let Some(symbol) = lookup("SALON_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        config
    }

    /// Deposit classification thresholds.
    pub fn tolerance_band(&self) -> ToleranceBand {
        ToleranceBand {
            tolerance: self.deposit_tolerance,
            mismatch_ceiling: self.deposit_mismatch_ceiling,
        }
    }

    /// The business timezone. Falls back to UTC for an out-of-range offset.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Formats an amount with the currency symbol.
    ///
    /// ## Example
    /// ```rust
    /// use salon_core::Money;
    /// use salon_engine::EngineConfig;
    ///
    /// let config = EngineConfig::default();
    /// assert_eq!(config.format_currency(Money::from_cents(67_500)), "₱675.00");
    /// assert_eq!(config.format_currency(Money::from_cents(-150)), "-₱1.50");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        format!(
            "{}{}{}",
            if amount.is_negative() { "-" } else { "" },
            self.currency_symbol,
            amount.abs()
        )
    }
}
