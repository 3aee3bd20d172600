//! Engine configuration
//!
//! Loaded from TOML; every field has a default so a partial file is enough:
//!
//! ```toml
//! default_starting_price_odds = 12.0
//! minimum_stake = 0.5
//!
//! [place_terms.default]
//! factor = 0.25
//! places = [{ min_runners = 0, places = 1 }, { min_runners = 8, places = 3 }]
//! ```

use crate::error::ConfigError;
use crate::ledger::place_terms::PlaceTermsTable;
use crate::models::MIN_PRICED_ODDS;
use crate::simulator::duration::DurationTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Engine configuration shared by the simulator and the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Odds used when a competitor has no market price
    pub default_starting_price_odds: f64,
    pub minimum_stake: f64,
    pub max_legs_per_multi: usize,
    pub tick_interval_ms: u64,
    /// Opening balance of a new ledger
    pub starting_balance: f64,
    pub place_terms: PlaceTermsTable,
    pub durations: DurationTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_starting_price_odds: 10.0,
            minimum_stake: 1.0,
            max_legs_per_multi: 6,
            tick_interval_ms: 200,
            starting_balance: 1_000.0,
            place_terms: PlaceTermsTable::default(),
            durations: DurationTable::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_starting_price_odds >= MIN_PRICED_ODDS) {
            return Err(ConfigError::Invalid(format!(
                "default_starting_price_odds must be at least {}, got {}",
                MIN_PRICED_ODDS, self.default_starting_price_odds
            )));
        }
        if !(self.minimum_stake > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "minimum_stake must be positive, got {}",
                self.minimum_stake
            )));
        }
        if self.max_legs_per_multi < 2 {
            return Err(ConfigError::Invalid(format!(
                "max_legs_per_multi must be at least 2, got {}",
                self.max_legs_per_multi
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        if !(self.starting_balance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "starting_balance must be non-negative, got {}",
                self.starting_balance
            )));
        }

        let terms = std::iter::once(("default", &self.place_terms.default)).chain(
            self.place_terms
                .categories
                .iter()
                .map(|(k, v)| (k.as_str(), v)),
        );
        for (category, t) in terms {
            if !(t.factor > 0.0 && t.factor <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "place factor for {} must be in (0, 1], got {}",
                    category, t.factor
                )));
            }
        }

        let bounds = std::iter::once(("default", &self.durations.default)).chain(
            self.durations
                .categories
                .iter()
                .map(|(k, v)| (k.as_str(), v)),
        );
        for (category, b) in bounds {
            if !b.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "duration bounds for {} are invalid: {}..{}",
                    category, b.min_ms, b.max_ms
                )));
            }
        }

        Ok(())
    }
}
