use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a race simulator
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("Race {0} has no competitors")]
    EmptyField(String),

    #[error("Tick interval must be positive, got {0}ms")]
    InvalidTickInterval(u64),

    #[error("Invalid duration bounds for {category}: {min_ms}ms..={max_ms}ms")]
    InvalidDurationBounds {
        category: String,
        min_ms: u64,
        max_ms: u64,
    },
}

/// Errors raised by wager placement
///
/// Every variant is raised before any ledger state is touched.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Stake must be a positive amount, got {0}")]
    InvalidStake(f64),

    #[error("Stake {stake:.2} is below the minimum of {minimum:.2}")]
    StakeTooSmall { stake: f64, minimum: f64 },

    #[error("Insufficient funds: stake {stake:.2}, available {available:.2}")]
    InsufficientFunds { stake: f64, available: f64 },

    #[error("Competitor {competitor_id} not found in quote for race {race_id}")]
    UnknownCompetitor {
        race_id: String,
        competitor_id: String,
    },

    #[error("Multi needs between {min} and {max} legs, got {actual}")]
    LegCount { min: usize, max: usize, actual: usize },

    #[error("Multi has more than one leg on race {0}")]
    DuplicateRace(String),

    #[error("Race {0} has already been settled")]
    RaceClosed(String),
}

impl LedgerError {
    /// Whether this belongs to the validation family (as opposed to funds)
    pub fn is_validation(&self) -> bool {
        !matches!(self, LedgerError::InsufficientFunds { .. })
    }
}

/// Errors loading engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors loading a race card
#[derive(Debug, Error)]
pub enum CardError {
    #[error("Failed to read race card {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse race card: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid race card: {0}")]
    Invalid(String),
}

/// Validation functions
pub fn validate_stake(stake: f64, minimum: f64) -> Result<(), LedgerError> {
    if !stake.is_finite() || stake <= 0.0 {
        return Err(LedgerError::InvalidStake(stake));
    }
    if stake < minimum {
        return Err(LedgerError::StakeTooSmall { stake, minimum });
    }
    Ok(())
}

pub fn validate_funds(stake: f64, available: f64) -> Result<(), LedgerError> {
    if stake > available {
        return Err(LedgerError::InsufficientFunds { stake, available });
    }
    Ok(())
}

pub fn validate_leg_count(count: usize, max_legs: usize) -> Result<(), LedgerError> {
    if !(2..=max_legs).contains(&count) {
        return Err(LedgerError::LegCount {
            min: 2,
            max: max_legs,
            actual: count,
        });
    }
    Ok(())
}

pub fn validate_field(race_id: &str, field_size: usize) -> Result<(), SimulationError> {
    if field_size == 0 {
        return Err(SimulationError::EmptyField(race_id.to_string()));
    }
    Ok(())
}
