//! Raceday - simulated race meetings with a wagering ledger
//!
//! This library provides:
//! - A deterministic race simulator: seeded pace curves, environmental
//!   effects and a fixed-period tick loop that ends in one authoritative
//!   finishing order
//! - A betting ledger: WIN / PLACE / EACH_WAY singles and multis with
//!   locked-fund accounting and race-driven settlement
//! - Race card loading and a synthetic market generator
//!
//! # Example
//!
//! ```no_run
//! use raceday::{BetType, BettingLedger, EngineConfig, RaceSimulator, SyntheticMarket};
//! use raceday::models::Category;
//!
//! let config = EngineConfig::default();
//! let race = SyntheticMarket::default().generate_race("R1", Category::horse(), 8, 7);
//!
//! let mut ledger = BettingLedger::new(&config);
//! let first = race.competitors[0].id.clone();
//! ledger.place_single(&race.quote(), &first, 10.0, BetType::Win).unwrap();
//!
//! let mut sim = RaceSimulator::from_config(race, 7, &config).unwrap();
//! let (result, _ticks) = sim.run_to_completion(0).unwrap();
//! for record in ledger.settle_race(&result) {
//!     println!("{}: {}", record.wager_id, record.breakdown);
//! }
//! ```

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod ledger;
pub mod models;
pub mod simulator;

// Re-export commonly used types
pub use config::EngineConfig;
pub use data::{load_race_card, RaceCard, SyntheticMarket};
pub use error::{CardError, ConfigError, LedgerError, SimulationError};
pub use ledger::{
    BankrollState, BetType, BettingLedger, LegSelection, SettlementRecord, SharedLedger, Wager,
    WagerId, WagerKind, WagerStatus,
};
pub use models::{
    Category, Competitor, Odds, Quote, RaceResult, RaceSpec, RaceStatus, Tick,
};
pub use simulator::{spawn_race, RaceEvent, RaceHandle, RaceSimulator};
