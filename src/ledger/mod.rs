//! Betting ledger
//!
//! Wager placement, locked-fund accounting and race-driven settlement.

pub mod bankroll;
pub mod book;
pub mod metrics;
pub mod place_terms;
pub mod settlement;
pub mod shared;
pub mod wager;

pub use bankroll::BankrollState;
pub use book::{BettingLedger, LegSelection};
pub use metrics::{analyze_by_kind, analyze_by_odds_range, calculate_metrics, DimensionAnalysis, LedgerMetrics};
pub use place_terms::{PlaceTerms, PlaceTermsTable, PlacesBracket};
pub use settlement::SettlementRecord;
pub use shared::SharedLedger;
pub use wager::{BetType, Leg, LegOutcome, Wager, WagerId, WagerKind, WagerStatus};
