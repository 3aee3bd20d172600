//! Shared numeric helpers used by the simulator and the ledger

pub mod money;
pub mod pace;
pub mod probability;
pub mod rng;

// Re-export commonly used items
pub use money::round2;
pub use pace::{fatigue_multiplier, pace_curve, PaceProfile};
pub use probability::{implied_overround, normalize_probabilities, strengths};
pub use rng::{seed_from_str, SeededRng};
