//! Race card loading and synthetic market generation

pub mod race_card;
pub mod synthetic;

// Re-export commonly used types
pub use race_card::{load_race_card, parse_race_card, RaceCard};
pub use synthetic::SyntheticMarket;
