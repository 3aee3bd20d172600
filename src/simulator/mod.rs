//! Deterministic race simulation

pub mod driver;
pub mod duration;
pub mod engine;
pub mod environment;

pub use driver::{spawn_race, RaceEvent, RaceHandle};
pub use duration::{DurationBounds, DurationTable};
pub use engine::{RaceSimulator, RunnerPlan};
pub use environment::EnvironmentFactors;
