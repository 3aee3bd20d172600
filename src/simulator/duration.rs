//! Planned race duration per category

use crate::core::rng::SeededRng;
use crate::models::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Planned duration wobble (± fraction)
pub const DURATION_WOBBLE: f64 = 0.04;

/// Inclusive bounds on a race's planned duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBounds {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DurationBounds {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms > 0 && self.min_ms <= self.max_ms
    }
}

/// Duration bounds keyed by category, with a required default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationTable {
    pub default: DurationBounds,
    #[serde(default)]
    pub categories: HashMap<String, DurationBounds>,
}

impl DurationTable {
    pub fn for_category(&self, category: &Category) -> DurationBounds {
        self.categories
            .get(category.as_str())
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for DurationTable {
    fn default() -> Self {
        let categories = HashMap::from([
            (
                Category::GREYHOUND.to_string(),
                DurationBounds::new(22_000, 34_000),
            ),
            (
                Category::HORSE.to_string(),
                DurationBounds::new(38_000, 62_000),
            ),
            (
                Category::HARNESS.to_string(),
                DurationBounds::new(50_000, 75_000),
            ),
        ]);

        Self {
            default: DurationBounds::new(35_000, 60_000),
            categories,
        }
    }
}

/// Draw a planned duration inside the bounds, with a small seeded wobble
pub fn plan_duration(bounds: DurationBounds, rng: &mut SeededRng) -> u64 {
    let base = rng.uniform(bounds.min_ms as f64, bounds.max_ms as f64);
    let wobble = rng.symmetric(DURATION_WOBBLE);
    let planned = (base * (1.0 + wobble)).round();

    (planned as u64).clamp(bounds.min_ms, bounds.max_ms)
}
