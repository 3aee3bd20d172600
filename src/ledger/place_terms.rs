//! Category-specific place terms
//!
//! Place odds are derived from win odds as `1 + factor * (win - 1)`, and the
//! number of paying places grows with the field size.

use crate::models::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fields of at least `min_runners` pay `places` places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacesBracket {
    pub min_runners: usize,
    pub places: u32,
}

impl PlacesBracket {
    pub const fn new(min_runners: usize, places: u32) -> Self {
        Self {
            min_runners,
            places,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceTerms {
    /// Fraction of the win odds paid on a place
    pub factor: f64,
    pub places: Vec<PlacesBracket>,
}

impl PlaceTerms {
    /// Paying places for a field; never more than the field itself, never below 1
    pub fn places_paid(&self, field_size: usize) -> u32 {
        let places = self
            .places
            .iter()
            .filter(|b| b.min_runners <= field_size)
            .max_by_key(|b| b.min_runners)
            .map(|b| b.places)
            .unwrap_or(1);

        places.min(field_size.max(1) as u32).max(1)
    }

    pub fn place_odds(&self, win_odds: f64) -> f64 {
        1.0 + self.factor * (win_odds - 1.0)
    }

    fn standard(factor: f64) -> Self {
        Self {
            factor,
            places: vec![
                PlacesBracket::new(0, 1),
                PlacesBracket::new(5, 2),
                PlacesBracket::new(8, 3),
            ],
        }
    }
}

/// Place terms keyed by category, with a required default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceTermsTable {
    pub default: PlaceTerms,
    #[serde(default)]
    pub categories: HashMap<String, PlaceTerms>,
}

impl PlaceTermsTable {
    pub fn for_category(&self, category: &Category) -> &PlaceTerms {
        self.categories
            .get(category.as_str())
            .unwrap_or(&self.default)
    }
}

impl Default for PlaceTermsTable {
    fn default() -> Self {
        let greyhound = PlaceTerms {
            factor: 0.30,
            places: vec![PlacesBracket::new(0, 1), PlacesBracket::new(5, 2)],
        };

        let categories = HashMap::from([
            (Category::HORSE.to_string(), PlaceTerms::standard(0.25)),
            (Category::GREYHOUND.to_string(), greyhound),
            (Category::HARNESS.to_string(), PlaceTerms::standard(0.25)),
        ]);

        Self {
            default: PlaceTerms::standard(0.25),
            categories,
        }
    }
}
