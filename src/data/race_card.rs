//! Race card JSON loading
//!
//! A card lists the races of one meeting:
//!
//! ```json
//! {
//!   "meeting": "Sandown Park",
//!   "date": "2024-06-01",
//!   "races": [
//!     {
//!       "race_id": "SAN-R1",
//!       "race_number": 1,
//!       "category": "greyhound",
//!       "competitors": [
//!         { "id": "d1", "name": "Fast Fred", "number": 1, "odds": 2.4 },
//!         { "id": "d2", "name": "Slow Sam", "number": 2, "odds": null }
//!       ]
//!     }
//!   ]
//! }
//! ```

use crate::error::CardError;
use crate::models::RaceSpec;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceCard {
    pub meeting: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub races: Vec<RaceSpec>,
}

impl RaceCard {
    pub fn race(&self, race_id: &str) -> Option<&RaceSpec> {
        self.races.iter().find(|r| r.race_id == race_id)
    }

    fn validate(&self) -> Result<(), CardError> {
        if self.races.is_empty() {
            return Err(CardError::Invalid(format!(
                "meeting {} has no races",
                self.meeting
            )));
        }

        let mut race_ids = HashSet::new();
        for race in &self.races {
            if !race_ids.insert(race.race_id.as_str()) {
                return Err(CardError::Invalid(format!(
                    "duplicate race id {}",
                    race.race_id
                )));
            }
            if race.competitors.is_empty() {
                return Err(CardError::Invalid(format!(
                    "race {} has no competitors",
                    race.race_id
                )));
            }

            let mut ids = HashSet::new();
            for c in &race.competitors {
                if !ids.insert(c.id.as_str()) {
                    return Err(CardError::Invalid(format!(
                        "race {} lists competitor {} twice",
                        race.race_id, c.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Load race card from JSON file
pub fn load_race_card<P: AsRef<Path>>(path: P) -> Result<RaceCard, CardError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| CardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_race_card(&content)
}

/// Parse and validate a race card; races inherit the card's meeting name
pub fn parse_race_card(content: &str) -> Result<RaceCard, CardError> {
    let mut card: RaceCard = serde_json::from_str(content)?;
    for race in &mut card.races {
        if race.meeting.is_empty() {
            race.meeting = card.meeting.clone();
        }
    }
    card.validate()?;
    Ok(card)
}
