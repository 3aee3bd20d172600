//! Synthetic market generation
//!
//! Generate seeded race fields with bookmaker-style odds when no real card is
//! available. Each runner gets a hidden rating; ratings become fair
//! probabilities, and the margin shortens every price.

use super::race_card::RaceCard;
use crate::core::{seed_from_str, SeededRng};
use crate::models::{
    Category, Competitor, Odds, RaceSpec, TrackCondition, TrackKind, Weather, WeatherKind,
    MIN_PRICED_ODDS,
};

/// Gap between advertised starts on a generated card
const RACE_SPACING_MS: i64 = 10 * 60 * 1000;

/// Spread of runner ratings (log scale)
const RATING_SPREAD: f64 = 0.6;

const NAMES: [&str; 16] = [
    "Silver Comet",
    "Night Harbour",
    "Copper Kettle",
    "Rapid Echo",
    "Lucky Lantern",
    "Iron Duchess",
    "Blue Mirage",
    "Storm Chaser",
    "Quiet Thunder",
    "Golden Arrow",
    "Paper Tiger",
    "Velvet Rope",
    "Northern Dancer",
    "Red Ember",
    "Hidden Pearl",
    "Last Orders",
];

/// Synthetic odds generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticMarket {
    /// Bookmaker margin; 0.18 gives a book of 118%
    pub margin: f64,
    /// Chance that a runner is left without a price
    pub unpriced_share: f64,
}

impl SyntheticMarket {
    pub fn new(margin: f64, unpriced_share: f64) -> Self {
        Self {
            margin: margin.max(0.0),
            unpriced_share: unpriced_share.clamp(0.0, 1.0),
        }
    }

    /// Quoted price for a fair probability, rounded to 2 decimals
    pub fn price(&self, probability: f64) -> f64 {
        let odds = 1.0 / (probability * (1.0 + self.margin));
        ((odds * 100.0).round() / 100.0).max(MIN_PRICED_ODDS)
    }

    /// Generate one race; identical inputs give an identical race
    pub fn generate_race(
        &self,
        race_id: &str,
        category: Category,
        field_size: usize,
        seed: u64,
    ) -> RaceSpec {
        let mut rng = SeededRng::new(seed ^ seed_from_str(race_id));
        let field_size = field_size.max(1);

        let ratings: Vec<f64> = (0..field_size)
            .map(|_| rng.normal(0.0, RATING_SPREAD).exp())
            .collect();
        let total: f64 = ratings.iter().sum();

        let name_offset = (rng.next_f64() * NAMES.len() as f64) as usize;
        let mut competitors: Vec<Competitor> = ratings
            .iter()
            .enumerate()
            .map(|(i, rating)| {
                let number = i as u32 + 1;
                let odds = if rng.chance(self.unpriced_share) {
                    Odds::StartingPrice
                } else {
                    Odds::Priced(self.price(rating / total))
                };
                let name = NAMES[(name_offset + i) % NAMES.len()];
                Competitor::new(format!("{}-{}", race_id, number), name, number, odds)
            })
            .collect();

        // Keep at least one priced runner so the market means something
        if competitors.iter().all(|c| !c.odds.is_priced()) {
            let (idx, best) = ratings
                .iter()
                .enumerate()
                .fold((0, f64::MIN), |acc, (i, r)| if *r > acc.1 { (i, *r) } else { acc });
            competitors[idx].odds = Odds::Priced(self.price(best / total));
        }

        RaceSpec {
            race_id: race_id.to_string(),
            meeting: String::new(),
            race_number: 1,
            category,
            advertised_start_ms: 0,
            weather: Some(random_weather(&mut rng)),
            track: Some(random_track(&mut rng)),
            competitors,
        }
    }

    /// Generate a full meeting, races spaced ten minutes apart
    pub fn generate_card(
        &self,
        meeting: &str,
        category: Category,
        races: u32,
        field_size: usize,
        first_start_ms: i64,
        seed: u64,
    ) -> RaceCard {
        let prefix: String = meeting
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(4)
            .collect::<String>()
            .to_uppercase();

        let races = (1..=races.max(1))
            .map(|n| {
                let race_id = format!("{}-R{}", prefix, n);
                let mut race = self.generate_race(&race_id, category.clone(), field_size, seed);
                race.meeting = meeting.to_string();
                race.race_number = n;
                race.advertised_start_ms = first_start_ms + (n as i64 - 1) * RACE_SPACING_MS;
                race
            })
            .collect();

        RaceCard {
            meeting: meeting.to_string(),
            date: None,
            races,
        }
    }
}

impl Default for SyntheticMarket {
    fn default() -> Self {
        Self::new(0.18, 0.0)
    }
}

fn random_weather(rng: &mut SeededRng) -> Weather {
    let kind = match (rng.next_f64() * 10.0) as u32 {
        0..=4 => WeatherKind::Clear,
        5..=6 => WeatherKind::Cloudy,
        7 => WeatherKind::Windy,
        8 => WeatherKind::Rain,
        _ => WeatherKind::Storm,
    };
    Weather {
        kind,
        intensity: rng.uniform(0.1, 0.9),
    }
}

fn random_track(rng: &mut SeededRng) -> TrackCondition {
    let kind = match (rng.next_f64() * 10.0) as u32 {
        0..=2 => TrackKind::Good,
        3..=4 => TrackKind::Firm,
        5..=6 => TrackKind::Soft,
        7 => TrackKind::Heavy,
        _ => TrackKind::Synthetic,
    };
    TrackCondition {
        kind,
        quality: rng.uniform(0.7, 1.0),
    }
}
