use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest decimal price a market can quote
pub const MIN_PRICED_ODDS: f64 = 1.01;

/// Competitor identifier as supplied by the race feed
pub type CompetitorId = String;

/// Market price for a competitor
///
/// Serialized as a decimal number, or `null` for starting price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Odds {
    Priced(f64),
    #[default]
    StartingPrice,
}

impl Odds {
    /// Build from a raw feed value; missing, non-finite or sub-minimum prices are unpriced
    pub fn from_decimal(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() && v >= MIN_PRICED_ODDS => Odds::Priced(v),
            _ => Odds::StartingPrice,
        }
    }

    /// The quoted price, if it is a usable one
    ///
    /// A `Priced` value that is non-finite or under [`MIN_PRICED_ODDS`] counts as unpriced.
    pub fn priced(&self) -> Option<f64> {
        match *self {
            Odds::Priced(v) if v.is_finite() && v >= MIN_PRICED_ODDS => Some(v),
            _ => None,
        }
    }

    pub fn is_priced(&self) -> bool {
        self.priced().is_some()
    }

    /// Concrete decimal odds, falling back to the starting price
    pub fn resolve(&self, starting_price: f64) -> f64 {
        self.priced().unwrap_or(starting_price)
    }
}

impl From<Option<f64>> for Odds {
    fn from(value: Option<f64>) -> Self {
        Odds::from_decimal(value)
    }
}

impl From<Odds> for Option<f64> {
    fn from(odds: Odds) -> Self {
        odds.priced()
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.priced() {
            Some(v) => write!(f, "{:.2}", v),
            None => write!(f, "SP"),
        }
    }
}

/// Opaque race category identifier (selects duration bounds and place terms)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub const HORSE: &'static str = "horse";
    pub const GREYHOUND: &'static str = "greyhound";
    pub const HARNESS: &'static str = "harness";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn horse() -> Self {
        Self::new(Self::HORSE)
    }

    pub fn greyhound() -> Self {
        Self::new(Self::GREYHOUND)
    }

    pub fn harness() -> Self {
        Self::new(Self::HARNESS)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Competitor entered in a race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competitor {
    pub id: CompetitorId,
    pub name: String,
    pub number: u32,
    #[serde(default)]
    pub odds: Odds,
}

impl Competitor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, number: u32, odds: Odds) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            number,
            odds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    Clear,
    Cloudy,
    Windy,
    Rain,
    Storm,
}

/// Weather on the day; intensity in 0..1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub kind: WeatherKind,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
}

fn default_intensity() -> f64 {
    0.5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Firm,
    Good,
    Soft,
    Heavy,
    Synthetic,
}

/// Track surface; quality 1.0 is a perfectly prepared track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackCondition {
    pub kind: TrackKind,
    #[serde(default = "default_quality")]
    pub quality: f64,
}

fn default_quality() -> f64 {
    1.0
}

/// Race definition consumed by the simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSpec {
    pub race_id: String,
    #[serde(default)]
    pub meeting: String,
    pub race_number: u32,
    pub category: Category,
    /// Advertised jump time (epoch ms)
    #[serde(default)]
    pub advertised_start_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackCondition>,
    pub competitors: Vec<Competitor>,
}

impl RaceSpec {
    pub fn competitor(&self, id: &str) -> Option<&Competitor> {
        self.competitors.iter().find(|c| c.id == id)
    }

    /// Snapshot the current market for wager pricing
    pub fn quote(&self) -> Quote {
        Quote {
            race_id: self.race_id.clone(),
            category: self.category.clone(),
            advertised_start_ms: self.advertised_start_ms,
            field_size: None,
            runners: self
                .competitors
                .iter()
                .map(|c| QuotedRunner {
                    competitor_id: c.id.clone(),
                    name: c.name.clone(),
                    number: c.number,
                    odds: c.odds,
                })
                .collect(),
        }
    }
}

/// Priced runner inside a quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotedRunner {
    pub competitor_id: CompetitorId,
    pub name: String,
    pub number: u32,
    #[serde(default)]
    pub odds: Odds,
}

/// Market snapshot wagers are priced against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub race_id: String,
    pub category: Category,
    #[serde(default)]
    pub advertised_start_ms: i64,
    /// Explicit field size; defaults to the number of quoted runners
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_size: Option<usize>,
    pub runners: Vec<QuotedRunner>,
}

impl Quote {
    pub fn with_field_size(mut self, field_size: usize) -> Self {
        self.field_size = Some(field_size);
        self
    }

    pub fn field_size(&self) -> usize {
        self.field_size.unwrap_or(self.runners.len())
    }

    pub fn runner(&self, competitor_id: &str) -> Option<&QuotedRunner> {
        self.runners.iter().find(|r| r.competitor_id == competitor_id)
    }

    /// Sum of implied probabilities across priced runners
    pub fn overround(&self) -> Option<f64> {
        let odds: Vec<Odds> = self.runners.iter().map(|r| r.odds).collect();
        crate::core::probability::implied_overround(&odds)
    }
}

/// Simulator lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceStatus {
    Pending,
    Running,
    Finished,
    Aborted,
}

impl fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RaceStatus::Pending => "pending",
            RaceStatus::Running => "running",
            RaceStatus::Finished => "finished",
            RaceStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Progress of one competitor at a tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerProgress {
    pub competitor_id: CompetitorId,
    pub progress: f64,
    pub gap: f64,
}

/// Snapshot emitted on every scheduler period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub race_id: String,
    pub elapsed_ms: u64,
    pub total_ms: u64,
    /// Roster order
    pub runners: Vec<RunnerProgress>,
    /// Running order, leader first
    pub order: Vec<CompetitorId>,
    pub remaining_ms: u64,
    pub status: RaceStatus,
}

impl Tick {
    pub fn progress_of(&self, competitor_id: &str) -> Option<f64> {
        self.runners
            .iter()
            .find(|r| r.competitor_id == competitor_id)
            .map(|r| r.progress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishTime {
    pub competitor_id: CompetitorId,
    /// Milliseconds after the start
    pub time_ms: u64,
}

/// Final, immutable outcome of a race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub race_id: String,
    /// Finishing order, winner first
    pub placings: Vec<CompetitorId>,
    /// Finish times in placing order
    pub finish_times_ms: Vec<FinishTime>,
    pub status: RaceStatus,
    pub seed: u64,
    pub started_at_ms: i64,
}

impl RaceResult {
    /// 1-based finishing position
    pub fn position_of(&self, competitor_id: &str) -> Option<usize> {
        self.placings
            .iter()
            .position(|id| id == competitor_id)
            .map(|idx| idx + 1)
    }

    pub fn winner(&self) -> Option<&str> {
        self.placings.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> RaceSpec {
        RaceSpec {
            race_id: "R1".to_string(),
            meeting: "Flemington".to_string(),
            race_number: 1,
            category: Category::horse(),
            advertised_start_ms: 1_000,
            weather: None,
            track: None,
            competitors: vec![
                Competitor::new("a", "Alpha", 1, Odds::Priced(2.5)),
                Competitor::new("b", "Bravo", 2, Odds::StartingPrice),
            ],
        }
    }

    #[test]
    fn test_odds_from_decimal() {
        assert_eq!(Odds::from_decimal(Some(3.5)), Odds::Priced(3.5));
        assert_eq!(Odds::from_decimal(Some(1.01)), Odds::Priced(1.01));
        assert_eq!(Odds::from_decimal(Some(1.0)), Odds::StartingPrice);
        assert_eq!(Odds::from_decimal(Some(f64::NAN)), Odds::StartingPrice);
        assert_eq!(Odds::from_decimal(None), Odds::StartingPrice);
    }

    #[test]
    fn test_out_of_range_priced_is_unpriced() {
        for raw in [0.0, 0.5, 1.0, -3.0, f64::NAN, f64::INFINITY] {
            let odds = Odds::Priced(raw);
            assert_eq!(odds.priced(), None);
            assert!(!odds.is_priced());
            assert!((odds.resolve(10.0) - 10.0).abs() < 1e-12);
            assert_eq!(odds.to_string(), "SP");
        }
        assert_eq!(Odds::Priced(1.01).priced(), Some(1.01));
    }

    #[test]
    fn test_odds_resolve() {
        assert!((Odds::Priced(4.0).resolve(10.0) - 4.0).abs() < 1e-12);
        assert!((Odds::StartingPrice.resolve(10.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_odds_serialization() {
        let c: Competitor =
            serde_json::from_str(r#"{"id":"x","name":"X","number":3,"odds":null}"#).unwrap();
        assert_eq!(c.odds, Odds::StartingPrice);

        let c: Competitor = serde_json::from_str(r#"{"id":"x","name":"X","number":3}"#).unwrap();
        assert_eq!(c.odds, Odds::StartingPrice);

        let c: Competitor =
            serde_json::from_str(r#"{"id":"x","name":"X","number":3,"odds":6.5}"#).unwrap();
        assert_eq!(c.odds, Odds::Priced(6.5));

        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("6.5"));
    }

    #[test]
    fn test_quote_from_spec() {
        let quote = sample_spec().quote();
        assert_eq!(quote.race_id, "R1");
        assert_eq!(quote.field_size(), 2);
        assert_eq!(quote.clone().with_field_size(8).field_size(), 8);
        assert!(quote.runner("b").is_some());
        assert!(quote.runner("z").is_none());
    }

    #[test]
    fn test_result_position_of() {
        let result = RaceResult {
            race_id: "R1".to_string(),
            placings: vec!["b".to_string(), "a".to_string()],
            finish_times_ms: Vec::new(),
            status: RaceStatus::Finished,
            seed: 7,
            started_at_ms: 0,
        };
        assert_eq!(result.position_of("b"), Some(1));
        assert_eq!(result.position_of("a"), Some(2));
        assert_eq!(result.position_of("z"), None);
        assert_eq!(result.winner(), Some("b"));
    }
}
