use crate::models::{Category, CompetitorId, Odds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger-assigned wager identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WagerId(pub u64);

impl fmt::Display for WagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{:06}", self.0)
    }
}

/// Bet types available on a single race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetType {
    Win,
    Place,
    EachWay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WagerKind {
    Win,
    Place,
    EachWay,
    Multi,
}

impl From<BetType> for WagerKind {
    fn from(bet: BetType) -> Self {
        match bet {
            BetType::Win => WagerKind::Win,
            BetType::Place => WagerKind::Place,
            BetType::EachWay => WagerKind::EachWay,
        }
    }
}

impl fmt::Display for WagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WagerKind::Win => "WIN",
            WagerKind::Place => "PLACE",
            WagerKind::EachWay => "EACH_WAY",
            WagerKind::Multi => "MULTI",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WagerStatus {
    Pending,
    Won,
    Lost,
    Void,
    SettledPartial,
}

impl fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WagerStatus::Pending => "PENDING",
            WagerStatus::Won => "WON",
            WagerStatus::Lost => "LOST",
            WagerStatus::Void => "VOID",
            WagerStatus::SettledPartial => "SETTLED_PARTIAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegOutcome {
    Pending,
    Won,
    Lost,
}

/// One race selection within a wager; prices are snapshots taken at placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    pub race_id: String,
    pub competitor_id: CompetitorId,
    pub competitor_name: String,
    pub competitor_number: u32,
    /// Market price as quoted (may be starting price)
    pub quoted: Odds,
    pub win_odds: f64,
    pub place_odds: f64,
    pub category: Category,
    pub field_size: usize,
    pub places_paid: u32,
    pub outcome: LegOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wager {
    pub id: WagerId,
    pub placed_at: DateTime<Utc>,
    pub stake: f64,
    pub kind: WagerKind,
    pub status: WagerStatus,
    pub legs: Vec<Leg>,
    pub potential_return: f64,
    /// Multi accumulator, seeded at the stake
    pub running_return: f64,
}

impl Wager {
    pub fn is_pending(&self) -> bool {
        self.status == WagerStatus::Pending
    }

    pub fn race_ids(&self) -> impl Iterator<Item = &str> {
        self.legs.iter().map(|l| l.race_id.as_str())
    }

    pub fn leg_for_race(&self, race_id: &str) -> Option<&Leg> {
        self.legs.iter().find(|l| l.race_id == race_id)
    }

    pub fn leg_for_race_mut(&mut self, race_id: &str) -> Option<&mut Leg> {
        self.legs.iter_mut().find(|l| l.race_id == race_id)
    }

    pub fn remaining_legs(&self) -> usize {
        self.legs
            .iter()
            .filter(|l| l.outcome == LegOutcome::Pending)
            .count()
    }
}

/// Return if every part of the wager lands
pub fn potential_return(kind: WagerKind, stake: f64, legs: &[Leg]) -> f64 {
    match kind {
        WagerKind::Win => legs.first().map(|l| stake * l.win_odds).unwrap_or(0.0),
        WagerKind::Place => legs.first().map(|l| stake * l.place_odds).unwrap_or(0.0),
        WagerKind::EachWay => legs
            .first()
            .map(|l| stake / 2.0 * l.win_odds + stake / 2.0 * l.place_odds)
            .unwrap_or(0.0),
        WagerKind::Multi => legs.iter().fold(stake, |acc, l| acc * l.win_odds),
    }
}
