//! Betting ledger: placement and cancellation
//!
//! The ledger owns every wager, the per-race index used by settlement, and the
//! bankroll. Placement validates everything up front, then locks funds and
//! records the wager in one step so a failed call leaves no trace.

use super::bankroll::BankrollState;
use super::settlement::SettlementRecord;
use super::wager::{potential_return, BetType, Leg, LegOutcome, Wager, WagerId, WagerKind, WagerStatus};
use crate::config::EngineConfig;
use crate::core::round2;
use crate::error::{validate_leg_count, validate_stake, LedgerError};
use crate::models::{Odds, Quote};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// One selection of a multi, priced against its own race quote
#[derive(Debug, Clone, Copy)]
pub struct LegSelection<'a> {
    pub quote: &'a Quote,
    pub competitor_id: &'a str,
}

impl<'a> LegSelection<'a> {
    pub fn new(quote: &'a Quote, competitor_id: &'a str) -> Self {
        Self {
            quote,
            competitor_id,
        }
    }
}

#[derive(Debug)]
pub struct BettingLedger {
    pub(super) config: EngineConfig,
    pub(super) bankroll: BankrollState,
    pub(super) wagers: BTreeMap<WagerId, Wager>,
    /// Race id -> wagers still waiting on that race
    pub(super) race_index: HashMap<String, Vec<WagerId>>,
    /// Races already settled; grows with every settled race until pruned
    pub(super) settled_races: HashSet<String>,
    pub(super) settlements: Vec<SettlementRecord>,
    next_id: u64,
}

impl BettingLedger {
    /// New ledger opened with the configured starting balance
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_balance(config, config.starting_balance)
    }

    pub fn with_balance(config: &EngineConfig, balance: f64) -> Self {
        Self {
            config: config.clone(),
            bankroll: BankrollState::new(balance),
            wagers: BTreeMap::new(),
            race_index: HashMap::new(),
            settled_races: HashSet::new(),
            settlements: Vec::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of the bankroll
    pub fn bankroll(&self) -> BankrollState {
        self.bankroll
    }

    /// Append-only settlement history, oldest first
    pub fn settlements(&self) -> &[SettlementRecord] {
        &self.settlements
    }

    pub fn open_wagers(&self) -> Vec<&Wager> {
        self.wagers.values().filter(|w| w.is_pending()).collect()
    }

    pub fn wager(&self, id: WagerId) -> Option<&Wager> {
        self.wagers.get(&id)
    }

    pub fn is_settled(&self, race_id: &str) -> bool {
        self.settled_races.contains(race_id)
    }

    /// Drop settled race ids for which `keep` returns false, returning how many went
    ///
    /// Wagers on a settled race are already out of the race index, so pruning never
    /// settles anything twice. A pruned race id accepts new wagers again, so only
    /// prune ids that will not be reused (a finished meeting, say).
    pub fn prune_settled_races<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.settled_races.len();
        self.settled_races.retain(|race_id| keep(race_id));
        before - self.settled_races.len()
    }

    /// Place a WIN, PLACE or EACH_WAY wager on one race
    pub fn place_single(
        &mut self,
        quote: &Quote,
        competitor_id: &str,
        stake: f64,
        bet: BetType,
    ) -> Result<Wager, LedgerError> {
        validate_stake(stake, self.config.minimum_stake)?;
        let leg = self.price_leg(quote, competitor_id)?;

        let kind = WagerKind::from(bet);
        let potential = potential_return(kind, stake, std::slice::from_ref(&leg));
        let wager = self.record(kind, stake, vec![leg], potential)?;

        info!(
            "Placed {} {} on {} ({}) stake={:.2} potential={:.2}",
            wager.id, kind, quote.race_id, competitor_id, stake, potential
        );
        Ok(wager)
    }

    /// Place a multi: every leg must win, on distinct races
    pub fn place_multi(
        &mut self,
        selections: &[LegSelection<'_>],
        stake: f64,
    ) -> Result<Wager, LedgerError> {
        validate_leg_count(selections.len(), self.config.max_legs_per_multi)?;
        validate_stake(stake, self.config.minimum_stake)?;

        let mut seen = HashSet::new();
        let mut legs = Vec::with_capacity(selections.len());
        for sel in selections {
            if !seen.insert(sel.quote.race_id.as_str()) {
                return Err(LedgerError::DuplicateRace(sel.quote.race_id.clone()));
            }
            legs.push(self.price_leg(sel.quote, sel.competitor_id)?);
        }

        let potential = potential_return(WagerKind::Multi, stake, &legs);
        let wager = self.record(WagerKind::Multi, stake, legs, potential)?;

        info!(
            "Placed {} MULTI x{} stake={:.2} potential={:.2}",
            wager.id,
            wager.legs.len(),
            stake,
            potential
        );
        Ok(wager)
    }

    /// Void a pending wager before its race jumps
    ///
    /// Returns `false` without touching anything when the wager is unknown,
    /// no longer pending, already has a resolved leg, or the race clock has
    /// reached the advertised start.
    pub fn cancel(&mut self, id: WagerId, race_clock_ms: i64, advertised_start_ms: i64) -> bool {
        if race_clock_ms >= advertised_start_ms {
            debug!("Cancel {} refused: race clock at or past advertised start", id);
            return false;
        }

        let wager = match self.wagers.get_mut(&id) {
            Some(w) if w.is_pending() && w.remaining_legs() == w.legs.len() => w,
            Some(_) => {
                debug!("Cancel {} refused: wager already resolving", id);
                return false;
            }
            None => {
                warn!("Cancel refused: unknown wager {}", id);
                return false;
            }
        };

        wager.status = WagerStatus::Void;
        let stake = wager.stake;
        let kind = wager.kind;
        let odds = combined_odds(wager);
        let races: Vec<String> = wager.race_ids().map(str::to_string).collect();

        self.bankroll.release(stake);
        for race_id in &races {
            self.unindex(race_id, id);
        }

        let record = SettlementRecord {
            wager_id: id,
            kind,
            stake,
            odds,
            status: WagerStatus::Void,
            payout: round2(stake),
            profit_loss: 0.0,
            breakdown: format!("{} voided before the jump, stake {:.2} returned", kind, stake),
            settled_at: Utc::now(),
        };
        self.settlements.push(record);

        info!("Cancelled {} ({}), released {:.2}", id, kind, stake);
        true
    }

    /// Resolve the runner in the quote and snapshot its prices
    fn price_leg(&self, quote: &Quote, competitor_id: &str) -> Result<Leg, LedgerError> {
        if self.settled_races.contains(&quote.race_id) {
            return Err(LedgerError::RaceClosed(quote.race_id.clone()));
        }

        let runner = quote
            .runner(competitor_id)
            .ok_or_else(|| LedgerError::UnknownCompetitor {
                race_id: quote.race_id.clone(),
                competitor_id: competitor_id.to_string(),
            })?;

        let terms = self.config.place_terms.for_category(&quote.category);
        let field_size = quote.field_size();
        let win_odds = runner.odds.resolve(self.config.default_starting_price_odds);

        Ok(Leg {
            race_id: quote.race_id.clone(),
            competitor_id: runner.competitor_id.clone(),
            competitor_name: runner.name.clone(),
            competitor_number: runner.number,
            quoted: Odds::from_decimal(runner.odds.priced()),
            win_odds,
            place_odds: terms.place_odds(win_odds),
            category: quote.category.clone(),
            field_size,
            places_paid: terms.places_paid(field_size),
            outcome: LegOutcome::Pending,
            position: None,
        })
    }

    /// Lock funds and store the wager; nothing is mutated if funds fall short
    fn record(
        &mut self,
        kind: WagerKind,
        stake: f64,
        legs: Vec<Leg>,
        potential: f64,
    ) -> Result<Wager, LedgerError> {
        self.bankroll.lock(stake)?;

        let id = WagerId(self.next_id);
        self.next_id += 1;

        let wager = Wager {
            id,
            placed_at: Utc::now(),
            stake,
            kind,
            status: WagerStatus::Pending,
            legs,
            potential_return: potential,
            running_return: stake,
        };

        for race_id in wager.race_ids() {
            self.race_index
                .entry(race_id.to_string())
                .or_default()
                .push(id);
        }
        self.wagers.insert(id, wager.clone());
        Ok(wager)
    }

    pub(super) fn unindex(&mut self, race_id: &str, id: WagerId) {
        if let Some(ids) = self.race_index.get_mut(race_id) {
            ids.retain(|w| *w != id);
            if ids.is_empty() {
                self.race_index.remove(race_id);
            }
        }
    }
}

/// Win odds of a single, or the product across a multi's legs
pub(super) fn combined_odds(wager: &Wager) -> f64 {
    match wager.kind {
        WagerKind::Multi => wager.legs.iter().map(|l| l.win_odds).product(),
        _ => wager.legs.first().map(|l| l.win_odds).unwrap_or(0.0),
    }
}
