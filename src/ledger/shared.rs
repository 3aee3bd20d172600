//! Thread-safe ledger handle
//!
//! A multi's remaining legs are read then written across settlement calls,
//! so every operation takes the one ledger lock.

use super::bankroll::BankrollState;
use super::book::{BettingLedger, LegSelection};
use super::settlement::SettlementRecord;
use super::wager::{BetType, Wager, WagerId};
use crate::error::LedgerError;
use crate::models::{Quote, RaceResult};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<BettingLedger>>,
}

impl SharedLedger {
    pub fn new(ledger: BettingLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Run a closure with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut BettingLedger) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn place_single(
        &self,
        quote: &Quote,
        competitor_id: &str,
        stake: f64,
        bet: BetType,
    ) -> Result<Wager, LedgerError> {
        self.inner
            .lock()
            .place_single(quote, competitor_id, stake, bet)
    }

    pub fn place_multi(
        &self,
        selections: &[LegSelection<'_>],
        stake: f64,
    ) -> Result<Wager, LedgerError> {
        self.inner.lock().place_multi(selections, stake)
    }

    pub fn cancel(&self, id: WagerId, race_clock_ms: i64, advertised_start_ms: i64) -> bool {
        self.inner
            .lock()
            .cancel(id, race_clock_ms, advertised_start_ms)
    }

    pub fn settle_race(&self, result: &RaceResult) -> Vec<SettlementRecord> {
        self.inner.lock().settle_race(result)
    }

    pub fn settle_many(&self, results: &[RaceResult]) -> Vec<SettlementRecord> {
        self.inner.lock().settle_many(results)
    }

    pub fn prune_settled_races<F>(&self, keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        self.inner.lock().prune_settled_races(keep)
    }

    pub fn bankroll(&self) -> BankrollState {
        self.inner.lock().bankroll()
    }

    pub fn settlements(&self) -> Vec<SettlementRecord> {
        self.inner.lock().settlements().to_vec()
    }

    pub fn open_wagers(&self) -> Vec<Wager> {
        self.inner
            .lock()
            .open_wagers()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn wager(&self, id: WagerId) -> Option<Wager> {
        self.inner.lock().wager(id).cloned()
    }
}
