//! Race-driven settlement
//!
//! Singles resolve in full when their race settles. A multi resolves one leg
//! per race, in whatever order the races finish: a losing leg kills the
//! wager at once, a winning leg compounds the running return.

use super::book::{combined_odds, BettingLedger};
use super::wager::{Leg, LegOutcome, Wager, WagerId, WagerKind, WagerStatus};
use crate::core::round2;
use crate::models::{RaceResult, RaceStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Terminal outcome of a wager; never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub wager_id: WagerId,
    pub kind: WagerKind,
    pub stake: f64,
    /// Win odds at placement (product of legs for a multi)
    pub odds: f64,
    pub status: WagerStatus,
    pub payout: f64,
    pub profit_loss: f64,
    pub breakdown: String,
    pub settled_at: DateTime<Utc>,
}

/// Payout and status for a single-race wager
#[derive(Debug, Clone, PartialEq)]
pub struct SingleOutcome {
    pub status: WagerStatus,
    pub payout: f64,
    pub breakdown: String,
}

/// Effect of one race on a multi
#[derive(Debug, Clone, PartialEq)]
pub enum MultiStep {
    /// Leg lost; the whole wager is dead
    Lost { breakdown: String },
    /// Leg won; more legs to come
    Advanced { running_return: f64 },
    /// Final leg won
    Completed { payout: f64, breakdown: String },
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

fn finish_text(position: Option<usize>) -> String {
    match position {
        Some(p) => format!("finished {}", ordinal(p)),
        None => "did not finish".to_string(),
    }
}

fn is_winner(position: Option<usize>) -> bool {
    position == Some(1)
}

fn is_placed(position: Option<usize>, places_paid: u32) -> bool {
    matches!(position, Some(p) if p >= 1 && p <= places_paid as usize)
}

pub fn settle_win(leg: &Leg, stake: f64, position: Option<usize>) -> SingleOutcome {
    let won = is_winner(position);
    SingleOutcome {
        status: if won { WagerStatus::Won } else { WagerStatus::Lost },
        payout: if won { stake * leg.win_odds } else { 0.0 },
        breakdown: format!(
            "WIN #{} {} @ {:.2}: {}",
            leg.competitor_number,
            leg.competitor_name,
            leg.win_odds,
            finish_text(position)
        ),
    }
}

pub fn settle_place(leg: &Leg, stake: f64, position: Option<usize>) -> SingleOutcome {
    let placed = is_placed(position, leg.places_paid);
    SingleOutcome {
        status: if placed { WagerStatus::Won } else { WagerStatus::Lost },
        payout: if placed { stake * leg.place_odds } else { 0.0 },
        breakdown: format!(
            "PLACE #{} {} @ {:.2}: {}, {} of {} paid",
            leg.competitor_number,
            leg.competitor_name,
            leg.place_odds,
            finish_text(position),
            leg.places_paid,
            leg.field_size
        ),
    }
}

/// Half the stake rides on the win, half on the place
pub fn settle_each_way(leg: &Leg, stake: f64, position: Option<usize>) -> SingleOutcome {
    let half = stake / 2.0;
    let win = settle_win(leg, half, position);
    let place = settle_place(leg, half, position);

    let hits = [&win, &place]
        .iter()
        .filter(|o| o.status == WagerStatus::Won)
        .count();
    let status = match hits {
        2 => WagerStatus::Won,
        1 => WagerStatus::SettledPartial,
        _ => WagerStatus::Lost,
    };

    SingleOutcome {
        status,
        payout: win.payout + place.payout,
        breakdown: format!(
            "EACH_WAY {:.2}+{:.2}: win {:.2} @ {:.2}, place {:.2} @ {:.2}; {}, {} of {} paid",
            half,
            half,
            win.payout,
            leg.win_odds,
            place.payout,
            leg.place_odds,
            finish_text(position),
            leg.places_paid,
            leg.field_size
        ),
    }
}

/// Apply one race to a multi; only the leg's win odds matter
pub fn settle_multi_leg(wager: &Wager, leg: &Leg, position: Option<usize>) -> MultiStep {
    if !is_winner(position) {
        return MultiStep::Lost {
            breakdown: format!(
                "MULTI leg {} #{} {}: {}",
                leg.race_id,
                leg.competitor_number,
                leg.competitor_name,
                finish_text(position)
            ),
        };
    }

    let running_return = wager.running_return * leg.win_odds;
    // The leg being settled is still Pending on the wager
    if wager.remaining_legs() <= 1 {
        let path = wager
            .legs
            .iter()
            .map(|l| format!("{:.2}", l.win_odds))
            .collect::<Vec<_>>()
            .join(" x ");
        MultiStep::Completed {
            payout: running_return,
            breakdown: format!(
                "MULTI x{} all won: {:.2} x {} = {:.2}",
                wager.legs.len(),
                wager.stake,
                path,
                running_return
            ),
        }
    } else {
        MultiStep::Advanced { running_return }
    }
}

impl BettingLedger {
    /// Settle every pending wager waiting on this race
    ///
    /// A race settles at most once; repeat calls return nothing.
    pub fn settle_race(&mut self, result: &RaceResult) -> Vec<SettlementRecord> {
        let race_id = result.race_id.as_str();
        if self.settled_races.contains(race_id) {
            debug!("Race {} already settled", race_id);
            return Vec::new();
        }
        if result.status != RaceStatus::Finished {
            warn!(
                "Race {} result is {}, not settling",
                race_id, result.status
            );
            return Vec::new();
        }

        self.settled_races.insert(race_id.to_string());
        let mut ids = self.race_index.remove(race_id).unwrap_or_default();
        ids.sort();

        let mut records = Vec::new();
        for id in ids {
            if let Some(record) = self.settle_wager(id, result) {
                records.push(record);
            }
        }

        info!(
            "Settled race {}: {} records, winner {}",
            race_id,
            records.len(),
            result.winner().unwrap_or("-")
        );
        records
    }

    /// Settle results in ascending race id order, independent of the order
    /// they were collected in
    pub fn settle_many(&mut self, results: &[RaceResult]) -> Vec<SettlementRecord> {
        let mut ordered: Vec<&RaceResult> = results.iter().collect();
        ordered.sort_by(|a, b| a.race_id.cmp(&b.race_id));
        ordered
            .into_iter()
            .flat_map(|r| self.settle_race(r))
            .collect()
    }

    fn settle_wager(&mut self, id: WagerId, result: &RaceResult) -> Option<SettlementRecord> {
        let race_id = result.race_id.as_str();
        let wager = match self.wagers.get(&id) {
            Some(w) if w.is_pending() => w,
            Some(w) => {
                warn!("Skipping {} on race {}: already {}", id, race_id, w.status);
                return None;
            }
            None => {
                warn!("Skipping unknown wager {} indexed on race {}", id, race_id);
                return None;
            }
        };
        let leg = match wager.leg_for_race(race_id) {
            Some(leg) if leg.outcome == LegOutcome::Pending => leg,
            _ => {
                warn!("Skipping {}: no open leg on race {}", id, race_id);
                return None;
            }
        };
        let position = result.position_of(&leg.competitor_id);

        match wager.kind {
            WagerKind::Win | WagerKind::Place | WagerKind::EachWay => {
                let outcome = match wager.kind {
                    WagerKind::Win => settle_win(leg, wager.stake, position),
                    WagerKind::Place => settle_place(leg, wager.stake, position),
                    _ => settle_each_way(leg, wager.stake, position),
                };
                let leg_won = outcome.status != WagerStatus::Lost;
                self.mark_leg(id, race_id, position, leg_won);
                Some(self.close(id, outcome.status, outcome.payout, outcome.breakdown))
            }
            WagerKind::Multi => match settle_multi_leg(wager, leg, position) {
                MultiStep::Lost { breakdown } => {
                    let others: Vec<String> = wager
                        .race_ids()
                        .filter(|r| *r != race_id)
                        .map(str::to_string)
                        .collect();
                    self.mark_leg(id, race_id, position, false);
                    for other in &others {
                        self.unindex(other, id);
                    }
                    Some(self.close(id, WagerStatus::Lost, 0.0, breakdown))
                }
                MultiStep::Advanced { running_return } => {
                    self.mark_leg(id, race_id, position, true);
                    if let Some(w) = self.wagers.get_mut(&id) {
                        w.running_return = running_return;
                        debug!(
                            "{} leg {} won, running return {:.2}, {} legs left",
                            id,
                            race_id,
                            running_return,
                            w.remaining_legs()
                        );
                    }
                    None
                }
                MultiStep::Completed { payout, breakdown } => {
                    self.mark_leg(id, race_id, position, true);
                    if let Some(w) = self.wagers.get_mut(&id) {
                        w.running_return = payout;
                    }
                    Some(self.close(id, WagerStatus::Won, payout, breakdown))
                }
            },
        }
    }

    fn mark_leg(&mut self, id: WagerId, race_id: &str, position: Option<usize>, won: bool) {
        if let Some(leg) = self
            .wagers
            .get_mut(&id)
            .and_then(|w| w.leg_for_race_mut(race_id))
        {
            leg.position = position;
            leg.outcome = if won { LegOutcome::Won } else { LegOutcome::Lost };
        }
    }

    /// Unlock the stake, credit the rounded payout, and record the outcome
    fn close(
        &mut self,
        id: WagerId,
        status: WagerStatus,
        payout: f64,
        breakdown: String,
    ) -> SettlementRecord {
        let payout = round2(payout);
        let (stake, kind, odds) = match self.wagers.get_mut(&id) {
            Some(w) => {
                w.status = status;
                (w.stake, w.kind, combined_odds(w))
            }
            None => (0.0, WagerKind::Win, 0.0),
        };

        let profit_loss = self.bankroll.settle(stake, payout);

        let record = SettlementRecord {
            wager_id: id,
            kind,
            stake,
            odds,
            status,
            payout,
            profit_loss,
            breakdown,
            settled_at: Utc::now(),
        };
        info!(
            "Settled {} {} {}: payout {:.2}, P/L {:.2}",
            id, kind, status, record.payout, record.profit_loss
        );
        self.settlements.push(record.clone());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ledger::book::LegSelection;
    use crate::ledger::wager::BetType;
    use crate::models::{Category, Competitor, Odds, Quote, RaceSpec};

    fn quote(race_id: &str, category: Category, odds: &[f64]) -> Quote {
        RaceSpec {
            race_id: race_id.to_string(),
            meeting: "Moonee Valley".to_string(),
            race_number: 1,
            category,
            advertised_start_ms: 0,
            weather: None,
            track: None,
            competitors: odds
                .iter()
                .enumerate()
                .map(|(i, o)| {
                    let n = i as u32 + 1;
                    Competitor::new(format!("c{}", n), format!("Runner {}", n), n, Odds::Priced(*o))
                })
                .collect(),
        }
        .quote()
    }

    fn result(race_id: &str, placings: &[&str]) -> RaceResult {
        RaceResult {
            race_id: race_id.to_string(),
            placings: placings.iter().map(|s| s.to_string()).collect(),
            finish_times_ms: Vec::new(),
            status: RaceStatus::Finished,
            seed: 1,
            started_at_ms: 0,
        }
    }

    fn ledger(balance: f64) -> BettingLedger {
        BettingLedger::with_balance(&EngineConfig::default(), balance)
    }

    #[test]
    fn test_win_scenario() {
        let mut book = ledger(1_000.0);
        let q = quote("R1", Category::horse(), &[3.5, 4.0, 6.0]);
        let wager = book.place_single(&q, "c1", 500.0, BetType::Win).unwrap();

        let records = book.settle_race(&result("R1", &["c1", "c2", "c3"]));
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.wager_id, wager.id);
        assert_eq!(r.status, WagerStatus::Won);
        assert!((r.payout - 1_750.0).abs() < 1e-9);
        assert!((r.profit_loss - 1_250.0).abs() < 1e-9);

        let bank = book.bankroll();
        assert!((bank.available - 2_250.0).abs() < 1e-9);
        assert_eq!(bank.locked, 0.0);
        assert!((bank.settled_pnl - 1_250.0).abs() < 1e-9);
    }

    #[test]
    fn test_place_scenario() {
        let odds = [9.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let q = quote("R1", Category::horse(), &odds);

        let mut book = ledger(1_000.0);
        let wager = book.place_single(&q, "c1", 300.0, BetType::Place).unwrap();
        assert!((wager.legs[0].place_odds - 3.0).abs() < 1e-12);
        assert_eq!(wager.legs[0].places_paid, 3);

        let third = book.settle_race(&result("R1", &["c2", "c3", "c1", "c4"]));
        assert_eq!(third[0].status, WagerStatus::Won);
        assert!((third[0].payout - 900.0).abs() < 1e-9);

        let mut book = ledger(1_000.0);
        book.place_single(&q, "c1", 300.0, BetType::Place).unwrap();
        let fourth = book.settle_race(&result("R1", &["c2", "c3", "c4", "c1"]));
        assert_eq!(fourth[0].status, WagerStatus::Lost);
        assert_eq!(fourth[0].payout, 0.0);
        assert!((fourth[0].profit_loss + 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_each_way_partial() {
        // Six runners pay two places; factor 0.25 turns 5.0 into 2.0
        let q = quote("R1", Category::horse(), &[5.0, 2.0, 3.0, 4.0, 6.0, 7.0]);
        let mut book = ledger(1_000.0);
        let wager = book.place_single(&q, "c1", 200.0, BetType::EachWay).unwrap();
        assert!((wager.legs[0].place_odds - 2.0).abs() < 1e-12);
        assert_eq!(wager.legs[0].places_paid, 2);

        let records = book.settle_race(&result("R1", &["c2", "c1", "c3"]));
        let r = &records[0];
        assert_eq!(r.status, WagerStatus::SettledPartial);
        assert!((r.payout - 200.0).abs() < 1e-9);
        assert_eq!(r.profit_loss, 0.0);
        assert!(r.breakdown.contains("2nd"));
    }

    #[test]
    fn test_each_way_both_halves() {
        let q = quote("R1", Category::horse(), &[5.0, 2.0, 3.0, 4.0, 6.0, 7.0]);
        let mut book = ledger(1_000.0);
        book.place_single(&q, "c1", 200.0, BetType::EachWay).unwrap();

        let records = book.settle_race(&result("R1", &["c1", "c2"]));
        assert_eq!(records[0].status, WagerStatus::Won);
        // 100 x 5 + 100 x 2
        assert!((records[0].payout - 700.0).abs() < 1e-9);
    }

    #[test]
    fn test_multi_loss_propagation() {
        let q1 = quote("R1", Category::horse(), &[2.0, 3.0]);
        let q2 = quote("R2", Category::horse(), &[2.5, 3.0]);
        let q3 = quote("R3", Category::horse(), &[4.0, 3.0]);

        let mut book = ledger(100.0);
        let wager = book
            .place_multi(
                &[
                    LegSelection::new(&q1, "c1"),
                    LegSelection::new(&q2, "c1"),
                    LegSelection::new(&q3, "c1"),
                ],
                10.0,
            )
            .unwrap();

        assert!(book.settle_race(&result("R1", &["c1", "c2"])).is_empty());
        let open = book.wager(wager.id).unwrap();
        assert_eq!(open.status, WagerStatus::Pending);
        assert!((open.running_return - 20.0).abs() < 1e-9);
        assert_eq!(open.remaining_legs(), 2);

        let records = book.settle_race(&result("R2", &["c2", "c1"]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, WagerStatus::Lost);
        assert_eq!(records[0].payout, 0.0);
        assert!((records[0].profit_loss + 10.0).abs() < 1e-9);

        // Leg three no longer references the dead wager
        assert!(book.race_index.get("R3").is_none());
        assert!(book.settle_race(&result("R3", &["c1", "c2"])).is_empty());

        let bank = book.bankroll();
        assert!((bank.available - 90.0).abs() < 1e-9);
        assert_eq!(bank.locked, 0.0);
    }

    #[test]
    fn test_multi_completes_in_any_race_order() {
        let q1 = quote("R1", Category::horse(), &[2.0, 3.0]);
        let q2 = quote("R2", Category::greyhound(), &[3.0, 3.0]);

        let mut book = ledger(100.0);
        book.place_multi(
            &[LegSelection::new(&q1, "c1"), LegSelection::new(&q2, "c1")],
            10.0,
        )
        .unwrap();

        // Second leg's race finishes first
        assert!(book.settle_race(&result("R2", &["c1"])).is_empty());
        let records = book.settle_race(&result("R1", &["c1"]));
        assert_eq!(records[0].status, WagerStatus::Won);
        assert!((records[0].payout - 60.0).abs() < 1e-9);
        assert!((records[0].profit_loss - 50.0).abs() < 1e-9);
        assert!((records[0].odds - 6.0).abs() < 1e-9);
        assert!((book.bankroll().available - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_settle_race_is_idempotent() {
        let q = quote("R1", Category::horse(), &[2.0, 3.0, 4.0]);
        let mut book = ledger(1_000.0);
        book.place_single(&q, "c1", 10.0, BetType::Win).unwrap();
        book.place_single(&q, "c2", 10.0, BetType::Place).unwrap();

        let res = result("R1", &["c1", "c2", "c3"]);
        assert_eq!(book.settle_race(&res).len(), 2);
        let bank = book.bankroll();
        assert!(book.settle_race(&res).is_empty());
        assert_eq!(book.bankroll(), bank);
        assert_eq!(book.settlements().len(), 2);

        // The market is closed once settled
        assert!(matches!(
            book.place_single(&q, "c1", 10.0, BetType::Win),
            Err(crate::error::LedgerError::RaceClosed(_))
        ));
    }

    #[test]
    fn test_prune_settled_races() {
        let q1 = quote("MEET1-R1", Category::horse(), &[2.0, 3.0]);
        let q2 = quote("MEET2-R1", Category::horse(), &[2.0, 3.0]);
        let mut book = ledger(100.0);
        book.place_single(&q1, "c1", 10.0, BetType::Win).unwrap();
        book.place_single(&q2, "c1", 10.0, BetType::Win).unwrap();
        book.settle_many(&[result("MEET1-R1", &["c1"]), result("MEET2-R1", &["c2"])]);
        let bank = book.bankroll();

        let pruned = book.prune_settled_races(|race_id| !race_id.starts_with("MEET1-"));
        assert_eq!(pruned, 1);
        assert!(!book.is_settled("MEET1-R1"));
        assert!(book.is_settled("MEET2-R1"));

        // Replaying the pruned result finds nothing left to settle
        assert!(book.settle_race(&result("MEET1-R1", &["c1"])).is_empty());
        assert_eq!(book.bankroll(), bank);
        assert_eq!(book.settlements().len(), 2);
    }

    #[test]
    fn test_unknown_selection_loses() {
        let q = quote("R1", Category::horse(), &[2.0, 3.0]);
        let mut book = ledger(100.0);
        book.place_single(&q, "c2", 10.0, BetType::Place).unwrap();

        let records = book.settle_race(&result("R1", &["c1"]));
        assert_eq!(records[0].status, WagerStatus::Lost);
        assert!(records[0].breakdown.contains("did not finish"));
    }

    #[test]
    fn test_rounding_half_up() {
        let q = quote("R1", Category::horse(), &[1.05, 3.0]);
        let mut book = ledger(100.0);
        book.place_single(&q, "c1", 10.01, BetType::Win).unwrap();

        // 10.01 x 1.05 = 10.5105
        let records = book.settle_race(&result("R1", &["c1"]));
        assert!((records[0].payout - 10.51).abs() < 1e-9);
        assert!((records[0].profit_loss - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_settled_pnl_matches_records() {
        let q = quote("R1", Category::horse(), &[2.0, 3.0]);
        let mut book = ledger(100.0);
        for _ in 0..3 {
            book.place_single(&q, "c2", 1.005, BetType::Win).unwrap();
        }

        let records = book.settle_race(&result("R1", &["c1", "c2"]));
        let pnl: f64 = records.iter().map(|r| r.profit_loss).sum();
        assert!((pnl + 3.03).abs() < 1e-9);
        assert!((book.bankroll().settled_pnl - pnl).abs() < 1e-9);
    }

    #[test]
    fn test_settle_many_orders_by_race_id() {
        let q1 = quote("R1", Category::horse(), &[2.0, 3.0]);
        let q2 = quote("R2", Category::horse(), &[2.0, 3.0]);

        let mut book = ledger(100.0);
        let single = book.place_single(&q2, "c1", 5.0, BetType::Win).unwrap();
        let multi = book
            .place_multi(
                &[LegSelection::new(&q1, "c1"), LegSelection::new(&q2, "c1")],
                10.0,
            )
            .unwrap();

        let records = book.settle_many(&[result("R2", &["c1"]), result("R1", &["c1"])]);
        let ids: Vec<WagerId> = records.iter().map(|r| r.wager_id).collect();
        assert_eq!(ids, vec![single.id, multi.id]);
        assert!(records.iter().all(|r| r.status == WagerStatus::Won));
    }

    #[test]
    fn test_ledger_conservation() {
        let start = 1_000.0;
        let q1 = quote("R1", Category::horse(), &[2.0, 3.0, 4.0, 5.0, 6.0]);
        let q2 = quote("R2", Category::greyhound(), &[2.2, 3.3, 4.4, 5.5, 6.6]);

        let mut book = ledger(start);
        book.place_single(&q1, "c1", 100.0, BetType::Win).unwrap();
        book.place_single(&q1, "c3", 50.0, BetType::EachWay).unwrap();
        let void = book.place_single(&q2, "c2", 25.0, BetType::Place).unwrap();
        book.place_multi(
            &[LegSelection::new(&q1, "c2"), LegSelection::new(&q2, "c1")],
            20.0,
        )
        .unwrap();
        assert!(book.cancel(void.id, 0, 1));

        let mut turnover = book.bankroll().turnover;
        let mut records = book.settle_race(&result("R1", &["c2", "c3", "c1"]));
        records.extend(book.settle_race(&result("R2", &["c1", "c2"])));

        let bank = book.bankroll();
        assert!(bank.turnover >= turnover);
        turnover = bank.turnover;
        assert!((turnover - 195.0).abs() < 1e-9);
        assert_eq!(bank.locked, 0.0);
        assert!(book.open_wagers().is_empty());

        let pnl: f64 = records.iter().map(|r| r.profit_loss).sum();
        assert!((bank.settled_pnl - pnl).abs() < 1e-9);
        assert!((bank.total() - (start + pnl)).abs() < 1e-9);
    }
}
