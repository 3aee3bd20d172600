//! Performance metrics over settlement history
//!
//! ROI, hit rate, drawdown and per-dimension breakdowns. Voided wagers are
//! counted but excluded from turnover and hit rate.

use super::settlement::SettlementRecord;
use super::wager::{WagerKind, WagerStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerMetrics {
    // Counts
    pub settled: usize,
    pub wins: usize,
    pub partials: usize,
    pub losses: usize,
    pub voids: usize,
    pub hit_rate: f64,

    // Money
    pub turnover: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub net_profit: f64,
    pub roi: f64,
    pub avg_odds: f64,

    // Risk
    pub profit_factor: f64,
    pub max_drawdown: f64,
}

fn is_hit(record: &SettlementRecord) -> bool {
    matches!(
        record.status,
        WagerStatus::Won | WagerStatus::SettledPartial
    )
}

/// Summarise settlement records in the order they were produced
pub fn calculate_metrics(records: &[SettlementRecord]) -> LedgerMetrics {
    if records.is_empty() {
        return LedgerMetrics::default();
    }

    let voids = records
        .iter()
        .filter(|r| r.status == WagerStatus::Void)
        .count();
    let live: Vec<&SettlementRecord> = records
        .iter()
        .filter(|r| r.status != WagerStatus::Void)
        .collect();

    let wins = live.iter().filter(|r| r.status == WagerStatus::Won).count();
    let partials = live
        .iter()
        .filter(|r| r.status == WagerStatus::SettledPartial)
        .count();
    let losses = live.iter().filter(|r| r.status == WagerStatus::Lost).count();
    let hit_rate = if live.is_empty() {
        0.0
    } else {
        (wins + partials) as f64 / live.len() as f64
    };

    let turnover: f64 = live.iter().map(|r| r.stake).sum();
    let gross_profit: f64 = live
        .iter()
        .map(|r| r.profit_loss)
        .filter(|p| *p > 0.0)
        .sum();
    let gross_loss: f64 = live
        .iter()
        .map(|r| r.profit_loss)
        .filter(|p| *p < 0.0)
        .map(f64::abs)
        .sum();
    let net_profit = gross_profit - gross_loss;

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    // Drawdown against the running peak of cumulative P/L
    let mut cumulative = 0.0;
    let mut peak = 0.0_f64;
    let mut max_drawdown = 0.0_f64;
    for r in &live {
        cumulative += r.profit_loss;
        peak = peak.max(cumulative);
        max_drawdown = max_drawdown.max(peak - cumulative);
    }

    let avg_odds = if live.is_empty() {
        0.0
    } else {
        live.iter().map(|r| r.odds).sum::<f64>() / live.len() as f64
    };

    LedgerMetrics {
        settled: records.len(),
        wins,
        partials,
        losses,
        voids,
        hit_rate,
        turnover,
        gross_profit,
        gross_loss,
        net_profit,
        roi: if turnover > 0.0 {
            net_profit / turnover
        } else {
            0.0
        },
        avg_odds,
        profit_factor,
        max_drawdown,
    }
}

/// Analysis results by dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionAnalysis {
    pub key: String,
    pub wagers: usize,
    pub hits: usize,
    pub hit_rate: f64,
    pub stake: f64,
    pub profit: f64,
    pub roi: f64,
}

fn summarise<K: ToString>(grouped: HashMap<K, Vec<&SettlementRecord>>) -> Vec<DimensionAnalysis> {
    let mut results: Vec<DimensionAnalysis> = grouped
        .into_iter()
        .map(|(key, group)| {
            let total = group.len();
            let hits = group.iter().filter(|r| is_hit(r)).count();
            let stake: f64 = group.iter().map(|r| r.stake).sum();
            let profit: f64 = group.iter().map(|r| r.profit_loss).sum();

            DimensionAnalysis {
                key: key.to_string(),
                wagers: total,
                hits,
                hit_rate: if total > 0 {
                    hits as f64 / total as f64
                } else {
                    0.0
                },
                stake,
                profit,
                roi: if stake > 0.0 { profit / stake } else { 0.0 },
            }
        })
        .collect();

    results.sort_by(|a, b| a.key.cmp(&b.key));
    results
}

/// Break results down by wager kind
pub fn analyze_by_kind(records: &[SettlementRecord]) -> Vec<DimensionAnalysis> {
    let mut grouped: HashMap<WagerKind, Vec<&SettlementRecord>> = HashMap::new();
    for r in records.iter().filter(|r| r.status != WagerStatus::Void) {
        grouped.entry(r.kind).or_default().push(r);
    }
    summarise(grouped)
}

/// Break results down by price band
pub fn analyze_by_odds_range(records: &[SettlementRecord]) -> Vec<DimensionAnalysis> {
    let mut grouped: HashMap<&str, Vec<&SettlementRecord>> = HashMap::new();
    for r in records.iter().filter(|r| r.status != WagerStatus::Void) {
        let key = if r.odds < 3.0 {
            "short (<3)"
        } else if r.odds < 10.0 {
            "mid (3-10)"
        } else {
            "long (>=10)"
        };
        grouped.entry(key).or_default().push(r);
    }
    summarise(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::wager::WagerId;
    use chrono::Utc;

    fn record(id: u64, kind: WagerKind, odds: f64, status: WagerStatus, payout: f64) -> SettlementRecord {
        let stake = 100.0;
        SettlementRecord {
            wager_id: WagerId(id),
            kind,
            stake,
            odds,
            status,
            payout,
            profit_loss: payout - stake,
            breakdown: String::new(),
            settled_at: Utc::now(),
        }
    }

    fn sample() -> Vec<SettlementRecord> {
        vec![
            record(1, WagerKind::Win, 8.0, WagerStatus::Won, 800.0),
            record(2, WagerKind::Win, 15.0, WagerStatus::Lost, 0.0),
            record(3, WagerKind::EachWay, 5.0, WagerStatus::SettledPartial, 100.0),
            record(4, WagerKind::Place, 2.0, WagerStatus::Void, 100.0),
        ]
    }

    #[test]
    fn test_calculate_metrics() {
        let m = calculate_metrics(&sample());

        assert_eq!(m.settled, 4);
        assert_eq!(m.wins, 1);
        assert_eq!(m.partials, 1);
        assert_eq!(m.losses, 1);
        assert_eq!(m.voids, 1);
        assert!((m.hit_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((m.turnover - 300.0).abs() < 1e-9);
        assert!((m.gross_profit - 700.0).abs() < 1e-9);
        assert!((m.gross_loss - 100.0).abs() < 1e-9);
        assert!((m.net_profit - 600.0).abs() < 1e-9);
        assert!((m.roi - 2.0).abs() < 1e-9);
        assert!((m.profit_factor - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_metrics_empty() {
        let m = calculate_metrics(&[]);
        assert_eq!(m.settled, 0);
        assert_eq!(m.hit_rate, 0.0);
        assert_eq!(m.roi, 0.0);
    }

    #[test]
    fn test_max_drawdown() {
        let records = vec![
            record(1, WagerKind::Win, 10.0, WagerStatus::Won, 1_000.0),
            record(2, WagerKind::Win, 10.0, WagerStatus::Lost, 0.0),
            record(3, WagerKind::Win, 10.0, WagerStatus::Lost, 0.0),
        ];

        // Cumulative: 900, 800, 700
        let m = calculate_metrics(&records);
        assert!((m.max_drawdown - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_analyze_by_kind() {
        let analysis = analyze_by_kind(&sample());
        assert_eq!(analysis.len(), 2);

        let win = analysis.iter().find(|a| a.key == "WIN").unwrap();
        assert_eq!(win.wagers, 2);
        assert_eq!(win.hits, 1);
        assert!((win.profit - 600.0).abs() < 1e-9);

        assert!(analysis.iter().all(|a| a.key != "PLACE"));
    }

    #[test]
    fn test_analyze_by_odds_range() {
        let analysis = analyze_by_odds_range(&sample());
        assert_eq!(analysis.len(), 2);

        let mid = analysis.iter().find(|a| a.key == "mid (3-10)").unwrap();
        assert_eq!(mid.wagers, 2);
        let long = analysis.iter().find(|a| a.key == "long (>=10)").unwrap();
        assert_eq!(long.hits, 0);
    }
}
