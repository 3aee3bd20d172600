//! Market odds to win probabilities
//!
//! Implied probabilities (1 / odds) of a bookmaker's market sum to more than 1.
//! The excess (overround) is removed by rescaling the priced runners, and
//! unpriced runners are slotted just below the weakest priced runner.
//!
//! ```
//! use raceday::core::probability::normalize_probabilities;
//! use raceday::Odds;
//!
//! let probs = normalize_probabilities(&[Odds::Priced(2.0), Odds::Priced(4.0), Odds::Priced(4.0)]);
//! assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
//! ```

use crate::models::Odds;

/// Share of the weakest priced probability given to each unpriced runner
pub const UNPRICED_SHARE: f64 = 0.9;

/// Normalize a field's odds into a win-probability distribution summing to 1
pub fn normalize_probabilities(odds: &[Odds]) -> Vec<f64> {
    if odds.is_empty() {
        return Vec::new();
    }

    let implied: Vec<Option<f64>> = odds.iter().map(|o| o.priced().map(|v| 1.0 / v)).collect();
    let priced_total: f64 = implied.iter().flatten().sum();

    if priced_total <= 0.0 {
        let uniform = 1.0 / odds.len() as f64;
        return vec![uniform; odds.len()];
    }

    // Overround removal across priced runners
    let fair: Vec<Option<f64>> = implied
        .iter()
        .map(|p| p.map(|v| v / priced_total))
        .collect();

    let min_priced = fair
        .iter()
        .flatten()
        .cloned()
        .fold(f64::INFINITY, f64::min);
    let neutral = min_priced * UNPRICED_SHARE;

    let filled: Vec<f64> = fair.iter().map(|p| p.unwrap_or(neutral)).collect();
    let total: f64 = filled.iter().sum();

    filled.into_iter().map(|p| p / total).collect()
}

/// Sum of implied probabilities across priced runners, `None` when nothing is priced
pub fn implied_overround(odds: &[Odds]) -> Option<f64> {
    let implied: Vec<f64> = odds.iter().filter_map(|o| o.priced()).map(|v| 1.0 / v).collect();
    if implied.is_empty() {
        None
    } else {
        Some(implied.iter().sum())
    }
}

/// Min-max normalize probabilities into strengths in [0, 1]
///
/// A field where every runner is equally likely gets a flat 0.5.
pub fn strengths(probabilities: &[f64]) -> Vec<f64> {
    let min = probabilities.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = probabilities.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    probabilities
        .iter()
        .map(|&p| {
            if span <= f64::EPSILON {
                0.5
            } else {
                ((p - min) / span).clamp(0.0, 1.0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(v: &[f64]) -> f64 {
        v.iter().sum()
    }

    #[test]
    fn test_all_priced_sums_to_one() {
        let odds = [
            Odds::Priced(2.0),
            Odds::Priced(12.0),
            Odds::Priced(3.0),
            Odds::Priced(9.5),
            Odds::Priced(7.5),
            Odds::Priced(126.0),
        ];
        let probs = normalize_probabilities(&odds);
        assert_eq!(probs.len(), odds.len());
        assert!((sum(&probs) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_overround_removed_proportionally() {
        // 1/2 + 1/2 + 1/4 = 1.25 overround
        let probs =
            normalize_probabilities(&[Odds::Priced(2.0), Odds::Priced(2.0), Odds::Priced(4.0)]);
        assert!((probs[0] - 0.4).abs() < 1e-12);
        assert!((probs[1] - 0.4).abs() < 1e-12);
        assert!((probs[2] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_better_odds_never_lower_probability() {
        let odds = [
            Odds::Priced(5.0),
            Odds::StartingPrice,
            Odds::Priced(1.8),
            Odds::Priced(5.0),
            Odds::Priced(21.0),
        ];
        let probs = normalize_probabilities(&odds);
        assert!((sum(&probs) - 1.0).abs() < 1e-9);

        for i in 0..odds.len() {
            for j in 0..odds.len() {
                if let (Some(a), Some(b)) = (odds[i].priced(), odds[j].priced()) {
                    if a < b {
                        assert!(probs[i] >= probs[j]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_unpriced_gets_share_of_minimum() {
        let probs = normalize_probabilities(&[
            Odds::Priced(2.0),
            Odds::Priced(2.0),
            Odds::StartingPrice,
        ]);
        // Before renormalizing: 0.5, 0.5, 0.45
        let total = 1.45;
        assert!((probs[0] - 0.5 / total).abs() < 1e-12);
        assert!((probs[2] - 0.45 / total).abs() < 1e-12);
        assert!(probs[2] < probs[0]);
    }

    #[test]
    fn test_out_of_range_prices_treated_as_unpriced() {
        let probs =
            normalize_probabilities(&[Odds::Priced(0.0), Odds::Priced(2.0), Odds::Priced(4.0)]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((sum(&probs) - 1.0).abs() < 1e-9);
        // Fair 2/3 and 1/3, the zero price fills at 0.9 * 1/3
        assert!((probs[0] - 0.3 / 1.3).abs() < 1e-12);

        let probs = normalize_probabilities(&[Odds::Priced(1.0), Odds::Priced(2.0)]);
        assert!((probs[0] - 0.9 / 1.9).abs() < 1e-12);
        assert!((probs[1] - 1.0 / 1.9).abs() < 1e-12);

        assert!(implied_overround(&[Odds::Priced(0.5), Odds::Priced(1.0)]).is_none());
    }

    #[test]
    fn test_no_priced_is_uniform() {
        let probs = normalize_probabilities(&[Odds::StartingPrice; 4]);
        assert!(probs.iter().all(|p| (p - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_empty_field() {
        assert!(normalize_probabilities(&[]).is_empty());
        assert!(implied_overround(&[]).is_none());
    }

    #[test]
    fn test_implied_overround() {
        let over = implied_overround(&[
            Odds::Priced(2.0),
            Odds::Priced(2.0),
            Odds::Priced(4.0),
            Odds::StartingPrice,
        ])
        .unwrap();
        assert!((over - 1.25).abs() < 1e-12);
        assert!(implied_overround(&[Odds::StartingPrice]).is_none());
    }

    #[test]
    fn test_strengths() {
        let s = strengths(&[0.1, 0.5, 0.3]);
        assert!((s[0] - 0.0).abs() < 1e-12);
        assert!((s[1] - 1.0).abs() < 1e-12);
        assert!((s[2] - 0.5).abs() < 1e-12);

        let flat = strengths(&[0.25, 0.25]);
        assert!(flat.iter().all(|v| (v - 0.5).abs() < 1e-12));
    }
}
