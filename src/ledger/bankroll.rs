//! Bankroll accounting
//!
//! `available + locked` moves only through the primitives below:
//! placement locks, cancellation releases, settlement unlocks and credits.

use crate::core::round2;
use crate::error::{validate_funds, LedgerError};
use serde::{Deserialize, Serialize};

/// Residue below this is float noise from repeated lock/unlock
const DUST: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BankrollState {
    pub available: f64,
    /// Stake escrowed by pending wagers
    pub locked: f64,
    /// Cumulative settled profit/loss
    pub settled_pnl: f64,
    /// Cumulative stake placed; never decreases
    pub turnover: f64,
}

impl BankrollState {
    pub fn new(starting_balance: f64) -> Self {
        Self {
            available: starting_balance,
            locked: 0.0,
            settled_pnl: 0.0,
            turnover: 0.0,
        }
    }

    /// Funds owned by the account, escrow included
    pub fn total(&self) -> f64 {
        self.available + self.locked
    }

    /// Escrow a stake at placement
    pub fn lock(&mut self, stake: f64) -> Result<(), LedgerError> {
        validate_funds(stake, self.available)?;
        self.available -= stake;
        self.locked += stake;
        self.turnover += stake;
        Ok(())
    }

    /// Return an escrowed stake untouched (cancellation)
    pub fn release(&mut self, stake: f64) {
        self.unlock(stake);
        self.available += stake;
    }

    /// Close out an escrowed stake with a payout, returning the cent-rounded profit/loss
    pub fn settle(&mut self, stake: f64, payout: f64) -> f64 {
        let profit_loss = round2(payout - stake);
        self.unlock(stake);
        self.available += payout;
        self.settled_pnl += profit_loss;
        profit_loss
    }

    fn unlock(&mut self, stake: f64) {
        self.locked -= stake;
        if self.locked.abs() < DUST {
            self.locked = 0.0;
        }
    }
}

impl Default for BankrollState {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_moves_funds() {
        let mut b = BankrollState::new(1_000.0);
        b.lock(250.0).unwrap();
        assert!((b.available - 750.0).abs() < 1e-9);
        assert!((b.locked - 250.0).abs() < 1e-9);
        assert!((b.turnover - 250.0).abs() < 1e-9);
        assert!((b.total() - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_lock_insufficient_funds_no_mutation() {
        let mut b = BankrollState::new(100.0);
        let before = b;
        assert!(matches!(
            b.lock(100.01),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(b, before);
    }

    #[test]
    fn test_release_restores() {
        let mut b = BankrollState::new(100.0);
        b.lock(40.0).unwrap();
        b.release(40.0);
        assert!((b.available - 100.0).abs() < 1e-9);
        assert_eq!(b.locked, 0.0);
        // Turnover is not refunded
        assert!((b.turnover - 40.0).abs() < 1e-9);
        assert_eq!(b.settled_pnl, 0.0);
    }

    #[test]
    fn test_settle_credits_payout() {
        let mut b = BankrollState::new(1_000.0);
        b.lock(500.0).unwrap();
        b.settle(500.0, 1_750.0);
        assert!((b.available - 2_250.0).abs() < 1e-9);
        assert_eq!(b.locked, 0.0);
        assert!((b.settled_pnl - 1_250.0).abs() < 1e-9);

        b.lock(100.0).unwrap();
        b.settle(100.0, 0.0);
        assert!((b.settled_pnl - 1_150.0).abs() < 1e-9);
        assert!((b.total() - 2_150.0).abs() < 1e-9);
    }

    #[test]
    fn test_settled_pnl_tracks_rounded_profit() {
        let mut b = BankrollState::new(10.0);
        let mut total = 0.0;
        for _ in 0..3 {
            b.lock(1.005).unwrap();
            total += b.settle(1.005, 0.0);
        }
        assert!((total + 3.03).abs() < 1e-9);
        assert!((b.settled_pnl - total).abs() < 1e-9);
        assert_eq!(b.locked, 0.0);
    }

    #[test]
    fn test_locked_dust_cleared() {
        let mut b = BankrollState::new(1.0);
        b.lock(0.1).unwrap();
        b.lock(0.2).unwrap();
        b.release(0.1);
        b.release(0.2);
        assert_eq!(b.locked, 0.0);
    }
}
