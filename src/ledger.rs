use crate::error::SimError;

/// Hashrate divisor in the yield formula; 100 TH/s earns the base rate.
pub const HASHRATE_NORMALIZER: f64 = 100.0;
/// Coins per normalized hashrate unit per day at full reward, level 1.
pub const BASE_YIELD_RATE: f64 = 0.02;
/// Per-level multiplicative decay of daily yield.
pub const DIFFICULTY_DECAY: f64 = 0.85;
/// The electricity rate is quoted per kWh over a billing period this long,
/// spread evenly across its days.
pub const DAYS_PER_BILLING_PERIOD: f64 = 30.0;

/// The owner's balance in the native asset unit. Fiat exists only as a
/// display conversion at the current market price; keeping the balance in
/// one unit avoids compounding rounding through the conversion.
///
/// Invariant: the balance is never negative.
#[derive(Debug)]
pub struct Ledger {
    balance: f64,
}

impl Ledger {
    pub fn new(opening_balance: f64) -> Self {
        Self {
            balance: opening_balance.max(0.0),
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn credit(&mut self, amount: f64) {
        self.balance += amount.max(0.0);
    }

    /// Exact withdrawal for purchases: all or nothing.
    pub fn debit(&mut self, amount: f64) -> Result<(), SimError> {
        if self.balance + 1e-6 >= amount {
            self.balance = (self.balance - amount).max(0.0);
            Ok(())
        } else {
            Err(SimError::InsufficientFunds {
                needed: amount,
                balance: self.balance,
            })
        }
    }

    /// Clamped withdrawal for running costs: whatever the balance cannot
    /// cover is absorbed, never carried as debt. Returns what was paid.
    pub fn absorb(&mut self, amount: f64) -> f64 {
        let paid = amount.max(0.0).min(self.balance);
        self.balance -= paid;
        paid
    }
}

/// Coins earned per day by `hashrate` TH/s at the given reward and level.
pub fn daily_yield(hashrate: f64, block_reward: f64, difficulty_level: u32) -> f64 {
    (hashrate / HASHRATE_NORMALIZER) * BASE_YIELD_RATE * block_reward * decay_factor(difficulty_level)
}

pub fn decay_factor(difficulty_level: u32) -> f64 {
    DIFFICULTY_DECAY.powi(difficulty_level.saturating_sub(1) as i32)
}

/// Fiat cost of running `power_watts` for one day.
pub fn daily_cost_fiat(power_watts: f64, electricity_rate: f64) -> f64 {
    (power_watts / 1000.0) * 24.0 * electricity_rate / DAYS_PER_BILLING_PERIOD
}

/// Days until an investment is recouped. `Unbounded` is a proper sentinel so
/// comparisons stay well-defined; no infinity arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Roi {
    Days(f64),
    Unbounded,
}

pub fn roi(investment: f64, daily_profit: f64) -> Roi {
    if daily_profit > 0.0 {
        Roi::Days(investment / daily_profit)
    } else {
        Roi::Unbounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_debit_leaves_the_balance_untouched() {
        let mut ledger = Ledger::new(0.4);
        let err = ledger.debit(0.55).unwrap_err();
        assert!(matches!(err, SimError::InsufficientFunds { .. }));
        assert_eq!(ledger.balance(), 0.4);
    }

    #[test]
    fn absorb_clamps_at_zero() {
        let mut ledger = Ledger::new(0.3);
        let paid = ledger.absorb(2.0);
        assert_eq!(paid, 0.3);
        assert_eq!(ledger.balance(), 0.0);
        // Further costs are fully absorbed.
        assert_eq!(ledger.absorb(1.0), 0.0);
        assert_eq!(ledger.balance(), 0.0);
    }

    #[test]
    fn credit_then_debit_round_trips() {
        let mut ledger = Ledger::new(0.0);
        ledger.credit(6.25);
        ledger.debit(1.1).unwrap();
        assert!((ledger.balance() - 5.15).abs() < 1e-9);
    }

    #[test]
    fn yield_decays_with_difficulty() {
        let at_level_1 = daily_yield(110.0, 6.25, 1);
        let at_level_2 = daily_yield(110.0, 6.25, 2);
        assert!(at_level_1 > 0.0);
        assert_eq!(at_level_2, at_level_1 * DIFFICULTY_DECAY);
    }

    #[test]
    fn yield_halves_with_the_reward() {
        let full = daily_yield(110.0, 6.25, 3);
        let halved = daily_yield(110.0, 3.125, 3);
        assert_eq!(halved, full / 2.0);
    }

    #[test]
    fn cost_formula() {
        // 3.25 kW for 24 h at 3.6 per kWh-billing-period, spread over 30 days.
        let fiat = daily_cost_fiat(3250.0, 3.6);
        assert!((fiat - 9.36).abs() < 1e-9);
    }

    #[test]
    fn roi_sentinel_for_unprofitable_operations() {
        assert_eq!(roi(10.0, 0.5), Roi::Days(20.0));
        assert_eq!(roi(10.0, 0.0), Roi::Unbounded);
        assert_eq!(roi(10.0, -3.0), Roi::Unbounded);
    }
}
