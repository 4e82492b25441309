use crate::ledger::{self, Roi};

/// How the operation adapts when the block reward halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalvingPolicy {
    /// Replace rigs with denser hardware: more hashrate, cheaper to run.
    UpgradeHardware,
    /// Double down on the same hardware.
    ExpandFleet,
    /// Mothball part of the operation.
    ReduceOperations,
}

impl HalvingPolicy {
    pub const ALL: [HalvingPolicy; 3] = [
        HalvingPolicy::UpgradeHardware,
        HalvingPolicy::ExpandFleet,
        HalvingPolicy::ReduceOperations,
    ];

    pub fn label(self) -> &'static str {
        match self {
            HalvingPolicy::UpgradeHardware => "Upgrade hardware",
            HalvingPolicy::ExpandFleet => "Expand fleet",
            HalvingPolicy::ReduceOperations => "Reduce operations",
        }
    }
}

/// Profitability of the operation at one instant, using the same formulas
/// the daily ledger runs on. Computed once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfitSnapshot {
    /// TH/s.
    pub hashrate: f64,
    pub units: u32,
    /// Fiat per unit per day.
    pub cost_per_unit_fiat: f64,
    pub block_reward: f64,
    pub difficulty_level: u32,
    /// Fiat per coin at the time of the snapshot.
    pub price: f64,
    /// Coins per day.
    pub revenue_per_day: f64,
    /// Coins per day.
    pub cost_per_day: f64,
    /// Coins per day.
    pub profit_per_day: f64,
    pub roi: Roi,
}

impl ProfitSnapshot {
    pub fn compute(
        hashrate: f64,
        units: u32,
        cost_per_unit_fiat: f64,
        block_reward: f64,
        difficulty_level: u32,
        price: f64,
        investment: f64,
    ) -> Self {
        let revenue_per_day = ledger::daily_yield(hashrate, block_reward, difficulty_level);
        let cost_per_day = cost_per_unit_fiat * f64::from(units) / price;
        let profit_per_day = revenue_per_day - cost_per_day;
        Self {
            hashrate,
            units,
            cost_per_unit_fiat,
            block_reward,
            difficulty_level,
            price,
            revenue_per_day,
            cost_per_day,
            profit_per_day,
            roi: ledger::roi(investment, profit_per_day),
        }
    }
}

/// Deterministic transform of the pre-halving operation under a policy,
/// priced at the halved reward.
pub fn apply_policy(
    pre: &ProfitSnapshot,
    policy: HalvingPolicy,
    halved_reward: f64,
    investment: f64,
) -> ProfitSnapshot {
    let (hashrate, units, cost_per_unit_fiat) = match policy {
        HalvingPolicy::UpgradeHardware => (pre.hashrate * 1.5, pre.units, pre.cost_per_unit_fiat * 0.8),
        HalvingPolicy::ExpandFleet => (pre.hashrate * 2.0, pre.units * 2, pre.cost_per_unit_fiat),
        HalvingPolicy::ReduceOperations => (pre.hashrate * 0.8, pre.units, pre.cost_per_unit_fiat),
    };
    ProfitSnapshot::compute(
        hashrate,
        units,
        cost_per_unit_fiat,
        halved_reward,
        pre.difficulty_level,
        pre.price,
        investment,
    )
}

/// The comparison offered at a halving boundary: the frozen pre-halving
/// snapshot against the outcome of a chosen policy. Purely analytical —
/// choosing a policy never touches the live fleet.
#[derive(Debug, Clone)]
pub struct HalvingReview {
    pub halving_tick: u64,
    pub pre: ProfitSnapshot,
    investment: f64,
    chosen: Option<(HalvingPolicy, ProfitSnapshot)>,
}

impl HalvingReview {
    pub fn new(halving_tick: u64, pre: ProfitSnapshot, investment: f64) -> Self {
        Self {
            halving_tick,
            pre,
            investment,
            chosen: None,
        }
    }

    pub fn choose(&mut self, policy: HalvingPolicy) -> &ProfitSnapshot {
        let post = apply_policy(&self.pre, policy, self.pre.block_reward / 2.0, self.investment);
        &self.chosen.insert((policy, post)).1
    }

    pub fn chosen(&self) -> Option<(HalvingPolicy, &ProfitSnapshot)> {
        self.chosen.as_ref().map(|(policy, post)| (*policy, post))
    }
}
