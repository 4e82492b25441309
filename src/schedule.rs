/// Halving and difficulty as pure projections of the day counter.
///
/// Nothing in here is mutated by the clock: both values are recomputed from
/// `tick` on every query, so the schedule can never drift out of sync with
/// the calendar.
#[derive(Debug, Clone)]
pub struct RewardSchedule {
    /// Block reward before the first halving.
    pub initial_reward: f64,
    /// Days between halvings.
    pub halving_period: u64,
    /// Days between difficulty steps.
    pub difficulty_period: u64,
    /// Difficulty never rises past this level.
    pub max_level: u32,
}

// 2^63 still divides exactly in f64; beyond that the reward is noise anyway.
const MAX_HALVINGS: u64 = 63;

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            initial_reward: 6.25,
            halving_period: 180,
            difficulty_period: 60,
            max_level: 8,
        }
    }
}

impl RewardSchedule {
    pub fn halvings(&self, tick: u64) -> u32 {
        (tick / self.halving_period).min(MAX_HALVINGS) as u32
    }

    pub fn block_reward(&self, tick: u64) -> f64 {
        self.initial_reward / 2f64.powi(self.halvings(tick) as i32)
    }

    pub fn difficulty_level(&self, tick: u64) -> u32 {
        (tick / self.difficulty_period)
            .saturating_add(1)
            .min(u64::from(self.max_level)) as u32
    }
}
