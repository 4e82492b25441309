use std::collections::VecDeque;

use rand::Rng;

/// The price never trades below this, whatever the walk does.
pub const PRICE_FLOOR: f64 = 1000.0;

const HISTORY_CAP: usize = 30;
const REGIME_CHANGE_CHANCE: f64 = 0.05;
const FLIP_WINDOW: f64 = 0.30;
const FLIP_CHANCE: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bull,
    Bear,
}

impl Trend {
    pub fn signum(self) -> f64 {
        match self {
            Trend::Bull => 1.0,
            Trend::Bear => -1.0,
        }
    }

    fn flipped(self) -> Self {
        match self {
            Trend::Bull => Trend::Bear,
            Trend::Bear => Trend::Bull,
        }
    }

    fn sample<R: Rng>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) { Trend::Bull } else { Trend::Bear }
    }
}

/// Bounded random-walk fiat price with a sticky directional bias, updated
/// once per simulated day.
#[derive(Debug)]
pub struct MarketState {
    price: f64,
    trend: Trend,
    last_delta: f64,
    history: VecDeque<f64>,
}

impl MarketState {
    pub fn new(initial_price: f64) -> Self {
        let price = initial_price.max(PRICE_FLOOR);
        let mut history = VecDeque::new();
        history.push_back(price);
        Self {
            price,
            trend: Trend::Bull,
            last_delta: 0.0,
            history,
        }
    }

    /// One daily step of the walk. With a small chance the regime changes
    /// outright; otherwise the trend occasionally flips through a coin toss
    /// biased to keep the old direction. The swing itself stays within ±2%.
    pub fn update<R: Rng>(&mut self, rng: &mut R) {
        let roll: f64 = rng.gen_range(0.0..1.0);
        if roll < REGIME_CHANGE_CHANCE {
            self.trend = Trend::sample(rng);
        } else if roll < FLIP_WINDOW && rng.gen_bool(FLIP_CHANCE) {
            self.trend = self.trend.flipped();
        }

        let swing: f64 = rng.gen_range(0.0..1.0);
        let change_percent = swing * 2.0 * self.trend.signum();
        let new_price = (self.price * (1.0 + change_percent / 100.0)).max(PRICE_FLOOR);
        self.last_delta = new_price - self.price;
        self.price = new_price;
        self.record_price();
    }

    fn record_price(&mut self) {
        self.history.push_back(self.price);
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }

    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn price_never_breaks_the_floor() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut market = MarketState::new(PRICE_FLOOR + 1.0);
        for _ in 0..10_000 {
            market.update(&mut rng);
            assert!(market.price().is_finite());
            assert!(market.price() >= PRICE_FLOOR);
        }
    }

    #[test]
    fn history_is_capped_and_ordered() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut market = MarketState::new(45_000.0);
        for _ in 0..200 {
            market.update(&mut rng);
        }
        assert_eq!(market.history().len(), HISTORY_CAP);
        assert_eq!(*market.history().back().unwrap(), market.price());
    }

    #[test]
    fn identical_seeds_walk_identically() {
        let mut a = MarketState::new(45_000.0);
        let mut b = MarketState::new(45_000.0);
        let mut rng_a = StdRng::seed_from_u64(1234);
        let mut rng_b = StdRng::seed_from_u64(1234);
        for _ in 0..500 {
            a.update(&mut rng_a);
            b.update(&mut rng_b);
            assert_eq!(a.price(), b.price());
            assert_eq!(a.trend(), b.trend());
        }
    }

    #[test]
    fn daily_swing_is_bounded() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut market = MarketState::new(45_000.0);
        for _ in 0..2_000 {
            let before = market.price();
            market.update(&mut rng);
            let ratio = market.price() / before;
            assert!((0.98..=1.02).contains(&ratio), "ratio {ratio}");
        }
    }
}
