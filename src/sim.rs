use chrono::{Days, NaiveDate};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::catalog::Catalog;
use crate::discovery::DiscoveryProcess;
use crate::error::SimError;
use crate::fleet::{Fleet, UnitStatus};
use crate::ledger::{self, Ledger};
use crate::market::MarketState;
use crate::schedule::RewardSchedule;
use crate::strategy::{HalvingPolicy, HalvingReview, ProfitSnapshot};

/// Wall-clock cadence of one simulated day.
pub const DAY_TICK_MS: u32 = 750;

const OPENING_BALANCE: f64 = 1.0;
const INITIAL_PRICE: f64 = 45_000.0;
/// Fiat per kWh over one billing period, spread per day by the cost formula.
const ELECTRICITY_RATE: f64 = 3.6;

/// The simulated day counter. Externally driven: the context only advances
/// it from `advance_day`, and only while running.
#[derive(Debug)]
pub struct Clock {
    tick: u64,
    interval_ms: u32,
    running: bool,
}

impl Clock {
    fn new(interval_ms: u32) -> Self {
        Self {
            tick: 0,
            interval_ms,
            running: true,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn advance(&mut self) {
        self.tick += 1;
    }
}

/// Targets the surrounding experience unlocks content on. The engine only
/// reports them; what happens next is the caller's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    FirstRig,
    FirstBlock,
    FiveBlocks,
    FirstHalving,
}

impl Milestone {
    pub fn describe(self) -> &'static str {
        match self {
            Milestone::FirstRig => "first rig commissioned",
            Milestone::FirstBlock => "first block found",
            Milestone::FiveBlocks => "five blocks found",
            Milestone::FirstHalving => "survived a halving",
        }
    }
}

/// Notifications emitted by the tick pipeline, consumed fire-and-forget by
/// the caller. The engine never waits on their delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    DifficultyRaised(u32),
    Halving { reward: f64 },
    BlockFound { header_id: String, reward: f64, fiat_value: f64 },
    Milestone(Milestone),
}

/// Log entry for a found block.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    pub header_id: String,
    pub found_on: NaiveDate,
    pub reward: f64,
    pub fiat_value: f64,
    pub difficulty_level: u32,
    pub nonce: u64,
}

#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub unit_id: String,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Applied,
    /// The unit already carried the upgrade; nothing was charged or changed.
    AlreadyApplied,
}

/// The whole simulation, owned by the caller and mutated only through this
/// API. No globals, no timers: `advance_day` and `step_mining` are the two
/// entry points time comes in through.
#[derive(Debug)]
pub struct SimulationContext {
    clock: Clock,
    market: MarketState,
    schedule: RewardSchedule,
    fleet: Fleet,
    ledger: Ledger,
    discovery: DiscoveryProcess,
    catalog: Catalog,
    electricity_rate: f64,
    genesis: NaiveDate,
    blocks: Vec<BlockRecord>,
    halving_review: Option<HalvingReview>,
    milestones: Vec<Milestone>,
    rng: StdRng,
}

impl SimulationContext {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Fully deterministic variant for tests and batch runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            clock: Clock::new(DAY_TICK_MS),
            market: MarketState::new(INITIAL_PRICE),
            schedule: RewardSchedule::default(),
            fleet: Fleet::default(),
            ledger: Ledger::new(OPENING_BALANCE),
            discovery: DiscoveryProcess::new(),
            catalog: Catalog::builtin(),
            electricity_rate: ELECTRICITY_RATE,
            genesis: NaiveDate::from_ymd_opt(2009, 1, 3).expect("genesis date"),
            blocks: Vec::new(),
            halving_review: None,
            milestones: Vec::new(),
            rng,
        }
    }

    /// One simulated day: market walk, schedule boundaries, mining yield,
    /// electricity cost, milestone checks — in that fixed order. A stopped
    /// clock makes this a no-op.
    pub fn advance_day(&mut self) -> Vec<SimEvent> {
        if !self.clock.is_running() {
            return Vec::new();
        }
        let mut events = Vec::new();
        let prev = self.clock.tick();
        self.clock.advance();
        let tick = self.clock.tick();

        self.market.update(&mut self.rng);

        let level = self.schedule.difficulty_level(tick);
        if level > self.schedule.difficulty_level(prev) {
            events.push(SimEvent::DifficultyRaised(level));
        }
        let reward = self.schedule.block_reward(tick);
        if reward < self.schedule.block_reward(prev) {
            events.push(SimEvent::Halving { reward });
            self.open_halving_review(tick);
        }

        let profile = self.fleet.aggregate();
        self.ledger
            .credit(ledger::daily_yield(profile.hashrate, reward, level));
        let cost_fiat = ledger::daily_cost_fiat(profile.power, self.electricity_rate);
        self.ledger.absorb(cost_fiat / self.market.price());

        self.check_milestones(&mut events);
        events
    }

    /// One sub-tick of an engaged discovery session. Pays the block reward
    /// and logs the block when the session resolves.
    pub fn step_mining(&mut self) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if !self.discovery.is_engaged() {
            return events;
        }
        let tick = self.clock.tick();
        let profile = self.fleet.aggregate();
        let level = self.schedule.difficulty_level(tick);
        if let Some(found) = self.discovery.step(&mut self.rng, profile.hashrate, level) {
            let reward = self.schedule.block_reward(tick);
            self.ledger.credit(reward);
            let fiat_value = reward * self.market.price();
            self.blocks.insert(
                0,
                BlockRecord {
                    header_id: found.header.id.clone(),
                    found_on: self.current_date(),
                    reward,
                    fiat_value,
                    difficulty_level: level,
                    nonce: found.nonce,
                },
            );
            events.push(SimEvent::BlockFound {
                header_id: found.header.id,
                reward,
                fiat_value,
            });
            self.check_milestones(&mut events);
        }
        events
    }

    pub fn start_clock(&mut self) {
        self.clock.start();
    }

    pub fn stop_clock(&mut self) {
        self.clock.stop();
    }

    /// Debit and unit creation happen together or not at all.
    pub fn purchase_miner(&mut self, template_id: &str) -> Result<PurchaseReceipt, SimError> {
        let template = self
            .catalog
            .hardware(template_id)
            .ok_or_else(|| SimError::UnknownCatalogEntry(template_id.to_string()))?
            .clone();
        self.ledger.debit(template.price)?;
        let unit_id = self.fleet.commission(&template, &mut self.rng);
        Ok(PurchaseReceipt {
            unit_id,
            name: template.name,
            price: template.price,
        })
    }

    /// Idempotent per upgrade id: a duplicate application charges nothing
    /// and changes nothing.
    pub fn apply_upgrade(
        &mut self,
        unit_id: &str,
        upgrade_id: &str,
    ) -> Result<UpgradeOutcome, SimError> {
        let upgrade = self
            .catalog
            .upgrade(upgrade_id)
            .ok_or_else(|| SimError::UnknownCatalogEntry(upgrade_id.to_string()))?
            .clone();
        let unit = self
            .fleet
            .unit(unit_id)
            .ok_or_else(|| SimError::UnitNotFound(unit_id.to_string()))?;
        if unit.has_upgrade(&upgrade.id) {
            return Ok(UpgradeOutcome::AlreadyApplied);
        }
        self.ledger.debit(upgrade.price)?;
        self.fleet.install(unit_id, &upgrade);
        Ok(UpgradeOutcome::Applied)
    }

    pub fn toggle_miner(&mut self, unit_id: &str) -> Result<UnitStatus, SimError> {
        self.fleet
            .toggle(unit_id)
            .ok_or_else(|| SimError::UnitNotFound(unit_id.to_string()))
    }

    pub fn start_mining(&mut self) -> Result<(), SimError> {
        let profile = self.fleet.aggregate();
        let level = self.schedule.difficulty_level(self.clock.tick());
        self.discovery.start(profile.hashrate, level)
    }

    pub fn cancel_mining(&mut self) {
        self.discovery.cancel();
    }

    /// Answers the pending halving review, if one is open. The chosen
    /// policy's post-halving snapshot is returned for comparison.
    pub fn select_halving_strategy(&mut self, policy: HalvingPolicy) -> Option<&ProfitSnapshot> {
        self.halving_review
            .as_mut()
            .map(|review| review.choose(policy))
    }

    fn open_halving_review(&mut self, tick: u64) {
        let profile = self.fleet.aggregate();
        let units = self.fleet.active_count() as u32;
        let cost_per_unit_fiat = if units > 0 {
            ledger::daily_cost_fiat(profile.power, self.electricity_rate) / f64::from(units)
        } else {
            0.0
        };
        let investment = self.fleet.book_value();
        let pre = ProfitSnapshot::compute(
            profile.hashrate,
            units,
            cost_per_unit_fiat,
            self.schedule.block_reward(tick - 1),
            self.schedule.difficulty_level(tick),
            self.market.price(),
            investment,
        );
        self.halving_review = Some(HalvingReview::new(tick, pre, investment));
    }

    fn check_milestones(&mut self, events: &mut Vec<SimEvent>) {
        if !self.fleet.is_empty() {
            self.reach(Milestone::FirstRig, events);
        }
        if !self.blocks.is_empty() {
            self.reach(Milestone::FirstBlock, events);
        }
        if self.blocks.len() >= 5 {
            self.reach(Milestone::FiveBlocks, events);
        }
        if self.schedule.halvings(self.clock.tick()) >= 1 {
            self.reach(Milestone::FirstHalving, events);
        }
    }

    fn reach(&mut self, milestone: Milestone, events: &mut Vec<SimEvent>) {
        if !self.milestones.contains(&milestone) {
            self.milestones.push(milestone);
            events.push(SimEvent::Milestone(milestone));
        }
    }

    // -- read-only snapshot accessors --

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn market(&self) -> &MarketState {
        &self.market
    }

    pub fn schedule(&self) -> &RewardSchedule {
        &self.schedule
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn discovery(&self) -> &DiscoveryProcess {
        &self.discovery
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn blocks(&self) -> &[BlockRecord] {
        &self.blocks
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn halving_review(&self) -> Option<&HalvingReview> {
        self.halving_review.as_ref()
    }

    pub fn electricity_rate(&self) -> f64 {
        self.electricity_rate
    }

    /// Simulated calendar date for the current tick.
    pub fn current_date(&self) -> NaiveDate {
        self.genesis
            .checked_add_days(Days::new(self.clock.tick()))
            .unwrap_or(self.genesis)
    }
}

impl Default for SimulationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_succeeds_then_fails_atomically() {
        let mut sim = SimulationContext::with_seed(1);
        assert_eq!(sim.ledger().balance(), 1.0);

        let receipt = sim.purchase_miner("gpu-rack").unwrap();
        assert_eq!(receipt.price, 0.55);
        assert!((sim.ledger().balance() - 0.45).abs() < 1e-9);
        assert_eq!(sim.fleet().len(), 1);

        let err = sim.purchase_miner("gpu-rack").unwrap_err();
        assert!(matches!(err, SimError::InsufficientFunds { .. }));
        assert!((sim.ledger().balance() - 0.45).abs() < 1e-9);
        assert_eq!(sim.fleet().len(), 1);
    }

    #[test]
    fn unknown_template_is_a_contract_violation() {
        let mut sim = SimulationContext::with_seed(1);
        let err = sim.purchase_miner("quantum-rig").unwrap_err();
        assert!(matches!(err, SimError::UnknownCatalogEntry(_)));
        assert_eq!(sim.ledger().balance(), 1.0);
    }

    #[test]
    fn duplicate_upgrade_is_free_and_harmless() {
        let mut sim = SimulationContext::with_seed(2);
        let unit_id = sim.purchase_miner("gpu-rack").unwrap().unit_id;

        assert_eq!(
            sim.apply_upgrade(&unit_id, "fan-kit").unwrap(),
            UpgradeOutcome::Applied
        );
        let balance = sim.ledger().balance();
        let hashrate = sim.fleet().aggregate().hashrate;

        assert_eq!(
            sim.apply_upgrade(&unit_id, "fan-kit").unwrap(),
            UpgradeOutcome::AlreadyApplied
        );
        assert_eq!(sim.ledger().balance(), balance);
        assert_eq!(sim.fleet().aggregate().hashrate, hashrate);
    }

    #[test]
    fn upgrade_on_missing_unit_fails() {
        let mut sim = SimulationContext::with_seed(2);
        let err = sim.apply_upgrade("NOSUCH", "fan-kit").unwrap_err();
        assert_eq!(err, SimError::UnitNotFound("NOSUCH".into()));
    }

    #[test]
    fn mining_needs_hashrate() {
        let mut sim = SimulationContext::with_seed(3);
        assert_eq!(sim.start_mining(), Err(SimError::NoHashrate));
        assert!(!sim.discovery().is_engaged());

        sim.purchase_miner("gpu-rack").unwrap();
        let unit_id = sim.fleet().units()[0].id().to_string();
        sim.toggle_miner(&unit_id).unwrap();
        // A fleet of only inactive units has no hashrate either.
        assert_eq!(sim.start_mining(), Err(SimError::NoHashrate));
    }

    #[test]
    fn toggling_updates_the_aggregate_through_the_context() {
        let mut sim = SimulationContext::with_seed(4);
        sim.purchase_miner("gpu-rack").unwrap();
        sim.purchase_miner("cpu-rig").unwrap();
        let full = sim.fleet().aggregate();

        let unit_id = sim.fleet().units()[0].id().to_string();
        assert_eq!(sim.toggle_miner(&unit_id).unwrap(), UnitStatus::Inactive);
        let reduced = sim.fleet().aggregate();
        assert!(reduced.hashrate < full.hashrate);
        assert!(reduced.power < full.power);
    }

    #[test]
    fn stopped_clock_freezes_the_world() {
        let mut sim = SimulationContext::with_seed(5);
        sim.stop_clock();
        sim.stop_clock(); // idempotent
        let price = sim.market().price();
        assert!(sim.advance_day().is_empty());
        assert_eq!(sim.clock().tick(), 0);
        assert_eq!(sim.market().price(), price);

        sim.start_clock();
        sim.start_clock();
        sim.advance_day();
        assert_eq!(sim.clock().tick(), 1);
    }

    #[test]
    fn a_session_resolves_and_pays_the_reward() {
        let mut sim = SimulationContext::with_seed(6);
        sim.purchase_miner("gpu-rack").unwrap();
        sim.start_mining().unwrap();
        let before = sim.ledger().balance();

        let mut block_events = Vec::new();
        for _ in 0..500 {
            let events = sim.step_mining();
            let found = events
                .iter()
                .any(|event| matches!(event, SimEvent::BlockFound { .. }));
            block_events.extend(events);
            if found {
                break;
            }
        }
        assert!(
            block_events
                .iter()
                .any(|event| matches!(event, SimEvent::BlockFound { .. })),
            "session must resolve within the ramp bound"
        );
        assert!((sim.ledger().balance() - before - 6.25).abs() < 1e-9);
        assert_eq!(sim.blocks().len(), 1);
        assert!(
            block_events
                .iter()
                .any(|event| *event == SimEvent::Milestone(Milestone::FirstBlock))
        );
    }

    #[test]
    fn cancelling_mining_pays_nothing() {
        let mut sim = SimulationContext::with_seed(7);
        sim.purchase_miner("cpu-rig").unwrap();
        sim.start_mining().unwrap();
        // A few sub-ticks of a low-hashrate session won't resolve it.
        for _ in 0..3 {
            sim.step_mining();
        }
        let balance = sim.ledger().balance();
        sim.cancel_mining();
        assert_eq!(sim.ledger().balance(), balance);
        assert!(sim.blocks().is_empty());
        assert!(!sim.discovery().is_engaged());
    }

    #[test]
    fn halving_day_opens_a_review() {
        let mut sim = SimulationContext::with_seed(8);
        sim.purchase_miner("gpu-rack").unwrap();

        let halving_tick = sim.schedule().halving_period;
        let mut saw_halving = false;
        let mut saw_difficulty = false;
        for _ in 0..halving_tick {
            for event in sim.advance_day() {
                match event {
                    SimEvent::Halving { reward } => {
                        saw_halving = true;
                        assert_eq!(reward, 3.125);
                    }
                    SimEvent::DifficultyRaised(_) => saw_difficulty = true,
                    _ => {}
                }
            }
        }
        assert!(saw_halving);
        assert!(saw_difficulty);
        assert!(sim.milestones().contains(&Milestone::FirstHalving));

        let review = sim.halving_review().expect("review opens at the boundary");
        assert_eq!(review.pre.block_reward, 6.25);
        assert_eq!(review.halving_tick, halving_tick);

        let post = sim
            .select_halving_strategy(HalvingPolicy::UpgradeHardware)
            .unwrap();
        assert_eq!(post.block_reward, 3.125);
    }

    #[test]
    fn selecting_a_strategy_without_a_halving_is_a_no_op() {
        let mut sim = SimulationContext::with_seed(9);
        assert!(sim.select_halving_strategy(HalvingPolicy::ExpandFleet).is_none());
    }

    #[test]
    fn first_rig_milestone_fires_once() {
        let mut sim = SimulationContext::with_seed(10);
        sim.purchase_miner("cpu-rig").unwrap();
        let events = sim.advance_day();
        assert!(events.contains(&SimEvent::Milestone(Milestone::FirstRig)));
        let events = sim.advance_day();
        assert!(!events.contains(&SimEvent::Milestone(Milestone::FirstRig)));
    }

    #[test]
    fn same_seed_same_world() {
        let run = |seed: u64| {
            let mut sim = SimulationContext::with_seed(seed);
            sim.purchase_miner("gpu-rack").unwrap();
            for _ in 0..120 {
                sim.advance_day();
            }
            (sim.ledger().balance(), sim.market().price())
        };
        assert_eq!(run(31), run(31));
    }

    #[test]
    fn calendar_starts_at_genesis() {
        let mut sim = SimulationContext::with_seed(11);
        assert_eq!(
            sim.current_date(),
            NaiveDate::from_ymd_opt(2009, 1, 3).unwrap()
        );
        sim.advance_day();
        assert_eq!(
            sim.current_date(),
            NaiveDate::from_ymd_opt(2009, 1, 4).unwrap()
        );
    }
}
