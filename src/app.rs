use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent};

use crate::sim::{SimEvent, SimulationContext};
use crate::strategy::HalvingPolicy;

const MAX_MESSAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFocus {
    Mining,
    Fleet,
    Strategy,
    Blocks,
}

impl PaneFocus {
    fn next(self) -> Self {
        match self {
            PaneFocus::Mining => PaneFocus::Fleet,
            PaneFocus::Fleet => PaneFocus::Strategy,
            PaneFocus::Strategy => PaneFocus::Blocks,
            PaneFocus::Blocks => PaneFocus::Mining,
        }
    }

    fn prev(self) -> Self {
        match self {
            PaneFocus::Mining => PaneFocus::Blocks,
            PaneFocus::Fleet => PaneFocus::Mining,
            PaneFocus::Strategy => PaneFocus::Fleet,
            PaneFocus::Blocks => PaneFocus::Strategy,
        }
    }
}

pub struct App {
    pub focus: PaneFocus,
    pub should_quit: bool,
    pub sim: SimulationContext,
    pub selected_hardware: usize,
    pub selected_unit: usize,
    pub block_scroll: usize,
    pub messages: VecDeque<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            focus: PaneFocus::Mining,
            should_quit: false,
            sim: SimulationContext::new(),
            selected_hardware: 0,
            selected_unit: 0,
            block_scroll: 0,
            messages: VecDeque::new(),
        }
    }

    pub fn on_day_tick(&mut self) {
        let events = self.sim.advance_day();
        self.report(events);
    }

    pub fn on_mine_step(&mut self) {
        let events = self.sim.step_mining();
        self.report(events);
    }

    fn report(&mut self, events: Vec<SimEvent>) {
        for event in events {
            let message = match event {
                SimEvent::DifficultyRaised(level) => {
                    format!("Network difficulty rose to level {}", level)
                }
                SimEvent::Halving { reward } => format!(
                    "Halving! Block reward cut to {:.4} ⛏ — answer it in the Strategy pane",
                    reward
                ),
                SimEvent::BlockFound {
                    header_id,
                    reward,
                    fiat_value,
                } => format!(
                    "Block {} found! +{:.4} ⛏ ({:.0}₵)",
                    header_id, reward, fiat_value
                ),
                SimEvent::Milestone(milestone) => {
                    format!("Milestone: {}", milestone.describe())
                }
            };
            self.push_message(message);
        }
    }

    fn push_message(&mut self, msg: impl Into<String>) {
        self.messages.push_front(msg.into());
        while self.messages.len() > MAX_MESSAGES {
            self.messages.pop_back();
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Char('q' | 'Q')) {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.next();
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
            }
            KeyCode::Char('p') => {
                if self.sim.clock().is_running() {
                    self.sim.stop_clock();
                    self.push_message("Clock paused");
                } else {
                    self.sim.start_clock();
                    self.push_message("Clock resumed");
                }
            }
            _ => match self.focus {
                PaneFocus::Mining => self.handle_mining_input(key),
                PaneFocus::Fleet => self.handle_fleet_input(key),
                PaneFocus::Strategy => self.handle_strategy_input(key),
                PaneFocus::Blocks => self.handle_blocks_input(key),
            },
        }
    }

    fn handle_mining_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => match self.sim.start_mining() {
                Ok(()) => {
                    let header = self.sim.discovery().header().id.clone();
                    self.push_message(format!("Mining started on header {}", header));
                }
                Err(err) => self.push_message(format!("Cannot mine: {}", err)),
            },
            KeyCode::Char('c') | KeyCode::Esc => {
                if self.sim.discovery().is_mining() {
                    self.sim.cancel_mining();
                    self.push_message("Mining cancelled");
                }
            }
            _ => {}
        }
    }

    fn handle_fleet_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left => {
                let count = self.sim.catalog().hardware.len();
                if count > 0 {
                    self.selected_hardware =
                        self.selected_hardware.checked_sub(1).unwrap_or(count - 1);
                }
            }
            KeyCode::Right => {
                let count = self.sim.catalog().hardware.len();
                if count > 0 {
                    self.selected_hardware = (self.selected_hardware + 1) % count;
                }
            }
            KeyCode::Up => {
                let count = self.sim.fleet().len();
                if count > 0 {
                    self.selected_unit = self.selected_unit.checked_sub(1).unwrap_or(count - 1);
                }
            }
            KeyCode::Down => {
                let count = self.sim.fleet().len();
                if count > 0 {
                    self.selected_unit = (self.selected_unit + 1) % count;
                }
            }
            KeyCode::Enter => self.purchase_selected(),
            KeyCode::Char('t') => self.toggle_selected(),
            KeyCode::Char('u') => self.upgrade_selected(),
            _ => {}
        }
    }

    fn purchase_selected(&mut self) {
        let Some(template) = self.sim.catalog().hardware.get(self.selected_hardware) else {
            return;
        };
        let template_id = template.id.clone();
        match self.sim.purchase_miner(&template_id) {
            Ok(receipt) => {
                self.push_message(format!(
                    "Purchased {} for {:.2} ⛏",
                    receipt.name, receipt.price
                ));
            }
            Err(err) => self.push_message(format!("Purchase failed: {}", err)),
        }
    }

    fn toggle_selected(&mut self) {
        let Some(unit) = self.sim.fleet().units().get(self.selected_unit) else {
            return;
        };
        let (unit_id, name) = (unit.id().to_string(), unit.name().to_string());
        match self.sim.toggle_miner(&unit_id) {
            Ok(status) => self.push_message(format!("{} is now {:?}", name, status)),
            Err(err) => self.push_message(format!("Toggle failed: {}", err)),
        }
    }

    // Installs the cheapest catalog upgrade the selected unit doesn't carry yet.
    fn upgrade_selected(&mut self) {
        let Some(unit) = self.sim.fleet().units().get(self.selected_unit) else {
            return;
        };
        let unit_id = unit.id().to_string();
        let mut candidates: Vec<_> = self
            .sim
            .catalog()
            .upgrades
            .iter()
            .filter(|upgrade| !unit.has_upgrade(&upgrade.id))
            .map(|upgrade| (upgrade.id.clone(), upgrade.name.clone(), upgrade.price))
            .collect();
        candidates.sort_by(|a, b| a.2.total_cmp(&b.2));
        let Some((upgrade_id, name, price)) = candidates.into_iter().next() else {
            self.push_message("No upgrades left for this unit");
            return;
        };
        match self.sim.apply_upgrade(&unit_id, &upgrade_id) {
            Ok(_) => self.push_message(format!("Installed {} for {:.2} ⛏", name, price)),
            Err(err) => self.push_message(format!("Upgrade failed: {}", err)),
        }
    }

    fn handle_strategy_input(&mut self, key: KeyEvent) {
        let policy = match key.code {
            KeyCode::Char('1') => HalvingPolicy::UpgradeHardware,
            KeyCode::Char('2') => HalvingPolicy::ExpandFleet,
            KeyCode::Char('3') => HalvingPolicy::ReduceOperations,
            _ => return,
        };
        match self.sim.select_halving_strategy(policy) {
            Some(post) => {
                let message = format!(
                    "{}: projected profit {:.4} ⛏/day",
                    policy.label(),
                    post.profit_per_day
                );
                self.push_message(message);
            }
            None => self.push_message("No halving to respond to yet"),
        }
    }

    fn handle_blocks_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => {
                if self.block_scroll > 0 {
                    self.block_scroll -= 1;
                }
            }
            KeyCode::Down => {
                if self.block_scroll + 1 < self.sim.blocks().len() {
                    self.block_scroll += 1;
                }
            }
            _ => {}
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_price_delta(delta: f64) -> String {
    if delta.abs() < 0.005 {
        "±0.00".to_string()
    } else if delta >= 0.0 {
        format!("+{:.2}", delta)
    } else {
        format!("{:.2}", delta)
    }
}

pub fn format_hashrate(terahashes: f64) -> String {
    const UNITS: [(&str, f64); 4] = [
        ("TH/s", 1.0),
        ("PH/s", 1_000.0),
        ("EH/s", 1_000_000.0),
        ("ZH/s", 1_000_000_000.0),
    ];
    let mut value = terahashes;
    let mut idx = 0usize;
    while value >= 1000.0 && idx + 1 < UNITS.len() {
        value /= 1000.0;
        idx += 1;
    }
    format!("{:.2} {}", value, UNITS[idx].0)
}

pub fn format_hashes(count: u64) -> String {
    const UNITS: [(&str, f64); 5] = [
        ("H", 1.0),
        ("kH", 1e3),
        ("MH", 1e6),
        ("GH", 1e9),
        ("TH", 1e12),
    ];
    let mut value = count as f64;
    let mut idx = 0usize;
    while value >= 1000.0 && idx + 1 < UNITS.len() {
        value /= 1000.0;
        idx += 1;
    }
    format!("{:.1} {}", value, UNITS[idx].0)
}

pub fn format_power(watts: f64) -> String {
    if watts >= 1000.0 {
        format!("{:.1} kW", watts / 1000.0)
    } else {
        format!("{:.0} W", watts)
    }
}
