use nanoid::nanoid;
use rand::Rng;

use crate::error::SimError;
use crate::fleet::ID_ALPHABET;

/// Cadence the caller is expected to drive `step` at while a session runs.
pub const STEP_INTERVAL_MS: u64 = 166;
const STEPS_PER_SECOND: f64 = 1000.0 / STEP_INTERVAL_MS as f64;
const HASHES_PER_TERAHASH: f64 = 1e12;
const NORMALIZATION: f64 = 250.0;
const SUCCESS_MULTIPLIER: f64 = 0.5;
const COOLDOWN_STEPS: u32 = 20;

/// Per-step chance of discovering a block at the given aggregate hashrate
/// and difficulty level. Also the deterministic progress increment, so a
/// session terminates within `1 / chance` steps even on a cold streak.
pub fn block_chance(total_hashrate: f64, difficulty_level: u32) -> f64 {
    total_hashrate / 16f64.powi(difficulty_level as i32) / NORMALIZATION
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Mining,
    /// Holds the found banner for a cooldown, then rolls back to Idle with
    /// a fresh header.
    Found { cooldown_left: u32 },
}

/// The header context a session searches against. Purely cosmetic — the id
/// gives each session and found block a stable name.
#[derive(Debug, Clone)]
pub struct BlockHeader {
    pub id: String,
}

fn next_header(difficulty_level: u32) -> BlockHeader {
    let body = nanoid!(6, ID_ALPHABET);
    let core = format!("B{:X}-{}", difficulty_level.min(15), body);
    let hash = blake3::hash(core.as_bytes());
    let nibble = (hash.as_bytes()[0] >> 4) as u32;
    let checksum = std::char::from_digit(nibble, 16)
        .unwrap_or('0')
        .to_ascii_uppercase();
    BlockHeader {
        id: format!("{}-{}", core, checksum),
    }
}

#[derive(Debug, Clone)]
pub struct BlockFound {
    pub header: BlockHeader,
    pub nonce: u64,
}

/// The proof-of-work search, reduced to a race between a deterministic
/// progress ramp and a memoryless per-step success draw. Whichever fires
/// first ends the session, so session lengths vary but stay bounded.
#[derive(Debug)]
pub struct DiscoveryProcess {
    phase: Phase,
    progress: f64,
    nonce: u64,
    header: BlockHeader,
}

impl DiscoveryProcess {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            progress: 0.0,
            nonce: 0,
            header: next_header(1),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_mining(&self) -> bool {
        self.phase == Phase::Mining
    }

    /// True while the session needs stepping (mining or cooling down).
    pub fn is_engaged(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Percent toward the deterministic completion bound, in [0, 100].
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn start(&mut self, total_hashrate: f64, difficulty_level: u32) -> Result<(), SimError> {
        if total_hashrate <= 0.0 {
            return Err(SimError::NoHashrate);
        }
        if self.phase == Phase::Idle {
            self.phase = Phase::Mining;
            self.progress = 0.0;
            self.nonce = 0;
            self.header = next_header(difficulty_level);
        }
        Ok(())
    }

    /// One sub-tick of the search. Returns the found block exactly once per
    /// session.
    pub fn step<R: Rng>(
        &mut self,
        rng: &mut R,
        total_hashrate: f64,
        difficulty_level: u32,
    ) -> Option<BlockFound> {
        match self.phase {
            Phase::Idle => None,
            Phase::Found { cooldown_left } => {
                if cooldown_left <= 1 {
                    self.phase = Phase::Idle;
                    self.progress = 0.0;
                    self.nonce = 0;
                    self.header = next_header(difficulty_level);
                } else {
                    self.phase = Phase::Found {
                        cooldown_left: cooldown_left - 1,
                    };
                }
                None
            }
            Phase::Mining => {
                self.nonce += (total_hashrate * HASHES_PER_TERAHASH / STEPS_PER_SECOND) as u64;
                let chance = block_chance(total_hashrate, difficulty_level);
                self.progress = (self.progress + chance * 100.0).min(100.0);
                let lucky = rng.gen_bool((chance * SUCCESS_MULTIPLIER).clamp(0.0, 1.0));
                if self.progress >= 100.0 || lucky {
                    self.phase = Phase::Found {
                        cooldown_left: COOLDOWN_STEPS,
                    };
                    self.progress = 100.0;
                    Some(BlockFound {
                        header: self.header.clone(),
                        nonce: self.nonce,
                    })
                } else {
                    None
                }
            }
        }
    }

    /// Abandons a running session. No ledger side effects: the accumulated
    /// nonce and progress are simply discarded.
    pub fn cancel(&mut self) {
        if self.phase == Phase::Mining {
            self.phase = Phase::Idle;
            self.progress = 0.0;
            self.nonce = 0;
        }
    }
}

impl Default for DiscoveryProcess {
    fn default() -> Self {
        Self::new()
    }
}
