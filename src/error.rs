use thiserror::Error;

/// Recoverable failures of the simulation command API.
///
/// Duplicate upgrades are deliberately absent: re-applying an upgrade is a
/// silent no-op, not an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("insufficient funds: need {needed:.4} coin, balance {balance:.4}")]
    InsufficientFunds { needed: f64, balance: f64 },

    /// Contract violation: the caller passed an id the fleet never issued.
    #[error("no miner with id {0}")]
    UnitNotFound(String),

    /// Contract violation: the id is not in the hardware/upgrade catalog.
    #[error("unknown catalog entry {0}")]
    UnknownCatalogEntry(String),

    #[error("no active hashrate to mine with")]
    NoHashrate,
}
