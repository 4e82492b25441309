use std::collections::BTreeSet;

use nanoid::nanoid;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::catalog::{HardwareTemplate, UpgradeDefinition};

pub(crate) const ID_ALPHABET: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I',
    'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

// Units off the same production line don't all run at the same temperature.
const THERMAL_JITTER_SIGMA: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Active,
    Inactive,
}

/// One owned miner. Created on purchase, mutated only by upgrades or a
/// status toggle, never destroyed.
#[derive(Debug, Clone)]
pub struct MinerUnit {
    id: String,
    template_id: String,
    name: String,
    base_hashrate: f64,
    base_power: f64,
    base_thermals: f64,
    hashrate_bonus: f64,
    power_bonus: f64,
    thermal_bonus: f64,
    applied_upgrades: BTreeSet<String>,
    status: UnitStatus,
}

impl MinerUnit {
    fn commission<R: Rng>(template: &HardwareTemplate, rng: &mut R) -> Self {
        let jitter = Normal::new(0.0, THERMAL_JITTER_SIGMA).unwrap().sample(rng);
        Self {
            id: nanoid!(8, ID_ALPHABET),
            template_id: template.id.clone(),
            name: template.name.clone(),
            base_hashrate: template.hashrate,
            base_power: template.power,
            base_thermals: template.thermals + jitter,
            hashrate_bonus: 0.0,
            power_bonus: 0.0,
            thermal_bonus: 0.0,
            applied_upgrades: BTreeSet::new(),
            status: UnitStatus::Active,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == UnitStatus::Active
    }

    pub fn effective_hashrate(&self) -> f64 {
        (self.base_hashrate + self.hashrate_bonus).max(0.0)
    }

    pub fn effective_power(&self) -> f64 {
        (self.base_power + self.power_bonus).max(0.0)
    }

    pub fn effective_thermals(&self) -> f64 {
        self.base_thermals + self.thermal_bonus
    }

    pub fn has_upgrade(&self, upgrade_id: &str) -> bool {
        self.applied_upgrades.contains(upgrade_id)
    }

    pub fn upgrade_count(&self) -> usize {
        self.applied_upgrades.len()
    }

    /// Returns false when the upgrade was already on the unit; the stat
    /// deltas are applied exactly once per upgrade id.
    fn install(&mut self, upgrade: &UpgradeDefinition) -> bool {
        if !self.applied_upgrades.insert(upgrade.id.clone()) {
            return false;
        }
        self.hashrate_bonus += upgrade.effects.hashrate_delta;
        self.power_bonus += upgrade.effects.power_delta;
        self.thermal_bonus += upgrade.effects.thermal_delta;
        true
    }

    fn toggle(&mut self) -> UnitStatus {
        self.status = match self.status {
            UnitStatus::Active => UnitStatus::Inactive,
            UnitStatus::Inactive => UnitStatus::Active,
        };
        self.status
    }
}

/// Aggregate hashrate/power of the active part of the fleet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FleetProfile {
    /// TH/s.
    pub hashrate: f64,
    /// Watts.
    pub power: f64,
}

/// All owned units, in purchase order, keyed by unique id.
#[derive(Debug, Default)]
pub struct Fleet {
    units: Vec<MinerUnit>,
    book_value: f64,
}

impl Fleet {
    /// Creates a unit from a template. The ledger debit happens in the
    /// simulation context before this is called; together they form one
    /// atomic purchase.
    pub(crate) fn commission<R: Rng>(&mut self, template: &HardwareTemplate, rng: &mut R) -> String {
        let unit = MinerUnit::commission(template, rng);
        let id = unit.id.clone();
        self.book_value += template.price;
        self.units.push(unit);
        id
    }

    /// Applies the upgrade's stat deltas. The caller has already verified
    /// the unit exists and does not carry the upgrade.
    pub(crate) fn install(&mut self, unit_id: &str, upgrade: &UpgradeDefinition) -> bool {
        let Some(unit) = self.unit_mut(unit_id) else {
            return false;
        };
        if unit.install(upgrade) {
            self.book_value += upgrade.price;
            true
        } else {
            false
        }
    }

    pub(crate) fn toggle(&mut self, unit_id: &str) -> Option<UnitStatus> {
        self.unit_mut(unit_id).map(MinerUnit::toggle)
    }

    pub fn unit(&self, unit_id: &str) -> Option<&MinerUnit> {
        self.units.iter().find(|unit| unit.id == unit_id)
    }

    fn unit_mut(&mut self, unit_id: &str) -> Option<&mut MinerUnit> {
        self.units.iter_mut().find(|unit| unit.id == unit_id)
    }

    pub fn units(&self) -> &[MinerUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.units.iter().filter(|unit| unit.is_active()).count()
    }

    /// Capital sunk into hardware and upgrades, in the native asset unit.
    pub fn book_value(&self) -> f64 {
        self.book_value
    }

    /// Recomputed from scratch on every call so it can never be stale.
    pub fn aggregate(&self) -> FleetProfile {
        self.units
            .iter()
            .filter(|unit| unit.is_active())
            .fold(FleetProfile::default(), |acc, unit| FleetProfile {
                hashrate: acc.hashrate + unit.effective_hashrate(),
                power: acc.power + unit.effective_power(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, UpgradeEffects};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn template(hashrate: f64, power: f64) -> HardwareTemplate {
        HardwareTemplate {
            id: "test-rig".into(),
            name: "Test Rig".into(),
            price: 1.0,
            hashrate,
            power,
            thermals: 60.0,
        }
    }

    fn upgrade(id: &str, hashrate: f64, power: f64) -> UpgradeDefinition {
        UpgradeDefinition {
            id: id.into(),
            name: id.into(),
            price: 0.1,
            effects: UpgradeEffects {
                hashrate_delta: hashrate,
                power_delta: power,
                thermal_delta: 0.0,
            },
        }
    }

    #[test]
    fn aggregate_sums_active_units() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut fleet = Fleet::default();
        fleet.commission(&template(100.0, 1000.0), &mut rng);
        fleet.commission(&template(50.0, 400.0), &mut rng);
        let profile = fleet.aggregate();
        assert_eq!(profile.hashrate, 150.0);
        assert_eq!(profile.power, 1400.0);
    }

    #[test]
    fn toggling_removes_a_unit_from_the_aggregate_immediately() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut fleet = Fleet::default();
        let first = fleet.commission(&template(100.0, 1000.0), &mut rng);
        fleet.commission(&template(50.0, 400.0), &mut rng);

        assert_eq!(fleet.toggle(&first), Some(UnitStatus::Inactive));
        let profile = fleet.aggregate();
        assert_eq!(profile.hashrate, 50.0);
        assert_eq!(profile.power, 400.0);
        assert_eq!(fleet.active_count(), 1);

        assert_eq!(fleet.toggle(&first), Some(UnitStatus::Active));
        assert_eq!(fleet.aggregate().hashrate, 150.0);
    }

    #[test]
    fn upgrades_apply_once() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut fleet = Fleet::default();
        let id = fleet.commission(&template(100.0, 1000.0), &mut rng);
        let boost = upgrade("boost", 20.0, 150.0);

        assert!(fleet.install(&id, &boost));
        let once = fleet.unit(&id).unwrap().effective_hashrate();
        assert_eq!(once, 120.0);

        // Second install is a no-op: same stats, same book value.
        let book = fleet.book_value();
        assert!(!fleet.install(&id, &boost));
        assert_eq!(fleet.unit(&id).unwrap().effective_hashrate(), once);
        assert_eq!(fleet.book_value(), book);
    }

    #[test]
    fn effective_power_is_clamped_at_zero() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut fleet = Fleet::default();
        let id = fleet.commission(&template(10.0, 100.0), &mut rng);
        assert!(fleet.install(&id, &upgrade("deep-undervolt", 0.0, -500.0)));
        assert_eq!(fleet.unit(&id).unwrap().effective_power(), 0.0);
    }

    #[test]
    fn commissioned_units_get_unique_ids_and_jittered_thermals() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut fleet = Fleet::default();
        let catalog = Catalog::builtin();
        let template = catalog.hardware("asic-s1").unwrap();
        let a = fleet.commission(template, &mut rng);
        let b = fleet.commission(template, &mut rng);
        assert_ne!(a, b);
        let thermals_a = fleet.unit(&a).unwrap().effective_thermals();
        let thermals_b = fleet.unit(&b).unwrap().effective_thermals();
        assert!((thermals_a - template.thermals).abs() < 10.0);
        assert_ne!(thermals_a, thermals_b);
    }

    #[test]
    fn book_value_tracks_spend() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut fleet = Fleet::default();
        let id = fleet.commission(&template(10.0, 100.0), &mut rng);
        fleet.install(&id, &upgrade("boost", 5.0, 0.0));
        assert!((fleet.book_value() - 1.1).abs() < 1e-12);
    }
}
