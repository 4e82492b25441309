use serde::Deserialize;

const CATALOG_JSON: &str = include_str!("../data/catalog.json");

/// A purchasable miner model. Stats are the factory baseline; individual
/// units drift slightly at commissioning.
#[derive(Debug, Clone, Deserialize)]
pub struct HardwareTemplate {
    pub id: String,
    pub name: String,
    /// Price in the native asset unit.
    pub price: f64,
    /// TH/s.
    pub hashrate: f64,
    /// Watts at the wall.
    pub power: f64,
    /// Degrees Celsius under sustained load.
    pub thermals: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct UpgradeEffects {
    pub hashrate_delta: f64,
    pub power_delta: f64,
    pub thermal_delta: f64,
}

/// Immutable catalog entry; applied at most once per unit.
#[derive(Debug, Clone, Deserialize)]
pub struct UpgradeDefinition {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub effects: UpgradeEffects,
}

/// Static hardware/upgrade configuration, embedded at build time and parsed
/// once per simulation.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub hardware: Vec<HardwareTemplate>,
    pub upgrades: Vec<UpgradeDefinition>,
}

impl Catalog {
    pub fn builtin() -> Self {
        serde_json::from_str(CATALOG_JSON).expect("embedded catalog is valid JSON")
    }

    pub fn hardware(&self, id: &str) -> Option<&HardwareTemplate> {
        self.hardware.iter().find(|template| template.id == id)
    }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDefinition> {
        self.upgrades.iter().find(|upgrade| upgrade.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let catalog = Catalog::builtin();
        assert!(!catalog.hardware.is_empty());
        assert!(!catalog.upgrades.is_empty());
    }

    #[test]
    fn entries_are_unique_and_priced() {
        let catalog = Catalog::builtin();
        for template in &catalog.hardware {
            assert!(template.price > 0.0, "{} must have a price", template.id);
            assert!(template.hashrate > 0.0);
            assert_eq!(
                catalog
                    .hardware
                    .iter()
                    .filter(|other| other.id == template.id)
                    .count(),
                1,
                "duplicate hardware id {}",
                template.id
            );
        }
        for upgrade in &catalog.upgrades {
            assert!(upgrade.price > 0.0);
            assert_eq!(
                catalog
                    .upgrades
                    .iter()
                    .filter(|other| other.id == upgrade.id)
                    .count(),
                1,
                "duplicate upgrade id {}",
                upgrade.id
            );
        }
    }

    #[test]
    fn lookup_by_id() {
        let catalog = Catalog::builtin();
        assert!(catalog.hardware("gpu-rack").is_some());
        assert!(catalog.upgrade("oc-firmware").is_some());
        assert!(catalog.hardware("quantum-rig").is_none());
    }
}
