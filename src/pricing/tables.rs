//! Static pricing configuration
//!
//! Pure data: per-tier room rates, multipliers, add-on and exclusive-service
//! price tables, frequency discounts and the automatic tier-upgrade rules.
//! Loaded once at startup and injected into the calculator; the tables
//! themselves carry no behavior beyond lookups.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::pricing::{CleanlinessLevel, ServiceConfiguration, ServiceTier};

/// One value per service tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRates {
    pub standard: Decimal,
    pub premium: Decimal,
    pub elite: Decimal,
}

impl TierRates {
    pub const fn new(standard: Decimal, premium: Decimal, elite: Decimal) -> Self {
        Self {
            standard,
            premium,
            elite,
        }
    }

    pub fn for_tier(&self, tier: ServiceTier) -> Decimal {
        match tier {
            ServiceTier::Standard => self.standard,
            ServiceTier::Premium => self.premium,
            ServiceTier::Elite => self.elite,
        }
    }
}

/// Price table entry for a strategic add-on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOnRate {
    pub label: String,
    pub rates: TierRates,
    /// Free at Elite: already bundled into that tier's service.
    #[serde(default)]
    pub included_in_elite: bool,
}

/// Price table entry for an Elite-only exclusive service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusiveRate {
    pub label: String,
    pub price: Decimal,
    /// Multiplied by the total selected room count; flat fee otherwise.
    #[serde(default)]
    pub per_room: bool,
}

/// Condition for an automatic tier upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpgradeTrigger {
    CleanlinessAtLeast { level: u8 },
    BiohazardFlag,
    MoldOrWaterDamage,
    PostRenovation,
    SquareFootageOver { threshold: u32 },
}

impl UpgradeTrigger {
    pub fn matches(&self, config: &ServiceConfiguration) -> bool {
        let property = config.property();
        match self {
            Self::CleanlinessAtLeast { level } => config.cleanliness_level.as_u8() >= *level,
            Self::BiohazardFlag => property.biohazard,
            Self::MoldOrWaterDamage => property.mold_or_water_damage,
            Self::PostRenovation => property.post_renovation,
            Self::SquareFootageOver { threshold } => {
                property.square_footage.is_some_and(|sqft| sqft > *threshold)
            }
        }
    }
}

/// An automatic upgrade rule: when the trigger matches, the booking runs at
/// `minimum_tier` or higher and `reason` is surfaced to the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeRule {
    pub trigger: UpgradeTrigger,
    pub minimum_tier: ServiceTier,
    pub reason: String,
    pub priority: u8,
}

/// The full pricing configuration, versionless and immutable at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTables {
    pub room_rates: BTreeMap<String, TierRates>,
    /// Applied on top of the already tier-specific room rates. Kept for
    /// behavioral parity with the published rate card even though the
    /// contribution overlaps the per-tier base rates.
    pub tier_multipliers: TierRates,
    /// Cleanliness level (1-4) -> per-tier multiplier.
    pub cleanliness_multipliers: BTreeMap<u8, TierRates>,
    pub add_ons: BTreeMap<String, AddOnRate>,
    pub exclusive_services: BTreeMap<String, ExclusiveRate>,
    /// Frequency id -> discount fraction (0.15 = 15% off recurring visits).
    pub frequency_discounts: BTreeMap<String, Decimal>,
    pub upgrade_rules: Vec<UpgradeRule>,
    /// Published per-tier job minimums. Informational; the calculator does
    /// not clamp quotes to them.
    pub minimum_job_values: TierRates,
}

impl PricingTables {
    pub fn cleanliness_multiplier(&self, level: CleanlinessLevel, tier: ServiceTier) -> Decimal {
        self.cleanliness_multipliers
            .get(&level.as_u8())
            .map(|rates| rates.for_tier(tier))
            .unwrap_or(Decimal::ONE)
    }

    pub fn frequency_discount(&self, frequency: &str) -> Decimal {
        self.frequency_discounts
            .get(frequency)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

impl Default for PricingTables {
    fn default() -> Self {
        let room_rates = BTreeMap::from([
            (
                "bedroom".to_string(),
                TierRates::new(dec!(50), dec!(70), dec!(95)),
            ),
            (
                "bathroom".to_string(),
                TierRates::new(dec!(60), dec!(85), dec!(115)),
            ),
            (
                "kitchen".to_string(),
                TierRates::new(dec!(80), dec!(110), dec!(150)),
            ),
            (
                "living_room".to_string(),
                TierRates::new(dec!(55), dec!(75), dec!(100)),
            ),
            (
                "dining_room".to_string(),
                TierRates::new(dec!(40), dec!(55), dec!(75)),
            ),
            (
                "office".to_string(),
                TierRates::new(dec!(45), dec!(65), dec!(90)),
            ),
            (
                "basement".to_string(),
                TierRates::new(dec!(70), dec!(95), dec!(130)),
            ),
            (
                "garage".to_string(),
                TierRates::new(dec!(50), dec!(70), dec!(95)),
            ),
            (
                "hallway".to_string(),
                TierRates::new(dec!(20), dec!(30), dec!(45)),
            ),
            (
                "laundry_room".to_string(),
                TierRates::new(dec!(35), dec!(50), dec!(70)),
            ),
        ]);

        let cleanliness_multipliers = BTreeMap::from([
            (1, TierRates::new(dec!(1.0), dec!(1.0), dec!(1.0))),
            (2, TierRates::new(dec!(1.2), dec!(1.15), dec!(1.1))),
            (3, TierRates::new(dec!(1.5), dec!(1.4), dec!(1.3))),
            (4, TierRates::new(dec!(2.5), dec!(2.5), dec!(2.5))),
        ]);

        let add_ons = BTreeMap::from([
            (
                "inside_fridge".to_string(),
                AddOnRate {
                    label: "Inside fridge".to_string(),
                    rates: TierRates::new(dec!(35), dec!(30), dec!(0)),
                    included_in_elite: true,
                },
            ),
            (
                "inside_oven".to_string(),
                AddOnRate {
                    label: "Inside oven".to_string(),
                    rates: TierRates::new(dec!(30), dec!(25), dec!(0)),
                    included_in_elite: true,
                },
            ),
            (
                "interior_windows".to_string(),
                AddOnRate {
                    label: "Interior windows (per window)".to_string(),
                    rates: TierRates::new(dec!(8), dec!(7), dec!(6)),
                    included_in_elite: false,
                },
            ),
            (
                "inside_cabinets".to_string(),
                AddOnRate {
                    label: "Inside cabinets".to_string(),
                    rates: TierRates::new(dec!(40), dec!(35), dec!(30)),
                    included_in_elite: false,
                },
            ),
            (
                "laundry_fold".to_string(),
                AddOnRate {
                    label: "Laundry wash & fold (per load)".to_string(),
                    rates: TierRates::new(dec!(20), dec!(18), dec!(15)),
                    included_in_elite: false,
                },
            ),
            (
                "garage_sweep".to_string(),
                AddOnRate {
                    label: "Garage sweep-out".to_string(),
                    rates: TierRates::new(dec!(45), dec!(40), dec!(35)),
                    included_in_elite: false,
                },
            ),
            (
                "baseboard_detail".to_string(),
                AddOnRate {
                    label: "Baseboard detailing".to_string(),
                    rates: TierRates::new(dec!(25), dec!(22), dec!(0)),
                    included_in_elite: true,
                },
            ),
        ]);

        let exclusive_services = BTreeMap::from([
            (
                "steam_sanitization".to_string(),
                ExclusiveRate {
                    label: "Steam sanitization".to_string(),
                    price: dec!(25),
                    per_room: true,
                },
            ),
            (
                "eco_deep_treatment".to_string(),
                ExclusiveRate {
                    label: "Eco deep treatment".to_string(),
                    price: dec!(18),
                    per_room: true,
                },
            ),
            (
                "air_purification".to_string(),
                ExclusiveRate {
                    label: "Whole-home air purification".to_string(),
                    price: dec!(80),
                    per_room: false,
                },
            ),
            (
                "white_glove_inspection".to_string(),
                ExclusiveRate {
                    label: "White-glove inspection".to_string(),
                    price: dec!(60),
                    per_room: false,
                },
            ),
        ]);

        let frequency_discounts = BTreeMap::from([
            ("one_time".to_string(), dec!(0)),
            ("monthly".to_string(), dec!(0.05)),
            ("biweekly".to_string(), dec!(0.10)),
            ("weekly".to_string(), dec!(0.15)),
        ]);

        let upgrade_rules = vec![
            UpgradeRule {
                trigger: UpgradeTrigger::SquareFootageOver { threshold: 3500 },
                minimum_tier: ServiceTier::Premium,
                reason: "Homes over 3,500 sq ft require our Premium service tier".to_string(),
                priority: 10,
            },
            UpgradeRule {
                trigger: UpgradeTrigger::PostRenovation,
                minimum_tier: ServiceTier::Premium,
                reason: "Post-renovation cleanup requires our Premium service tier".to_string(),
                priority: 20,
            },
            UpgradeRule {
                trigger: UpgradeTrigger::MoldOrWaterDamage,
                minimum_tier: ServiceTier::Elite,
                reason: "Mold or water damage remediation requires our Elite service tier"
                    .to_string(),
                priority: 30,
            },
            UpgradeRule {
                trigger: UpgradeTrigger::BiohazardFlag,
                minimum_tier: ServiceTier::Elite,
                reason: "Biohazard conditions require our Elite service tier".to_string(),
                priority: 40,
            },
            UpgradeRule {
                trigger: UpgradeTrigger::CleanlinessAtLeast { level: 4 },
                minimum_tier: ServiceTier::Elite,
                reason: "Biohazard-level cleaning requires our Elite service tier".to_string(),
                priority: 50,
            },
        ];

        Self {
            room_rates,
            tier_multipliers: TierRates::new(dec!(1.0), dec!(1.05), dec!(1.1)),
            cleanliness_multipliers,
            add_ons,
            exclusive_services,
            frequency_discounts,
            upgrade_rules,
            minimum_job_values: TierRates::new(dec!(89), dec!(129), dec!(199)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_cleanliness_level_has_multipliers() {
        let tables = PricingTables::default();
        for level in 1..=4u8 {
            assert!(tables.cleanliness_multipliers.contains_key(&level));
        }
    }

    #[test]
    fn level_one_multipliers_are_neutral() {
        let tables = PricingTables::default();
        for tier in [
            ServiceTier::Standard,
            ServiceTier::Premium,
            ServiceTier::Elite,
        ] {
            assert_eq!(
                tables.cleanliness_multiplier(CleanlinessLevel::Light, tier),
                Decimal::ONE
            );
        }
    }

    #[test]
    fn unknown_frequency_gets_no_discount() {
        let tables = PricingTables::default();
        assert_eq!(tables.frequency_discount("fortnightly"), Decimal::ZERO);
        assert_eq!(tables.frequency_discount("weekly"), dec!(0.15));
    }

    #[test]
    fn tables_survive_a_serde_round_trip() {
        let tables = PricingTables::default();
        let json = serde_json::to_string(&tables).unwrap();
        let back: PricingTables = serde_json::from_str(&json).unwrap();
        assert_eq!(back.room_rates, tables.room_rates);
        assert_eq!(back.frequency_discounts, tables.frequency_discounts);
    }
}
