//! Pricing domain types
//!
//! The service configuration a customer builds in the booking flow, and the
//! price breakdown the calculator returns for it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Service quality tier. Ordering matters: upgrade rules may only move a
/// booking to a higher tier, never down.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTier {
    #[default]
    Standard,
    Premium,
    Elite,
}

impl ServiceTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Premium => "Premium",
            Self::Elite => "Elite",
        }
    }
}

/// Cleanliness difficulty on the 1-4 severity scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CleanlinessLevel {
    Light = 1,
    Medium = 2,
    Heavy = 3,
    Biohazard = 4,
}

impl CleanlinessLevel {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Medium => "Medium",
            Self::Heavy => "Heavy",
            Self::Biohazard => "Biohazard",
        }
    }
}

impl TryFrom<u8> for CleanlinessLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Light),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Heavy),
            4 => Ok(Self::Biohazard),
            other => Err(format!("cleanliness level must be 1-4, got {}", other)),
        }
    }
}

impl From<CleanlinessLevel> for u8 {
    fn from(level: CleanlinessLevel) -> Self {
        level as u8
    }
}

/// A selected strategic add-on, with an optional per-unit quantity
/// (e.g. number of interior windows).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOnSelection {
    pub id: String,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Property attributes the booking form collects. All optional; several feed
/// the automatic tier-upgrade rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyDetails {
    #[serde(default)]
    pub square_footage: Option<u32>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub has_pets: bool,
    #[serde(default)]
    pub post_renovation: bool,
    #[serde(default)]
    pub mold_or_water_damage: bool,
    #[serde(default)]
    pub biohazard: bool,
}

/// Everything the price calculator needs for one quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfiguration {
    /// Room type -> count. Unknown room types price at zero.
    #[serde(default)]
    pub rooms: BTreeMap<String, u32>,
    pub service_tier: ServiceTier,
    pub cleanliness_level: CleanlinessLevel,
    /// Frequency identifier, e.g. "one_time", "weekly". Unknown ids get a
    /// 0% recurring discount.
    pub frequency: String,
    #[serde(default)]
    pub add_ons: Vec<AddOnSelection>,
    /// Elite-only exclusive services; silently ignored at lower tiers.
    #[serde(default)]
    pub exclusive_services: Vec<String>,
    #[serde(default)]
    pub property: Option<PropertyDetails>,
    /// Flat general discounts (label -> amount), subtracted from both prices.
    #[serde(default)]
    pub discounts: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub zip_code: Option<String>,
}

impl ServiceConfiguration {
    /// Total selected room count, used by per-room exclusive services.
    pub fn total_rooms(&self) -> u32 {
        self.rooms.values().sum()
    }

    pub fn property(&self) -> PropertyDetails {
        self.property.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownCategory {
    BaseRooms,
    TierAdjustment,
    Cleanliness,
    AddOn,
    ExclusiveService,
    FrequencyDiscount,
    Discount,
}

/// One human-readable line of the itemized quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub category: BreakdownCategory,
    pub amount: Decimal,
    pub label: String,
}

/// Itemized deltas, in application order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceAdjustments {
    pub tier_adjustment: Decimal,
    pub cleanliness: Decimal,
    pub add_ons_total: Decimal,
    pub exclusive_total: Decimal,
    pub frequency_discount: Decimal,
    pub general_discounts: Decimal,
}

/// Full quote for a service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResult {
    /// Pre-multiplier sum of per-tier room rates.
    pub base_price: Decimal,
    pub adjustments: PriceAdjustments,
    /// One-time price, no frequency discount.
    pub first_service_price: Decimal,
    /// Price per visit once the frequency discount applies.
    pub recurring_service_price: Decimal,
    pub estimated_duration_minutes: i64,
    pub breakdown: Vec<BreakdownLine>,
    /// Set when an automatic upgrade rule overrode the requested tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforced_tier: Option<ServiceTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforced_tier_reason: Option<String>,
}
