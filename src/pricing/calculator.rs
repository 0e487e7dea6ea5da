//! Price calculator
//!
//! Pure and deterministic: the same configuration and tables always produce
//! the same quote. All failures come back as `CalculationError` values so
//! nothing ever panics across the computation channel.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::domain::pricing::{
    BreakdownCategory, BreakdownLine, PriceAdjustments, PriceResult, ServiceConfiguration,
    ServiceTier,
};
use crate::error::CalculationError;
use crate::pricing::tables::PricingTables;

/// Estimated duration is a linear heuristic on the first-service price, not
/// a physical model of the work.
const DURATION_FACTOR: Decimal = dec!(0.8);

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Resolve the effective tier: every matching upgrade rule is applied and the
/// highest resulting tier wins, along with the reason of the rule that set it.
fn effective_tier(
    config: &ServiceConfiguration,
    tables: &PricingTables,
) -> (ServiceTier, Option<String>) {
    let winner = tables
        .upgrade_rules
        .iter()
        .filter(|rule| rule.trigger.matches(config))
        .max_by_key(|rule| (rule.minimum_tier, rule.priority));

    match winner {
        Some(rule) if rule.minimum_tier > config.service_tier => {
            (rule.minimum_tier, Some(rule.reason.clone()))
        }
        _ => (config.service_tier, None),
    }
}

/// Compute a full quote for one service configuration.
pub fn calculate(
    config: &ServiceConfiguration,
    tables: &PricingTables,
) -> Result<PriceResult, CalculationError> {
    let (tier, enforced_reason) = effective_tier(config, tables);
    let enforced_tier = (tier != config.service_tier).then_some(tier);

    let mut breakdown = Vec::new();
    let mut adjustments = PriceAdjustments::default();

    // Sum per-tier room rates. Unknown room types price at zero.
    let mut base_price = Decimal::ZERO;
    let mut room_count = 0u32;
    for (room, &count) in &config.rooms {
        if count == 0 {
            continue;
        }
        room_count += count;
        if let Some(rates) = tables.room_rates.get(room) {
            base_price += rates.for_tier(tier) * Decimal::from(count);
        }
    }
    breakdown.push(BreakdownLine {
        category: BreakdownCategory::BaseRooms,
        amount: base_price,
        label: format!("{} room(s) at {} rates", room_count, tier.label()),
    });

    // Tier multiplier on the summed base. The rates above are already
    // tier-specific; the multiplier's extra contribution is kept to match the
    // published rate card.
    let mut running = base_price * tables.tier_multipliers.for_tier(tier);
    let tier_adjustment = running - base_price;
    adjustments.tier_adjustment = tier_adjustment;
    if !tier_adjustment.is_zero() {
        breakdown.push(BreakdownLine {
            category: BreakdownCategory::TierAdjustment,
            amount: tier_adjustment,
            label: format!("{} tier adjustment", tier.label()),
        });
    }

    // Tier-specific cleanliness multiplier.
    let cleanliness_delta =
        running * tables.cleanliness_multiplier(config.cleanliness_level, tier) - running;
    adjustments.cleanliness = cleanliness_delta;
    running += cleanliness_delta;
    if !cleanliness_delta.is_zero() {
        breakdown.push(BreakdownLine {
            category: BreakdownCategory::Cleanliness,
            amount: cleanliness_delta,
            label: format!("{} cleanliness difficulty", config.cleanliness_level.label()),
        });
    }

    // Strategic add-ons. Some are bundled into Elite at no charge.
    for selection in &config.add_ons {
        let rate = tables
            .add_ons
            .get(&selection.id)
            .ok_or_else(|| CalculationError::UnknownAddOn(selection.id.clone()))?;
        let unit_price = if rate.included_in_elite && tier == ServiceTier::Elite {
            Decimal::ZERO
        } else {
            rate.rates.for_tier(tier)
        };
        let quantity = selection.quantity.unwrap_or(1);
        let amount = unit_price * Decimal::from(quantity);
        adjustments.add_ons_total += amount;
        breakdown.push(BreakdownLine {
            category: BreakdownCategory::AddOn,
            amount,
            label: if quantity > 1 {
                format!("{} x{}", rate.label, quantity)
            } else {
                rate.label.clone()
            },
        });
    }
    running += adjustments.add_ons_total;

    // Premium-exclusive services, Elite only. At lower tiers the
    // selections are ignored outright: no charge, no error.
    if tier == ServiceTier::Elite {
        let total_rooms = config.total_rooms();
        for id in &config.exclusive_services {
            let rate = tables
                .exclusive_services
                .get(id)
                .ok_or_else(|| CalculationError::UnknownExclusiveService(id.clone()))?;
            let amount = if rate.per_room {
                rate.price * Decimal::from(total_rooms)
            } else {
                rate.price
            };
            adjustments.exclusive_total += amount;
            breakdown.push(BreakdownLine {
                category: BreakdownCategory::ExclusiveService,
                amount,
                label: rate.label.clone(),
            });
        }
        running += adjustments.exclusive_total;
    }

    // First visit carries no frequency discount.
    let mut first_service_price = running;

    // Frequency discount for recurring visits.
    let frequency_discount = running * tables.frequency_discount(&config.frequency);
    adjustments.frequency_discount = frequency_discount;
    let mut recurring_service_price = running - frequency_discount;
    if !frequency_discount.is_zero() {
        breakdown.push(BreakdownLine {
            category: BreakdownCategory::FrequencyDiscount,
            amount: -frequency_discount,
            label: format!("{} frequency discount", config.frequency),
        });
    }

    // Flat general discounts against both prices, clamped at zero.
    let general_discounts: Decimal = config.discounts.values().copied().sum();
    adjustments.general_discounts = general_discounts;
    if !general_discounts.is_zero() {
        breakdown.push(BreakdownLine {
            category: BreakdownCategory::Discount,
            amount: -general_discounts,
            label: "Applied discounts".to_string(),
        });
        first_service_price = (first_service_price - general_discounts).max(Decimal::ZERO);
        recurring_service_price = (recurring_service_price - general_discounts).max(Decimal::ZERO);
    }

    // Cents rounding and the duration heuristic.
    let first_service_price = round_cents(first_service_price);
    let recurring_service_price = round_cents(recurring_service_price);
    let estimated_duration_minutes = (first_service_price * DURATION_FACTOR)
        .round()
        .to_i64()
        .unwrap_or(0);

    Ok(PriceResult {
        base_price,
        adjustments,
        first_service_price,
        recurring_service_price,
        estimated_duration_minutes,
        breakdown,
        enforced_tier,
        enforced_tier_reason: enforced_tier.and(enforced_reason),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::{AddOnSelection, CleanlinessLevel, PropertyDetails};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn config(rooms: &[(&str, u32)]) -> ServiceConfiguration {
        ServiceConfiguration {
            rooms: rooms
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
            service_tier: ServiceTier::Standard,
            cleanliness_level: CleanlinessLevel::Light,
            frequency: "one_time".to_string(),
            add_ons: Vec::new(),
            exclusive_services: Vec::new(),
            property: None,
            discounts: BTreeMap::new(),
            zip_code: None,
        }
    }

    #[test]
    fn single_standard_bedroom_prices_at_the_base_rate() {
        let result = calculate(&config(&[("bedroom", 1)]), &PricingTables::default()).unwrap();

        assert_eq!(result.base_price, dec!(50));
        assert_eq!(result.first_service_price, dec!(50.00));
        assert_eq!(result.recurring_service_price, dec!(50.00));
        assert_eq!(result.estimated_duration_minutes, 40);
        assert!(result.enforced_tier.is_none());
    }

    #[test]
    fn weekly_frequency_discounts_recurring_visits_only() {
        let mut cfg = config(&[("bedroom", 1)]);
        cfg.frequency = "weekly".to_string();

        let result = calculate(&cfg, &PricingTables::default()).unwrap();

        assert_eq!(result.first_service_price, dec!(50.00));
        assert_eq!(result.recurring_service_price, dec!(42.50));
    }

    #[test]
    fn one_time_recurring_price_equals_first_price() {
        let mut cfg = config(&[("kitchen", 1), ("bathroom", 2)]);
        cfg.add_ons.push(AddOnSelection {
            id: "inside_oven".to_string(),
            quantity: None,
        });

        let result = calculate(&cfg, &PricingTables::default()).unwrap();
        assert_eq!(result.recurring_service_price, result.first_service_price);
    }

    #[test]
    fn biohazard_cleanliness_forces_elite_with_a_reason() {
        let mut cfg = config(&[("bedroom", 2)]);
        cfg.cleanliness_level = CleanlinessLevel::Biohazard;

        let result = calculate(&cfg, &PricingTables::default()).unwrap();

        assert_eq!(result.enforced_tier, Some(ServiceTier::Elite));
        let reason = result.enforced_tier_reason.expect("reason must be set");
        assert!(!reason.is_empty());
        // Elite bedroom rate 95 x2, Elite multiplier 1.1, biohazard x2.5
        assert_eq!(result.base_price, dec!(190));
        assert_eq!(result.first_service_price, dec!(522.50));
    }

    #[test]
    fn mold_damage_outranks_a_renovation_upgrade() {
        let mut cfg = config(&[("basement", 1)]);
        cfg.property = Some(PropertyDetails {
            post_renovation: true,
            mold_or_water_damage: true,
            ..PropertyDetails::default()
        });

        let result = calculate(&cfg, &PricingTables::default()).unwrap();
        assert_eq!(result.enforced_tier, Some(ServiceTier::Elite));
        assert!(result
            .enforced_tier_reason
            .unwrap()
            .contains("Mold or water damage"));
    }

    #[test]
    fn bundled_add_ons_are_free_at_elite() {
        let mut cfg = config(&[("kitchen", 1)]);
        cfg.service_tier = ServiceTier::Elite;
        cfg.add_ons.push(AddOnSelection {
            id: "inside_fridge".to_string(),
            quantity: None,
        });

        let result = calculate(&cfg, &PricingTables::default()).unwrap();
        assert_eq!(result.adjustments.add_ons_total, Decimal::ZERO);
    }

    #[test]
    fn per_unit_add_ons_multiply_by_quantity() {
        let mut cfg = config(&[("bedroom", 1)]);
        cfg.add_ons.push(AddOnSelection {
            id: "interior_windows".to_string(),
            quantity: Some(5),
        });

        let result = calculate(&cfg, &PricingTables::default()).unwrap();
        assert_eq!(result.adjustments.add_ons_total, dec!(40));
        assert_eq!(result.first_service_price, dec!(90.00));
    }

    #[test]
    fn exclusive_services_are_ignored_below_elite() {
        let mut cfg = config(&[("bedroom", 1)]);
        cfg.exclusive_services
            .push("steam_sanitization".to_string());

        let result = calculate(&cfg, &PricingTables::default()).unwrap();
        assert_eq!(result.adjustments.exclusive_total, Decimal::ZERO);
        assert_eq!(result.first_service_price, dec!(50.00));
    }

    #[test]
    fn per_room_exclusive_services_scale_with_room_count() {
        let mut cfg = config(&[("bedroom", 2), ("bathroom", 1)]);
        cfg.service_tier = ServiceTier::Elite;
        cfg.exclusive_services
            .push("steam_sanitization".to_string());

        let result = calculate(&cfg, &PricingTables::default()).unwrap();
        // 3 rooms at 25 each
        assert_eq!(result.adjustments.exclusive_total, dec!(75));
    }

    #[test]
    fn oversized_discounts_clamp_prices_at_zero() {
        let mut cfg = config(&[("hallway", 1)]);
        cfg.discounts
            .insert("grand_opening".to_string(), dec!(500));

        let result = calculate(&cfg, &PricingTables::default()).unwrap();
        assert_eq!(result.first_service_price, Decimal::ZERO);
        assert_eq!(result.recurring_service_price, Decimal::ZERO);
    }

    #[test]
    fn unknown_room_types_contribute_zero_without_error() {
        let result = calculate(
            &config(&[("bedroom", 1), ("observatory", 3)]),
            &PricingTables::default(),
        )
        .unwrap();
        assert_eq!(result.base_price, dec!(50));
    }

    #[test]
    fn unknown_add_on_is_a_structured_error() {
        let mut cfg = config(&[("bedroom", 1)]);
        cfg.add_ons.push(AddOnSelection {
            id: "moat_dredging".to_string(),
            quantity: None,
        });

        let err = calculate(&cfg, &PricingTables::default()).unwrap_err();
        assert_eq!(err, CalculationError::UnknownAddOn("moat_dredging".into()));
    }

    #[test]
    fn unknown_frequency_means_no_recurring_discount() {
        let mut cfg = config(&[("bedroom", 1)]);
        cfg.frequency = "every_blue_moon".to_string();

        let result = calculate(&cfg, &PricingTables::default()).unwrap();
        assert_eq!(result.recurring_service_price, result.first_service_price);
    }

    #[test]
    fn identical_inputs_produce_identical_quotes() {
        let tables = PricingTables::default();
        let mut cfg = config(&[("kitchen", 1), ("bedroom", 3)]);
        cfg.cleanliness_level = CleanlinessLevel::Heavy;
        cfg.frequency = "biweekly".to_string();

        let a = calculate(&cfg, &tables).unwrap();
        let b = calculate(&cfg, &tables).unwrap();
        assert_eq!(a.first_service_price, b.first_service_price);
        assert_eq!(a.breakdown.len(), b.breakdown.len());
    }
}
