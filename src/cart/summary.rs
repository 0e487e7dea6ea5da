//! Cart summary computation with fingerprint memoization.

use std::collections::HashMap;

use parking_lot::Mutex;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::domain::cart::{CartItem, CartSummary};

const DISCOUNT_RATE: Decimal = dec!(0.05);
const FREE_SHIPPING_THRESHOLD: Decimal = dec!(100);
const FLAT_SHIPPING_FEE: Decimal = dec!(15.00);
const TAX_RATE: Decimal = dec!(0.08);

/// Entries kept before the memo table is cleared wholesale.
const CACHE_CAPACITY: usize = 128;

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Pure summary computation: subtotal, the flat 5% discount, shipping free
/// at or above the threshold, 8% tax on the shipped-and-discounted amount.
pub fn compute(items: &[CartItem]) -> CartSummary {
    let subtotal: Decimal = items.iter().map(CartItem::line_total).sum();
    let discount = subtotal * DISCOUNT_RATE;
    let shipping = if subtotal >= FREE_SHIPPING_THRESHOLD || items.is_empty() {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING_FEE
    };
    let tax = (subtotal - discount + shipping) * TAX_RATE;

    CartSummary {
        subtotal: round_cents(subtotal),
        discount: round_cents(discount),
        shipping: round_cents(shipping),
        tax: round_cents(tax),
        total: round_cents(subtotal - discount + shipping + tax),
    }
}

/// Fingerprint of the (id, quantity, unit price) triples. Two item lists
/// with the same fingerprint summarize identically.
pub fn fingerprint(items: &[CartItem]) -> String {
    let mut hasher = blake3::Hasher::new();
    for item in items {
        hasher.update(item.id.as_bytes());
        hasher.update(&item.quantity.to_le_bytes());
        hasher.update(item.unit_price.to_string().as_bytes());
        hasher.update(b"\x1f");
    }
    hasher.finalize().to_hex().to_string()
}

/// Memoized summary computation. Repeated calls with an unchanged item list
/// are a map lookup. The table is bounded: past capacity it is cleared
/// rather than evicted piecemeal.
#[derive(Default)]
pub struct SummaryCache {
    entries: Mutex<HashMap<String, CartSummary>>,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self, items: &[CartItem]) -> CartSummary {
        let key = fingerprint(items);
        let mut entries = self.entries.lock();
        if let Some(cached) = entries.get(&key) {
            return cached.clone();
        }
        if entries.len() >= CACHE_CAPACITY {
            entries.clear();
        }
        let summary = compute(items);
        entries.insert(key, summary.clone());
        summary
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::ItemKind;
    use pretty_assertions::assert_eq;

    fn item(id: &str, unit_price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            id: id.to_string(),
            sku: format!("sku-{}", id),
            kind: ItemKind::Service,
            unit_price,
            quantity,
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn hundred_dollar_cart_reference_case() {
        let summary = compute(&[item("a", dec!(100), 1)]);
        assert_eq!(summary.subtotal, dec!(100.00));
        assert_eq!(summary.discount, dec!(5.00));
        assert_eq!(summary.shipping, dec!(0.00));
        assert_eq!(summary.tax, dec!(7.60));
        assert_eq!(summary.total, dec!(102.60));
    }

    #[test]
    fn small_carts_pay_flat_shipping() {
        let summary = compute(&[item("a", dec!(40), 1)]);
        assert_eq!(summary.shipping, dec!(15.00));
        // 40 - 2 + 15 = 53, tax 4.24, total 57.24
        assert_eq!(summary.tax, dec!(4.24));
        assert_eq!(summary.total, dec!(57.24));
    }

    #[test]
    fn empty_cart_summarizes_to_zero() {
        let summary = compute(&[]);
        assert_eq!(summary, CartSummary::default());
    }

    #[test]
    fn fingerprint_tracks_only_identity_quantity_and_price() {
        let a = vec![item("a", dec!(10), 2)];
        let mut b = a.clone();
        b[0].metadata.insert("note".to_string(), "gift".into());
        assert_eq!(fingerprint(&a), fingerprint(&b));

        b[0].quantity = 3;
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn cache_reuses_results_for_unchanged_lists() {
        let cache = SummaryCache::new();
        let items = vec![item("a", dec!(10), 1), item("b", dec!(20), 2)];

        let first = cache.summary(&items);
        let second = cache.summary(&items);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);

        let mut changed = items.clone();
        changed[0].quantity = 5;
        cache.summary(&changed);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn cache_clears_past_capacity_instead_of_growing() {
        let cache = SummaryCache::new();
        for i in 0..=CACHE_CAPACITY {
            cache.summary(&[item(&format!("item-{}", i), dec!(1), 1)]);
        }
        assert!(cache.len() <= CACHE_CAPACITY);
    }
}
