//! Cart item utilities: normalization, composite keys, quantity validation
//! and the looser content-signature match used for UI-configured items.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::cart::{CartItem, CartItemDraft, CompositeKey};
use crate::error::CartError;

/// Fill a partial item into a complete one. Total function: any draft
/// normalizes, and normalizing an already-normalized item changes nothing.
pub fn normalize(draft: CartItemDraft) -> CartItem {
    let id = draft
        .id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("item-{}", Uuid::new_v4()));
    let sku = draft
        .sku
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("sku-{}", Utc::now().timestamp_millis()));

    let unit_price = draft.unit_price.unwrap_or(Decimal::ZERO).max(Decimal::ZERO);

    let quantity = match draft.quantity {
        Some(q) if q.is_finite() && q >= 1.0 => q.floor().min(u32::MAX as f64) as u32,
        _ => 1,
    };

    CartItem {
        id,
        sku,
        kind: draft.kind.unwrap_or_default(),
        unit_price,
        quantity,
        metadata: draft.metadata.unwrap_or_default(),
    }
}

/// Deterministic identity for `(id, sku)`. Length-prefixed so that
/// `("ab", "c")` and `("a", "bc")` cannot collide.
pub fn composite_key(id: &str, sku: &str) -> CompositeKey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(id.len() as u64).to_le_bytes());
    hasher.update(id.as_bytes());
    hasher.update(&(sku.len() as u64).to_le_bytes());
    hasher.update(sku.as_bytes());
    CompositeKey(hasher.finalize().to_hex().to_string())
}

pub fn item_key(item: &CartItem) -> CompositeKey {
    composite_key(&item.id, &item.sku)
}

/// Reject anything that isn't a positive finite number; floor the rest.
pub fn validate_quantity(quantity: f64) -> Result<u32, CartError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    Ok(quantity.floor().min(u32::MAX as f64).max(1.0) as u32)
}

/// Signature over what the item *is* (kind, price, configuration metadata)
/// rather than which random id it got. Used to coalesce UI-generated items
/// that describe the same configured service.
pub fn content_signature(item: &CartItem) -> String {
    // BTreeMap gives a canonical field order regardless of insertion order.
    let canonical: BTreeMap<&String, &serde_json::Value> = item.metadata.iter().collect();
    let mut hasher = blake3::Hasher::new();
    hasher.update(format!("{:?}|{}", item.kind, item.unit_price).as_bytes());
    if let Ok(bytes) = serde_json::to_vec(&canonical) {
        hasher.update(&bytes);
    }
    hasher.finalize().to_hex()[..16].to_string()
}

/// Id for a custom-configured item, embedding its content signature so that
/// a later add of the same configuration lands on the same line.
pub fn synthesized_id(signature: &str) -> String {
    format!("cfg-{}", signature)
}

/// Looser equivalence than the composite key: exact key match, or matching
/// content signatures for two configured (metadata-bearing) items.
pub fn similar(a: &CartItem, b: &CartItem) -> bool {
    if item_key(a) == item_key(b) {
        return true;
    }
    !a.metadata.is_empty()
        && !b.metadata.is_empty()
        && content_signature(a) == content_signature(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn draft(id: &str, sku: &str) -> CartItemDraft {
        CartItemDraft {
            id: Some(id.to_string()),
            sku: Some(sku.to_string()),
            kind: None,
            unit_price: Some(dec!(25)),
            quantity: Some(2.0),
            metadata: None,
        }
    }

    #[test]
    fn normalize_fills_every_missing_field() {
        let item = normalize(CartItemDraft::default());
        assert!(item.id.starts_with("item-"));
        assert!(item.sku.starts_with("sku-"));
        assert_eq!(item.unit_price, Decimal::ZERO);
        assert_eq!(item.quantity, 1);
        assert!(item.metadata.is_empty());
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(draft("svc-1", "deep-clean"));
        let twice = normalize(CartItemDraft::from(once.clone()));
        assert_eq!(twice, once);
    }

    #[test]
    fn normalize_clamps_price_and_floors_quantity() {
        let item = normalize(CartItemDraft {
            unit_price: Some(dec!(-10)),
            quantity: Some(3.9),
            ..CartItemDraft::default()
        });
        assert_eq!(item.unit_price, Decimal::ZERO);
        assert_eq!(item.quantity, 3);

        let nan = normalize(CartItemDraft {
            quantity: Some(f64::NAN),
            ..CartItemDraft::default()
        });
        assert_eq!(nan.quantity, 1);
    }

    #[test]
    fn normalize_keeps_an_explicit_kind() {
        use crate::domain::cart::ItemKind;

        for kind in [ItemKind::Product, ItemKind::Subscription] {
            let item = normalize(CartItemDraft {
                kind: Some(kind),
                ..CartItemDraft::default()
            });
            assert_eq!(item.kind, kind);
        }
    }

    #[test]
    fn composite_key_is_deterministic() {
        assert_eq!(composite_key("a", "b"), composite_key("a", "b"));
    }

    #[test]
    fn distinct_pairs_get_distinct_keys() {
        let pairs = [("a", "b"), ("a", "c"), ("b", "a"), ("ab", "c"), ("a", "bc")];
        for (i, lhs) in pairs.iter().enumerate() {
            for rhs in &pairs[i + 1..] {
                assert_ne!(composite_key(lhs.0, lhs.1), composite_key(rhs.0, rhs.1));
            }
        }
    }

    #[test]
    fn validate_quantity_rejects_non_positive_and_non_finite() {
        assert!(validate_quantity(0.0).is_err());
        assert!(validate_quantity(-3.0).is_err());
        assert!(validate_quantity(f64::NAN).is_err());
        assert!(validate_quantity(f64::INFINITY).is_err());
        assert_eq!(validate_quantity(2.7).unwrap(), 2);
        assert_eq!(validate_quantity(1.0).unwrap(), 1);
    }

    #[test]
    fn configured_items_match_on_content_not_random_ids() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("service_tier".to_string(), "premium".into());
        metadata.insert("rooms".to_string(), serde_json::json!({"bedroom": 2}));

        let a = CartItem {
            metadata: metadata.clone(),
            ..normalize(draft("item-random-1", "sku-1"))
        };
        let b = CartItem {
            metadata,
            ..normalize(draft("item-random-2", "sku-2"))
        };

        assert!(similar(&a, &b));
        assert_ne!(item_key(&a), item_key(&b));
    }

    #[test]
    fn plain_items_never_match_on_signature_alone() {
        let a = normalize(draft("p-1", "s-1"));
        let b = normalize(draft("p-2", "s-2"));
        assert!(!similar(&a, &b));
    }
}
