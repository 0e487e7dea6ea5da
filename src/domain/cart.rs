//! Cart domain types and DTOs
//!
//! One durable cart document per customer: named lists of normalized items,
//! a derived summary for the active list, and the replication metadata used
//! to reconcile concurrent edits at load time.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Service,
    Product,
    Subscription,
}

/// A normalized cart line. Identity is `(id, sku)` via [`CompositeKey`];
/// after creation only `quantity` is ever mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub sku: String,
    #[serde(default)]
    pub kind: ItemKind,
    pub unit_price: Decimal,
    pub quantity: u32,
    /// Open bag: service tier, cleanliness level, room mix, add-ons,
    /// display name, image, enforced-tier reason, and so on.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Partial item as submitted by a caller; every field is optional and
/// normalization fills the gaps. A draft never fails to normalize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartItemDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub kind: Option<ItemKind>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    /// Accepted as a float and floored; callers send whatever the form holds.
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl From<CartItem> for CartItemDraft {
    fn from(item: CartItem) -> Self {
        Self {
            id: Some(item.id),
            sku: Some(item.sku),
            kind: Some(item.kind),
            unit_price: Some(item.unit_price),
            quantity: Some(item.quantity as f64),
            metadata: Some(item.metadata),
        }
    }
}

/// Deterministic identity derived from `(id, sku)`. The sole equality test
/// for "same logical item, bump quantity" vs "different item, append".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeKey(pub String);

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CompositeKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Derived totals for a list of items, all rounded to cents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// The named lists a customer can hold items in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CartListName {
    #[default]
    Main,
    Business,
    Personal,
    Wishlist,
    Saved,
}

impl CartListName {
    pub const ALL: [CartListName; 5] = [
        Self::Main,
        Self::Business,
        Self::Personal,
        Self::Wishlist,
        Self::Saved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Business => "business",
            Self::Personal => "personal",
            Self::Wishlist => "wishlist",
            Self::Saved => "saved",
        }
    }
}

impl fmt::Display for CartListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-node logical clock. Carried with every saved state and union-maxed on
/// merge; the merge decision itself is last-write-wins on `last_modified`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorClock(pub BTreeMap<String, u64>);

impl VectorClock {
    pub fn tick(&mut self, node_id: &str) {
        *self.0.entry(node_id.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, node_id: &str) -> u64 {
        self.0.get(node_id).copied().unwrap_or(0)
    }

    /// Entrywise max of both clocks.
    pub fn merged(&self, other: &VectorClock) -> VectorClock {
        let mut out = self.0.clone();
        for (node, &counter) in &other.0 {
            let entry = out.entry(node.clone()).or_insert(0);
            *entry = (*entry).max(counter);
        }
        VectorClock(out)
    }
}

/// The one durable cart document.
///
/// `summary`, `total_items` and `total_price` always describe the active
/// list and are recomputed on every mutation, never hand-patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartState {
    pub lists: BTreeMap<CartListName, Vec<CartItem>>,
    pub active_list: CartListName,
    pub summary: CartSummary,
    pub total_items: u32,
    pub total_price: Decimal,
    pub version: u64,
    pub last_modified: DateTime<Utc>,
    pub clock: VectorClock,
    pub node_id: String,
}

impl CartState {
    pub fn new(node_id: impl Into<String>) -> Self {
        let lists = CartListName::ALL
            .into_iter()
            .map(|name| (name, Vec::new()))
            .collect();

        Self {
            lists,
            active_list: CartListName::Main,
            summary: CartSummary::default(),
            total_items: 0,
            total_price: Decimal::ZERO,
            version: 0,
            last_modified: Utc::now(),
            clock: VectorClock::default(),
            node_id: node_id.into(),
        }
    }

    pub fn active_items(&self) -> &[CartItem] {
        self.lists
            .get(&self.active_list)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.lists.values().all(Vec::is_empty)
    }
}

/// Append-only log entry, one per applied cart operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
}

// ---------------------------------------------------------------------------
// Request DTOs

#[derive(Debug, Clone, Deserialize)]
pub struct AddItemRequest {
    #[serde(flatten)]
    pub item: CartItemDraft,
    #[serde(default)]
    pub list: Option<CartListName>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddItemsRequest {
    pub items: Vec<CartItemDraft>,
    #[serde(default)]
    pub list: Option<CartListName>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: f64,
    #[serde(default)]
    pub list: Option<CartListName>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveItemRequest {
    #[serde(default)]
    pub list: Option<CartListName>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveItemRequest {
    pub key: String,
    pub from: CartListName,
    pub to: CartListName,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetActiveListRequest {
    pub list: CartListName,
}
