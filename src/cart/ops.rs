//! Cart operations
//!
//! Pure state transitions over [`CartState`]: every operation takes the
//! current state by reference and returns a fresh one, recomputing the
//! active-list summary exactly once per call. Persistence is the caller's
//! job (see `cart::service`).

use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::item;
use crate::cart::summary::SummaryCache;
use crate::domain::cart::{CartItem, CartItemDraft, CartListName, CartState, CompositeKey};
use crate::error::CartError;

/// Soft latency budgets. Exceeding one logs a warning, never fails the op.
const SINGLE_OP_BUDGET: Duration = Duration::from_millis(100);
const BATCH_OP_BUDGET: Duration = Duration::from_millis(200);

/// Every mutation the cart supports, in one reducer-style enum. Also the
/// shape written to the append-only action log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartAction {
    AddItem {
        item: CartItemDraft,
        #[serde(default)]
        list: Option<CartListName>,
    },
    AddItems {
        items: Vec<CartItemDraft>,
        #[serde(default)]
        list: Option<CartListName>,
    },
    RemoveItem {
        key: CompositeKey,
        #[serde(default)]
        list: Option<CartListName>,
    },
    UpdateQuantity {
        key: CompositeKey,
        quantity: f64,
        #[serde(default)]
        list: Option<CartListName>,
    },
    MoveItem {
        key: CompositeKey,
        from: CartListName,
        to: CartListName,
    },
    SetActiveList {
        list: CartListName,
    },
    ClearList {
        list: CartListName,
    },
}

impl CartAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddItem { .. } => "add_item",
            Self::AddItems { .. } => "add_items",
            Self::RemoveItem { .. } => "remove_item",
            Self::UpdateQuantity { .. } => "update_quantity",
            Self::MoveItem { .. } => "move_item",
            Self::SetActiveList { .. } => "set_active_list",
            Self::ClearList { .. } => "clear_list",
        }
    }

    fn budget(&self) -> Duration {
        match self {
            Self::AddItems { .. } => BATCH_OP_BUDGET,
            _ => SINGLE_OP_BUDGET,
        }
    }
}

/// Applies cart actions. Holds the summary memo table so unchanged lists
/// don't recompute.
#[derive(Default)]
pub struct CartOps {
    cache: SummaryCache,
}

impl CartOps {
    pub fn new() -> Self {
        Self {
            cache: SummaryCache::new(),
        }
    }

    /// Apply one action, returning the next state. The input is never
    /// mutated; on error the caller keeps the prior state untouched.
    pub fn apply(&self, state: &CartState, action: CartAction) -> Result<CartState, CartError> {
        let started = Instant::now();
        let budget = action.budget();
        let kind = action.kind();

        let mut next = state.clone();
        match action {
            CartAction::AddItem { item: draft, list } => {
                let target = list.unwrap_or(next.active_list);
                Self::upsert(next.list_mut(target), draft);
            }
            CartAction::AddItems { items, list } => {
                let target = list.unwrap_or(next.active_list);
                let entries = next.list_mut(target);
                for draft in items {
                    Self::upsert(entries, draft);
                }
            }
            CartAction::RemoveItem { key, list } => {
                let target = list.unwrap_or(next.active_list);
                // Removing a missing key is a no-op that still recomputes
                // and persists.
                next.list_mut(target)
                    .retain(|existing| item::item_key(existing) != key);
            }
            CartAction::UpdateQuantity {
                key,
                quantity,
                list,
            } => {
                let quantity = item::validate_quantity(quantity)?;
                let target = list.unwrap_or(next.active_list);
                match next
                    .list_mut(target)
                    .iter_mut()
                    .find(|existing| item::item_key(existing) == key)
                {
                    Some(existing) => existing.quantity = quantity,
                    // Stale key from the client; the update quietly misses.
                    None => tracing::warn!(key = %key, list = %target, "quantity update for a key not in the list"),
                }
            }
            CartAction::MoveItem { key, from, to } => {
                if from == to {
                    return Err(CartError::Validation(
                        "source and destination lists match".to_string(),
                    ));
                }
                Self::transfer(&mut next, &key, from, to);
            }
            CartAction::SetActiveList { list } => {
                next.active_list = list;
            }
            CartAction::ClearList { list } => {
                next.list_mut(list).clear();
            }
        }

        self.finish(&mut next);

        let elapsed = started.elapsed();
        if elapsed > budget {
            tracing::warn!(
                action = kind,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = budget.as_millis() as u64,
                "cart operation exceeded its latency budget"
            );
        }

        Ok(next)
    }

    /// Merge-by-key (or by content signature for configured drafts without
    /// ids), append on miss. Repeated adds of the same logical item only
    /// ever grow that item's quantity.
    fn upsert(entries: &mut Vec<CartItem>, draft: CartItemDraft) {
        let had_no_id = draft.id.as_deref().map_or(true, str::is_empty);
        let mut incoming = item::normalize(draft);
        if had_no_id && !incoming.metadata.is_empty() {
            incoming.id = item::synthesized_id(&item::content_signature(&incoming));
        }

        match entries
            .iter_mut()
            .find(|existing| item::similar(existing, &incoming))
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(incoming.quantity),
            None => entries.push(incoming),
        }
    }

    fn transfer(state: &mut CartState, key: &CompositeKey, from: CartListName, to: CartListName) {
        let source = state.list_mut(from);
        let Some(position) = source
            .iter()
            .position(|existing| item::item_key(existing) == *key)
        else {
            tracing::debug!(key = %key, %from, %to, "move target not found, no-op");
            return;
        };
        let moved = source.remove(position);

        let destination = state.list_mut(to);
        match destination
            .iter_mut()
            .find(|existing| item::similar(existing, &moved))
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(moved.quantity),
            None => destination.push(moved),
        }
    }

    /// Recompute active-list totals and stamp the conflict-resolution token.
    /// Runs exactly once per applied action.
    fn finish(&self, state: &mut CartState) {
        let (summary, total_items, total_price) = {
            let active = state.active_items();
            (
                self.cache.summary(active),
                // Individual quantities already saturate; so does their sum.
                active
                    .iter()
                    .fold(0u32, |total, i| total.saturating_add(i.quantity)),
                active.iter().map(CartItem::line_total).sum::<Decimal>(),
            )
        };
        state.summary = summary;
        state.total_items = total_items;
        state.total_price = total_price;

        state.version += 1;
        state.last_modified = chrono::Utc::now();
        let node_id = state.node_id.clone();
        state.clock.tick(&node_id);
    }
}

impl CartState {
    fn list_mut(&mut self, name: CartListName) -> &mut Vec<CartItem> {
        self.lists.entry(name).or_default()
    }
}
