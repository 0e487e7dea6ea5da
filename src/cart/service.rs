//! Cart orchestration: load/merge, apply, write through.
//!
//! The service holds the live in-memory copy of each cart and the tiered
//! store behind it. Reads reconcile storage against memory with the LWW
//! merge; writes go through storage before the in-memory copy is replaced,
//! so a failed write leaves callers on the last persisted state.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::cart::ops::{CartAction, CartOps};
use crate::cart::store::{self, TieredCartStore};
use crate::domain::cart::{CartLogEntry, CartState};
use crate::error::CartError;

pub struct CartService {
    store: TieredCartStore,
    ops: CartOps,
    live: RwLock<HashMap<String, CartState>>,
    node_id: String,
}

impl CartService {
    pub fn new(store: TieredCartStore, node_id: impl Into<String>) -> Self {
        Self {
            store,
            ops: CartOps::new(),
            live: RwLock::new(HashMap::new()),
            node_id: node_id.into(),
        }
    }

    pub async fn health(&self) -> (Option<bool>, bool) {
        self.store.health().await
    }

    /// Current state of a cart: stored copy reconciled against the live one.
    /// Storage read failures are absorbed; a fresh cart is the worst case.
    pub async fn get(&self, cart_id: &str) -> CartState {
        let stored = match self.store.load(cart_id).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(cart_id, error = %e, "cart load failed, continuing with in-memory state");
                None
            }
        };
        let live = self.live.read().get(cart_id).cloned();

        let state = match (stored, live) {
            (Some(remote), Some(local)) => store::merge(remote, local),
            (Some(remote), None) => remote,
            (None, Some(local)) => local,
            (None, None) => CartState::new(self.node_id.clone()),
        };

        self.live
            .write()
            .insert(cart_id.to_string(), state.clone());
        state
    }

    /// Apply one action and write through. A persistence failure propagates
    /// and the pre-action state stays current; there is no partial success.
    pub async fn apply(&self, cart_id: &str, action: CartAction) -> Result<CartState, CartError> {
        let current = self.get(cart_id).await;

        let log_entry = CartLogEntry {
            kind: action.kind().to_string(),
            payload: serde_json::to_value(&action).map_err(crate::error::PersistenceError::from)?,
            timestamp: chrono::Utc::now(),
            node_id: self.node_id.clone(),
        };

        let next = self.ops.apply(&current, action)?;

        self.store.save(cart_id, &next).await?;
        // The audit log is best-effort; the snapshot is the source of truth.
        if let Err(e) = self.store.append_action(cart_id, &log_entry).await {
            tracing::warn!(cart_id, error = %e, "action log append failed");
        }

        self.live.write().insert(cart_id.to_string(), next.clone());

        tracing::debug!(
            cart_id,
            version = next.version,
            total_items = next.total_items,
            "cart action applied"
        );
        Ok(next)
    }
}
