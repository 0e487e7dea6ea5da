//! Cart persistence
//!
//! Primary store is redis (one document per cart plus an append-only action
//! log); the fallback is a flat JSON snapshot on disk. Reads try the primary
//! and fall back transparently; writes try the primary, fall back on
//! failure, and only error when both stores refuse.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::domain::cart::{CartLogEntry, CartState};
use crate::error::PersistenceError;

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn save(&self, cart_id: &str, state: &CartState) -> Result<(), PersistenceError>;
    async fn load(&self, cart_id: &str) -> Result<Option<CartState>, PersistenceError>;
    async fn append_action(
        &self,
        cart_id: &str,
        entry: &CartLogEntry,
    ) -> Result<(), PersistenceError>;
    /// Cheap liveness probe for health reporting.
    async fn ping(&self) -> Result<(), PersistenceError>;
}

/// Last-write-wins reconciliation of two copies of the same cart.
///
/// The wall-clock `last_modified` decides outright; the vector clocks are
/// union-maxed onto the winner so causality information survives, but they
/// do not participate in the decision. Concurrent edits from the losing
/// side are discarded wholesale.
pub fn merge(remote: CartState, local: CartState) -> CartState {
    let remote_wins = (remote.last_modified, remote.version) >= (local.last_modified, local.version);
    let (mut winner, loser) = if remote_wins {
        (remote, local)
    } else {
        (local, remote)
    };
    winner.clock = winner.clock.merged(&loser.clock);
    winner.version = winner.version.max(loser.version);
    winner
}

mod keys {
    pub fn current(cart_id: &str) -> String {
        format!("cart:{}:current", cart_id)
    }

    pub fn log(cart_id: &str) -> String {
        format!("cart:{}:log", cart_id)
    }
}

/// Redis-backed primary store.
#[derive(Clone)]
pub struct RedisCartStore {
    conn: ConnectionManager,
}

impl RedisCartStore {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("redis cart store connected");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CartStore for RedisCartStore {
    async fn save(&self, cart_id: &str, state: &CartState) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        let data = serde_json::to_string(state)?;
        conn.set::<_, _, ()>(keys::current(cart_id), data)
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))
    }

    async fn load(&self, cart_id: &str) -> Result<Option<CartState>, PersistenceError> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn
            .get(keys::current(cart_id))
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn append_action(
        &self,
        cart_id: &str,
        entry: &CartLogEntry,
    ) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        let data = serde_json::to_string(entry)?;
        conn.rpush::<_, _, ()>(keys::log(cart_id), data)
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

/// Flat-file fallback store: one JSON snapshot and one JSONL action log per
/// cart, under the configured data directory.
#[derive(Clone)]
pub struct FileCartStore {
    dir: PathBuf,
}

/// Cart ids come from callers; keep them filesystem-safe.
fn sanitize(cart_id: &str) -> String {
    cart_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

impl FileCartStore {
    pub async fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn snapshot_path(&self, cart_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(cart_id)))
    }

    fn log_path(&self, cart_id: &str) -> PathBuf {
        self.dir.join(format!("{}.actions.jsonl", sanitize(cart_id)))
    }

    /// The persistent node identifier for this installation: generated once,
    /// stored beside the snapshots, reused on every start.
    pub async fn node_id(&self) -> anyhow::Result<String> {
        let path = self.dir.join("node_id");
        match tokio::fs::read_to_string(&path).await {
            Ok(existing) => {
                let trimmed = existing.trim().to_string();
                if !trimmed.is_empty() {
                    return Ok(trimmed);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let fresh = Uuid::new_v4().to_string();
        tokio::fs::write(&path, &fresh).await?;
        tracing::info!(node_id = %fresh, "generated persistent node id");
        Ok(fresh)
    }
}

#[async_trait]
impl CartStore for FileCartStore {
    async fn save(&self, cart_id: &str, state: &CartState) -> Result<(), PersistenceError> {
        let data = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(self.snapshot_path(cart_id), data)
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))
    }

    async fn load(&self, cart_id: &str) -> Result<Option<CartState>, PersistenceError> {
        match tokio::fs::read(self.snapshot_path(cart_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Unavailable(e.to_string())),
        }
    }

    async fn append_action(
        &self,
        cart_id: &str,
        entry: &CartLogEntry,
    ) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(cart_id))
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        file.write_all(&line)
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        tokio::fs::metadata(&self.dir)
            .await
            .map(|_| ())
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))
    }
}

/// Primary-plus-fallback composition. Callers never learn which mechanism
/// served them.
pub struct TieredCartStore {
    primary: Option<Box<dyn CartStore>>,
    fallback: FileCartStore,
}

impl TieredCartStore {
    pub fn new(primary: Option<Box<dyn CartStore>>, fallback: FileCartStore) -> Self {
        Self { primary, fallback }
    }

    pub async fn save(&self, cart_id: &str, state: &CartState) -> Result<(), PersistenceError> {
        if let Some(primary) = &self.primary {
            match primary.save(cart_id, state).await {
                Ok(()) => return Ok(()),
                Err(primary_err) => {
                    tracing::warn!(cart_id, error = %primary_err, "primary save failed, using fallback");
                    return self.fallback.save(cart_id, state).await.map_err(|fallback_err| {
                        PersistenceError::WriteFailed {
                            primary: primary_err.to_string(),
                            fallback: fallback_err.to_string(),
                        }
                    });
                }
            }
        }
        self.fallback.save(cart_id, state).await
    }

    /// Read both tiers and reconcile. A primary answer alone is not
    /// authoritative: a save that fell back may have left the newer
    /// document only on disk, and serving the primary copy outright would
    /// silently regress the cart once the primary recovers.
    pub async fn load(&self, cart_id: &str) -> Result<Option<CartState>, PersistenceError> {
        let from_primary = match &self.primary {
            Some(primary) => match primary.load(cart_id).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(cart_id, error = %e, "primary load failed, trying fallback");
                    None
                }
            },
            None => None,
        };

        let from_fallback = match self.fallback.load(cart_id).await {
            Ok(state) => state,
            Err(e) if from_primary.is_some() => {
                tracing::warn!(cart_id, error = %e, "fallback load failed, serving primary copy");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(match (from_primary, from_fallback) {
            (Some(primary), Some(fallback)) => Some(merge(primary, fallback)),
            (primary, fallback) => primary.or(fallback),
        })
    }

    pub async fn append_action(
        &self,
        cart_id: &str,
        entry: &CartLogEntry,
    ) -> Result<(), PersistenceError> {
        if let Some(primary) = &self.primary {
            match primary.append_action(cart_id, entry).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(cart_id, error = %e, "primary log append failed, using fallback");
                }
            }
        }
        self.fallback.append_action(cart_id, entry).await
    }

    /// (primary healthy, fallback healthy)
    pub async fn health(&self) -> (Option<bool>, bool) {
        let primary = match &self.primary {
            Some(p) => Some(p.ping().await.is_ok()),
            None => None,
        };
        let fallback = self.fallback.ping().await.is_ok();
        (primary, fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn state_with(node: &str, version: u64) -> CartState {
        let mut state = CartState::new(node);
        state.version = version;
        state.clock.tick(node);
        state
    }

    /// Primary that refuses everything, like redis mid-outage.
    struct FailingStore;

    #[async_trait]
    impl CartStore for FailingStore {
        async fn save(&self, _: &str, _: &CartState) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("connection refused".to_string()))
        }

        async fn load(&self, _: &str) -> Result<Option<CartState>, PersistenceError> {
            Err(PersistenceError::Unavailable("connection refused".to_string()))
        }

        async fn append_action(&self, _: &str, _: &CartLogEntry) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("connection refused".to_string()))
        }

        async fn ping(&self) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("connection refused".to_string()))
        }
    }

    /// Healthy primary that serves one fixed document and accepts no writes,
    /// like redis freshly recovered with an old copy.
    struct CannedStore(CartState);

    #[async_trait]
    impl CartStore for CannedStore {
        async fn save(&self, _: &str, _: &CartState) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("read-only".to_string()))
        }

        async fn load(&self, _: &str) -> Result<Option<CartState>, PersistenceError> {
            Ok(Some(self.0.clone()))
        }

        async fn append_action(&self, _: &str, _: &CartLogEntry) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("read-only".to_string()))
        }

        async fn ping(&self) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn file_store_round_trips_a_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCartStore::open(dir.path()).await.unwrap();

        let state = state_with("node-a", 3);
        store.save("cart-1", &state).await.unwrap();
        let loaded = store.load("cart-1").await.unwrap().unwrap();

        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn file_store_returns_none_for_unknown_carts() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCartStore::open(dir.path()).await.unwrap();
        assert!(store.load("never-saved").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn action_log_appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCartStore::open(dir.path()).await.unwrap();

        for kind in ["add_item", "remove_item"] {
            store
                .append_action(
                    "cart-1",
                    &CartLogEntry {
                        kind: kind.to_string(),
                        payload: serde_json::json!({}),
                        timestamp: chrono::Utc::now(),
                        node_id: "node-a".to_string(),
                    },
                )
                .await
                .unwrap();
        }

        let raw = tokio::fs::read_to_string(store.log_path("cart-1"))
            .await
            .unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[tokio::test]
    async fn node_id_is_generated_once_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCartStore::open(dir.path()).await.unwrap();

        let first = store.node_id().await.unwrap();
        let second = store.node_id().await.unwrap();
        assert_eq!(first, second);

        // A new store over the same directory sees the same id.
        let reopened = FileCartStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.node_id().await.unwrap(), first);
    }

    #[tokio::test]
    async fn tiered_store_without_primary_uses_the_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = FileCartStore::open(dir.path()).await.unwrap();
        let store = TieredCartStore::new(None, fallback);

        let state = state_with("node-a", 1);
        store.save("cart-1", &state).await.unwrap();
        assert_eq!(store.load("cart-1").await.unwrap().unwrap(), state);
    }

    #[tokio::test]
    async fn save_falls_back_when_the_primary_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = FileCartStore::open(dir.path()).await.unwrap();
        let store = TieredCartStore::new(Some(Box::new(FailingStore)), fallback);

        let state = state_with("node-a", 1);
        store.save("cart-1", &state).await.unwrap();

        // The write landed on disk and reads serve it despite the primary.
        assert_eq!(store.load("cart-1").await.unwrap().unwrap(), state);
    }

    #[tokio::test]
    async fn writes_fail_only_when_both_tiers_do() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        let fallback = FileCartStore::open(&path).await.unwrap();
        tokio::fs::remove_dir_all(&path).await.unwrap();

        let store = TieredCartStore::new(Some(Box::new(FailingStore)), fallback);
        let err = store
            .save("cart-1", &state_with("node-a", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::WriteFailed { .. }));
    }

    #[tokio::test]
    async fn load_prefers_the_newer_fallback_over_a_stale_primary() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = FileCartStore::open(dir.path()).await.unwrap();

        // A save fell back earlier, leaving the acknowledged version on disk;
        // the recovered primary still holds the one before it.
        let mut stale = state_with("node-a", 4);
        stale.last_modified = chrono::Utc::now() - Duration::seconds(60);
        let fresh = state_with("node-a", 5);
        fallback.save("cart-1", &fresh).await.unwrap();

        let store = TieredCartStore::new(Some(Box::new(CannedStore(stale))), fallback);
        let loaded = store.load("cart-1").await.unwrap().unwrap();
        assert_eq!(loaded.version, 5);
        assert_eq!(loaded.last_modified, fresh.last_modified);
    }

    #[tokio::test]
    async fn health_reports_a_dead_primary_as_degradable() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = FileCartStore::open(dir.path()).await.unwrap();
        let store = TieredCartStore::new(Some(Box::new(FailingStore)), fallback);

        assert_eq!(store.health().await, (Some(false), true));
    }

    #[test]
    fn merge_is_last_write_wins_on_timestamp() {
        let mut older = state_with("node-a", 5);
        let mut newer = state_with("node-b", 2);
        older.last_modified = chrono::Utc::now() - Duration::seconds(60);
        newer.last_modified = chrono::Utc::now();

        let resolved = merge(older.clone(), newer.clone());
        assert_eq!(resolved.node_id, "node-b");
        // Loser's items are discarded outright, but its clock survives.
        assert_eq!(resolved.clock.get("node-a"), 1);
        assert_eq!(resolved.clock.get("node-b"), 1);
        assert_eq!(resolved.version, 5);

        // Argument order does not change the outcome.
        let flipped = merge(newer, older);
        assert_eq!(flipped.node_id, "node-b");
    }

    #[test]
    fn sanitize_keeps_ids_filesystem_safe() {
        assert_eq!(sanitize("cart-123"), "cart-123");
        assert_eq!(sanitize("../../etc/passwd"), "______etc_passwd");
    }
}
