//! Coordination service backends
//!
//! Two implementations of [`CoordinationService`]: an in-process hub used for
//! tests and local development (several cache instances can share one hub to
//! simulate a cluster), and a Redis-backed implementation that stores one key
//! per node and fans watch events out over pub/sub.

use crate::error::{CoordinationError, Result};
use crate::watch::{WatchEvent, WatchEventKind, WatchHandler};
use crate::{CoordinationService, CreateMode};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Join a parent path and a child name into a full node path.
fn child_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// Split a full node path into parent path and child name.
fn split_path(path: &str) -> Option<(&str, &str)> {
    path.rsplit_once('/').filter(|(parent, _)| !parent.is_empty())
}

// ============================================================================
// In-Memory Coordination (for testing/development)
// ============================================================================

/// Process-local coordination hub.
///
/// Shared via `Arc` between any number of cache instances; mutations fan
/// watch events out through per-watcher channels consumed by spawned tasks,
/// so delivery is asynchronous and serial per registration, like a real
/// coordination service.
pub struct InMemoryCoordination {
    nodes: RwLock<HashMap<String, Vec<u8>>>,
    watchers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<WatchEvent>>>>,
}

impl InMemoryCoordination {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            watchers: Mutex::new(HashMap::new()),
        }
    }

    fn fan_out(&self, parent: &str, event: WatchEvent) {
        let mut watchers = self.watchers.lock();
        if let Some(senders) = watchers.get_mut(parent) {
            // Drop registrations whose consumer task is gone.
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

impl Default for InMemoryCoordination {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationService for InMemoryCoordination {
    async fn ensure_path(&self, path: &str) -> Result<()> {
        self.nodes.write().entry(path.to_string()).or_default();
        Ok(())
    }

    async fn create_child(&self, parent: &str, name: &str, data: &[u8], _mode: CreateMode) -> Result<()> {
        // Ephemeral and persistent coincide here: every node lives exactly
        // as long as the hub itself.
        let path = child_path(parent, name);
        let created = {
            let mut nodes = self.nodes.write();
            nodes.entry(parent.to_string()).or_default();
            match nodes.entry(path) {
                std::collections::hash_map::Entry::Occupied(_) => false,
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(data.to_vec());
                    true
                }
            }
        };

        if created {
            self.fan_out(parent, WatchEvent::new(WatchEventKind::ChildCreated, name));
        } else {
            debug!(parent, child = name, "node already exists, treating create as success");
        }
        Ok(())
    }

    async fn set_data(&self, path: &str, data: &[u8]) -> Result<()> {
        {
            let mut nodes = self.nodes.write();
            match nodes.get_mut(path) {
                Some(existing) => *existing = data.to_vec(),
                None => return Err(CoordinationError::NodeMissing(path.to_string())),
            }
        }

        if let Some((parent, child)) = split_path(path) {
            self.fan_out(parent, WatchEvent::new(WatchEventKind::ChildDataChanged, child));
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let removed = self.nodes.write().remove(path).is_some();

        if removed {
            if let Some((parent, child)) = split_path(path) {
                self.fan_out(parent, WatchEvent::new(WatchEventKind::ChildDeleted, child));
            }
        } else {
            debug!(path, "node already absent, treating delete as success");
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.nodes.read().contains_key(path))
    }

    async fn get_data(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.nodes.read().get(path).cloned())
    }

    async fn watch_children(&self, path: &str, handler: Arc<dyn WatchHandler>) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.watchers
            .lock()
            .entry(path.to_string())
            .or_default()
            .push(tx);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handler.on_event(event).await;
            }
        });

        debug!(path, "registered children watcher");
        Ok(())
    }
}

// ============================================================================
// Redis Coordination
// ============================================================================

/// Default lifetime for ephemeral nodes, in the spirit of a coordination
/// session timeout.
const DEFAULT_EPHEMERAL_TTL_SECONDS: u64 = 30;

/// Redis-backed coordination service.
///
/// One key per node (`{prefix}:{path}`), watch fan-out over one pub/sub
/// channel per parent path (`{prefix}:watch:{path}`) carrying JSON-encoded
/// [`WatchEvent`] payloads.
pub struct RedisCoordination {
    client: redis::Client,
    conn: ConnectionManager,
    prefix: String,
    ephemeral_ttl_seconds: u64,
}

impl RedisCoordination {
    pub async fn new(redis_url: &str, prefix: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CoordinationError::Unavailable(e.to_string()))?;
        let conn = ConnectionManager::new(client.clone()).await?;

        Ok(Self {
            client,
            conn,
            prefix: prefix.to_string(),
            ephemeral_ttl_seconds: DEFAULT_EPHEMERAL_TTL_SECONDS,
        })
    }

    pub fn with_ephemeral_ttl(mut self, seconds: u64) -> Self {
        self.ephemeral_ttl_seconds = seconds;
        self
    }

    fn key(&self, path: &str) -> String {
        format!("{}:{}", self.prefix, path)
    }

    fn channel(&self, parent: &str) -> String {
        format!("{}:watch:{}", self.prefix, parent)
    }

    async fn publish(&self, parent: &str, event: WatchEvent) -> Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&event)?;

        redis::cmd("PUBLISH")
            .arg(self.channel(parent))
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CoordinationService for RedisCoordination {
    async fn ensure_path(&self, path: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        // SET NX: creating an already-present path is success.
        let _: Option<String> = redis::cmd("SET")
            .arg(self.key(path))
            .arg(&b""[..])
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn create_child(&self, parent: &str, name: &str, data: &[u8], mode: CreateMode) -> Result<()> {
        self.ensure_path(parent).await?;

        let mut conn = self.conn.clone();
        let path = child_path(parent, name);

        let mut cmd = redis::cmd("SET");
        cmd.arg(self.key(&path)).arg(data).arg("NX");
        if mode == CreateMode::Ephemeral {
            cmd.arg("EX").arg(self.ephemeral_ttl_seconds);
        }

        let created: Option<String> = cmd.query_async(&mut conn).await?;
        if created.is_some() {
            self.publish(parent, WatchEvent::new(WatchEventKind::ChildCreated, name))
                .await?;
        } else {
            debug!(parent, child = name, "node already exists, treating create as success");
        }
        Ok(())
    }

    async fn set_data(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut conn = self.conn.clone();

        // SET XX: only overwrite an existing node.
        let updated: Option<String> = redis::cmd("SET")
            .arg(self.key(path))
            .arg(data)
            .arg("XX")
            .query_async(&mut conn)
            .await?;

        if updated.is_none() {
            return Err(CoordinationError::NodeMissing(path.to_string()));
        }

        if let Some((parent, child)) = split_path(path) {
            self.publish(parent, WatchEvent::new(WatchEventKind::ChildDataChanged, child))
                .await?;
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        let removed: i64 = redis::cmd("DEL")
            .arg(self.key(path))
            .query_async(&mut conn)
            .await?;

        if removed > 0 {
            if let Some((parent, child)) = split_path(path) {
                self.publish(parent, WatchEvent::new(WatchEventKind::ChildDeleted, child))
                    .await?;
            }
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(self.key(path))
            .query_async(&mut conn)
            .await?;
        Ok(exists)
    }

    async fn get_data(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let data: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.key(path))
            .query_async(&mut conn)
            .await?;
        Ok(data)
    }

    async fn watch_children(&self, path: &str, handler: Arc<dyn WatchHandler>) -> Result<()> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(self.channel(path)).await?;

        let watched = path.to_string();
        tokio::spawn(async move {
            let mut stream = pubsub.into_on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(path = %watched, error = %e, "unreadable watch payload, skipping");
                        continue;
                    }
                };

                match serde_json::from_str::<WatchEvent>(&payload) {
                    Ok(event) => handler.on_event(event).await,
                    Err(e) => {
                        warn!(path = %watched, error = %e, "malformed watch payload, skipping");
                    }
                }
            }
            warn!(path = %watched, "watch subscription ended");
        });

        debug!(path, "registered children watcher");
        Ok(())
    }
}
