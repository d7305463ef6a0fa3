//! Coordination Service
//!
//! A hierarchical, replicated key space with watch/notification semantics,
//! used by EventGate instances as a cross-instance invalidation channel.
//! Node payloads carry no business content; they are opaque change markers.

pub mod error;
pub mod service;
pub mod watch;

use async_trait::async_trait;
use std::sync::Arc;

pub use error::{CoordinationError, Result};
pub use service::{InMemoryCoordination, RedisCoordination};
pub use watch::{WatchEvent, WatchEventKind, WatchHandler};

/// Durability mode for created nodes.
///
/// Ephemeral nodes are tied to the lifetime of the creating session: the
/// in-memory backend ties them to the hub itself, the Redis backend expires
/// them after a session TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    Persistent,
    Ephemeral,
}

/// Client interface to the coordination service.
///
/// All operations are synchronous calls against the service; only
/// `watch_children` establishes an asynchronous notification channel.
/// Benign races are normalized by every implementation:
/// - creating a node that already exists is success;
/// - deleting a node that is already absent is success;
/// - reading a momentarily nonexistent node yields `None`, not an error.
#[async_trait]
pub trait CoordinationService: Send + Sync {
    /// Create `path` if absent. No error if it already exists.
    async fn ensure_path(&self, path: &str) -> Result<()>;

    /// Create `parent/name` with the given payload, creating `parent` if it
    /// is somehow absent. Success if the child already exists.
    async fn create_child(&self, parent: &str, name: &str, data: &[u8], mode: CreateMode) -> Result<()>;

    /// Overwrite the payload of an existing node. Fails with
    /// [`CoordinationError::NodeMissing`] if the node does not exist.
    async fn set_data(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Delete a node. No error if it is already absent.
    async fn delete(&self, path: &str) -> Result<()>;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// Read a node payload. Absent node yields `None`.
    async fn get_data(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Register a persistent watcher on the direct children of `path`.
    ///
    /// The handler is invoked asynchronously, serially per registration,
    /// for created / data-changed / deleted events on children. The watcher
    /// stays active for the life of the process; there is no per-call
    /// registration.
    async fn watch_children(&self, path: &str, handler: Arc<dyn WatchHandler>) -> Result<()>;
}
