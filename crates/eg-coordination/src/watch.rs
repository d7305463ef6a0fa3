//! Watch events and the handler seam
//!
//! Watch notifications are how a node mutation on one instance reaches every
//! other instance. Delivery is asynchronous and eventually consistent: there
//! is an unbounded-but-typically-sub-second delay between a mutation and the
//! handler invocation on a remote instance.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What happened to a child node under a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEventKind {
    ChildCreated,
    ChildDataChanged,
    ChildDeleted,
}

/// A change notification for one direct child of a watched path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    /// Child node name (not the full path).
    pub child: String,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, child: impl Into<String>) -> Self {
        Self {
            kind,
            child: child.into(),
        }
    }
}

/// Callback invoked on the notification channel, never on the mutating
/// caller's task. Implementations must not block on slow backends; the
/// cache's handler only evicts.
#[async_trait]
pub trait WatchHandler: Send + Sync {
    async fn on_event(&self, event: WatchEvent);
}
