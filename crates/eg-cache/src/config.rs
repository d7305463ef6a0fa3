use serde::{Deserialize, Serialize};

/// Configuration for the event-type cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Reserved parent path in the coordination service. One child node per
    /// active event-type name lives under it.
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "/eventgate/event-types".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}
