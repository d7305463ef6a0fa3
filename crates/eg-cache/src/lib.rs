//! Event-Type Metadata Cache
//!
//! Each EventGate instance answers "what is the schema/category of event type
//! X?" from a local read-through cache backed by the durable repository.
//! Cross-instance coherence is driven through the coordination service: one
//! node per event-type name under a reserved namespace, used purely as an
//! invalidation signal. Watchers on every instance evict their local entry
//! when a node changes or disappears; the next `get` reloads lazily.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::EventTypeCache;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
