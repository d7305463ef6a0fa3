//! Event Type Cache
//!
//! Local in-process map from event-type name to definition, read-through to
//! the durable repository on miss, evicted by coordination-service watch
//! events. The map is a cache, never authoritative: it may be empty or
//! briefly stale, and invalidation across instances is eventually
//! consistent within the coordination service's delivery window.

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use eg_common::EventType;
use eg_coordination::{
    CoordinationError, CoordinationService, CreateMode, WatchEvent, WatchEventKind, WatchHandler,
};
use eg_registry::{EventTypeRepository, RepositoryError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// The shared local map. Written by API calls and by the watch handler;
/// last write wins, which the eventual-consistency model tolerates.
struct LocalEntries {
    map: RwLock<HashMap<String, EventType>>,
}

impl LocalEntries {
    fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, name: &str) -> Option<EventType> {
        self.map.read().await.get(name).cloned()
    }

    async fn insert(&self, definition: EventType) {
        self.map
            .write()
            .await
            .insert(definition.name.clone(), definition);
    }

    async fn evict(&self, name: &str) {
        self.map.write().await.remove(name);
    }
}

/// Watch handler: reacts to remote node mutations by evicting the local
/// entry. Never reloads eagerly; the next `get` does that lazily. Runs on
/// the notification channel, concurrently with API calls.
struct CacheInvalidator {
    entries: Arc<LocalEntries>,
}

#[async_trait]
impl WatchHandler for CacheInvalidator {
    async fn on_event(&self, event: WatchEvent) {
        match event.kind {
            WatchEventKind::ChildCreated => {
                // Lazy load on the next get is sufficient.
                debug!(event_type = %event.child, "remote create observed");
            }
            WatchEventKind::ChildDataChanged | WatchEventKind::ChildDeleted => {
                debug!(event_type = %event.child, kind = ?event.kind, "evicting on watch event");
                self.entries.evict(&event.child).await;
            }
        }
    }
}

/// Per-instance metadata cache for event-type definitions.
///
/// Constructed once at instance startup and handed by `Arc` to every
/// request-handling path. Mutation methods assume the durable repository
/// already reflects the corresponding change; the cache only propagates the
/// invalidation and keeps its local map coherent.
pub struct EventTypeCache {
    entries: Arc<LocalEntries>,
    repository: Arc<dyn EventTypeRepository>,
    coordination: Arc<dyn CoordinationService>,
    config: CacheConfig,
}

impl EventTypeCache {
    pub fn new(
        repository: Arc<dyn EventTypeRepository>,
        coordination: Arc<dyn CoordinationService>,
        config: CacheConfig,
    ) -> Self {
        Self {
            entries: Arc::new(LocalEntries::new()),
            repository,
            coordination,
            config,
        }
    }

    /// Ensure the reserved namespace exists and register the process-wide
    /// children watcher. Idempotent: a pre-existing namespace is not an
    /// error, so any number of instances can initialize concurrently.
    pub async fn initialize(&self) -> Result<()> {
        self.coordination
            .ensure_path(&self.config.namespace)
            .await
            .map_err(CacheError::Initialization)?;

        let handler = Arc::new(CacheInvalidator {
            entries: self.entries.clone(),
        });
        self.coordination
            .watch_children(&self.config.namespace, handler)
            .await
            .map_err(CacheError::Initialization)?;

        info!(namespace = %self.config.namespace, "event type cache initialized");
        Ok(())
    }

    /// Return the definition for `name`, loading it from the repository on a
    /// local miss. Repository not-found is surfaced as
    /// [`CacheError::NoSuchEventType`] and is never cached, so a subsequent
    /// create is immediately visible.
    ///
    /// Concurrent misses for the same name may each trigger a load; the
    /// last insert wins and both callers see a valid definition.
    pub async fn get(&self, name: &str) -> Result<EventType> {
        if let Some(definition) = self.entries.get(name).await {
            return Ok(definition);
        }

        let definition = match self.repository.find_by_name(name).await {
            Ok(definition) => definition,
            Err(RepositoryError::NotFound(_)) => {
                return Err(CacheError::NoSuchEventType(name.to_string()));
            }
            Err(e) => return Err(CacheError::Repository(e)),
        };

        debug!(event_type = name, "loaded definition from repository");
        self.entries.insert(definition.clone()).await;
        Ok(definition)
    }

    /// Signal that `definition` was durably created. Creates the
    /// coordination node (idempotently, auto-creating the namespace if it is
    /// somehow absent), then installs the definition into the local map so
    /// the originating instance serves it without waiting for its own watch
    /// round-trip. The local map is untouched if the coordination write
    /// fails.
    pub async fn created(&self, definition: EventType) -> Result<()> {
        self.coordination.ensure_path(&self.config.namespace).await?;
        self.coordination
            .create_child(
                &self.config.namespace,
                &definition.name,
                &version_marker(),
                CreateMode::Persistent,
            )
            .await?;

        info!(event_type = %definition.name, "event type created");
        self.entries.insert(definition).await;
        Ok(())
    }

    /// Signal that the definition for `name` was durably updated. Evicts the
    /// local entry first (watch delivery to the origin instance is not
    /// guaranteed to be prompt or self-delivered), then rewrites the node
    /// marker so every other instance's watcher invalidates too. The node is
    /// created when missing.
    pub async fn updated(&self, name: &str) -> Result<()> {
        self.entries.evict(name).await;

        let path = self.node_path(name);
        match self.coordination.set_data(&path, &version_marker()).await {
            Ok(()) => {}
            Err(CoordinationError::NodeMissing(_)) => {
                self.coordination
                    .create_child(
                        &self.config.namespace,
                        name,
                        &version_marker(),
                        CreateMode::Persistent,
                    )
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }

        info!(event_type = name, "event type updated, invalidation propagated");
        Ok(())
    }

    /// Signal that the definition for `name` was durably removed. Deletes
    /// the coordination node (absence is success) and evicts the local
    /// entry. Remote instances converge once their watcher observes the
    /// deletion.
    pub async fn removed(&self, name: &str) -> Result<()> {
        self.coordination.delete(&self.node_path(name)).await?;
        self.entries.evict(name).await;

        info!(event_type = name, "event type removed");
        Ok(())
    }

    fn node_path(&self, name: &str) -> String {
        format!("{}/{}", self.config.namespace, name)
    }
}

/// Opaque node payload: a millisecond timestamp, monotone enough to serve as
/// a causally ordered version marker. Watchers never deserialize it as
/// business data.
fn version_marker() -> Vec<u8> {
    chrono::Utc::now()
        .timestamp_millis()
        .to_string()
        .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eg_common::{EventTypeCategory, EventTypeSchema};
    use eg_coordination::InMemoryCoordination;
    use eg_registry::InMemoryEventTypeRepository;

    fn definition(name: &str) -> EventType {
        EventType::new(
            name,
            EventTypeCategory::Business,
            EventTypeSchema::json_schema(r#"{ "price": 1000 }"#),
        )
    }

    async fn cache_fixture() -> (
        Arc<InMemoryEventTypeRepository>,
        Arc<InMemoryCoordination>,
        EventTypeCache,
    ) {
        let repository = Arc::new(InMemoryEventTypeRepository::new());
        let coordination = Arc::new(InMemoryCoordination::new());
        let cache = EventTypeCache::new(
            repository.clone(),
            coordination.clone(),
            CacheConfig::default(),
        );
        cache.initialize().await.unwrap();
        (repository, coordination, cache)
    }

    #[tokio::test]
    async fn initialize_creates_parent_path() {
        let (_, coordination, _) = cache_fixture().await;
        assert!(coordination.exists("/eventgate/event-types").await.unwrap());
    }

    #[tokio::test]
    async fn created_installs_node_and_definition() {
        let (repository, coordination, cache) = cache_fixture().await;
        let def = definition("order.created");

        cache.created(def.clone()).await.unwrap();

        // Immediately visible on the originating instance, no repository load.
        let got = cache.get("order.created").await.unwrap();
        assert_eq!(got, def);
        assert_eq!(repository.lookup_count(), 0);
        assert!(coordination
            .exists("/eventgate/event-types/order.created")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn created_is_idempotent() {
        let (_, _, cache) = cache_fixture().await;
        let def = definition("order.created");

        cache.created(def.clone()).await.unwrap();
        cache.created(def).await.unwrap();
    }

    #[tokio::test]
    async fn read_through_loads_exactly_once() {
        let (repository, _, cache) = cache_fixture().await;
        repository.put(definition("order.created"));

        cache.get("order.created").await.unwrap();
        cache.get("order.created").await.unwrap();

        assert_eq!(repository.lookup_count(), 1);
    }

    #[tokio::test]
    async fn miss_is_not_negatively_cached() {
        let (repository, _, cache) = cache_fixture().await;

        let err = cache.get("order.created").await.unwrap_err();
        assert!(matches!(err, CacheError::NoSuchEventType(_)));
        assert_eq!(repository.lookup_count(), 1);

        // A subsequent create is visible without any eviction logic.
        repository.put(definition("order.created"));
        cache.get("order.created").await.unwrap();
        assert_eq!(repository.lookup_count(), 2);
    }

    #[tokio::test]
    async fn update_invalidates_and_reloads() {
        let (repository, _, cache) = cache_fixture().await;
        repository.put(definition("order.created"));

        cache.get("order.created").await.unwrap();
        cache.updated("order.created").await.unwrap();
        cache.get("order.created").await.unwrap();

        assert_eq!(repository.lookup_count(), 2);
    }

    #[tokio::test]
    async fn update_rewrites_node_marker() {
        let (_, coordination, cache) = cache_fixture().await;
        cache.created(definition("order.created")).await.unwrap();

        let before = coordination
            .get_data("/eventgate/event-types/order.created")
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        cache.updated("order.created").await.unwrap();
        let after = coordination
            .get_data("/eventgate/event-types/order.created")
            .await
            .unwrap()
            .unwrap();

        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn update_creates_missing_node() {
        let (_, coordination, cache) = cache_fixture().await;

        // No created() beforehand: updated must install the node itself.
        cache.updated("order.created").await.unwrap();

        assert!(coordination
            .exists("/eventgate/event-types/order.created")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn remove_makes_absent() {
        let (repository, coordination, cache) = cache_fixture().await;
        let def = definition("order.created");
        repository.put(def.clone());

        cache.created(def).await.unwrap();
        cache.removed("order.created").await.unwrap();
        repository.remove("order.created");

        assert!(!coordination
            .exists("/eventgate/event-types/order.created")
            .await
            .unwrap());
        let err = cache.get("order.created").await.unwrap_err();
        assert!(matches!(err, CacheError::NoSuchEventType(_)));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_, _, cache) = cache_fixture().await;
        cache.removed("never-created").await.unwrap();
    }

    #[tokio::test]
    async fn full_lifecycle_scenario() {
        let (repository, coordination, cache) = cache_fixture().await;
        let def = definition("order.created");
        repository.put(def.clone());

        // created -> node exists at the reserved path
        cache.created(def.clone()).await.unwrap();
        assert!(coordination
            .exists("/eventgate/event-types/order.created")
            .await
            .unwrap());

        // get -> served from the create, zero repository calls
        assert_eq!(cache.get("order.created").await.unwrap(), def);
        assert_eq!(repository.lookup_count(), 0);

        // updated -> local entry cleared, node marker rewritten
        cache.updated("order.created").await.unwrap();

        // get -> exactly one repository call
        cache.get("order.created").await.unwrap();
        assert_eq!(repository.lookup_count(), 1);

        // removed -> node deleted, local entry cleared
        cache.removed("order.created").await.unwrap();
        repository.remove("order.created");

        let err = cache.get("order.created").await.unwrap_err();
        assert!(matches!(err, CacheError::NoSuchEventType(_)));
    }
}
