//! Repository backends

use crate::{EventTypeRepository, RepositoryError, Result};
use async_trait::async_trait;
use eg_common::EventType;
use mongodb::bson::doc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

// ============================================================================
// MongoDB Repository
// ============================================================================

pub struct MongoEventTypeRepository {
    collection: mongodb::Collection<EventType>,
}

impl MongoEventTypeRepository {
    pub fn new(client: mongodb::Client, db_name: &str, collection_name: &str) -> Self {
        let db = client.database(db_name);
        Self {
            collection: db.collection(collection_name),
        }
    }
}

#[async_trait]
impl EventTypeRepository for MongoEventTypeRepository {
    async fn find_by_name(&self, name: &str) -> Result<EventType> {
        let filter = doc! { "name": name };
        let definition = self.collection.find_one(filter).await?;

        definition.ok_or_else(|| RepositoryError::NotFound(name.to_string()))
    }
}

// ============================================================================
// In-Memory Repository (for testing/development)
// ============================================================================

/// In-process repository with a lookup counter.
///
/// The counter makes read-through behavior observable: tests assert how many
/// repository loads a cache operation triggered.
pub struct InMemoryEventTypeRepository {
    definitions: RwLock<HashMap<String, EventType>>,
    lookups: AtomicUsize,
}

impl InMemoryEventTypeRepository {
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Persist or replace a definition.
    pub fn put(&self, definition: EventType) {
        self.definitions
            .write()
            .insert(definition.name.clone(), definition);
    }

    pub fn remove(&self, name: &str) {
        self.definitions.write().remove(name);
    }

    /// Total number of `find_by_name` calls, hits and misses alike.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryEventTypeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventTypeRepository for InMemoryEventTypeRepository {
    async fn find_by_name(&self, name: &str) -> Result<EventType> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        debug!(name, "repository lookup");

        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eg_common::{EventTypeCategory, EventTypeSchema};

    fn definition(name: &str) -> EventType {
        EventType::new(
            name,
            EventTypeCategory::Business,
            EventTypeSchema::json_schema(r#"{ "price": 1000 }"#),
        )
    }

    #[tokio::test]
    async fn finds_persisted_definition() {
        let repo = InMemoryEventTypeRepository::new();
        repo.put(definition("order.created"));

        let found = repo.find_by_name("order.created").await.unwrap();
        assert_eq!(found.name, "order.created");
        assert_eq!(repo.lookup_count(), 1);
    }

    #[tokio::test]
    async fn missing_name_is_not_found() {
        let repo = InMemoryEventTypeRepository::new();

        let err = repo.find_by_name("order.created").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
        assert_eq!(repo.lookup_count(), 1);
    }

    #[tokio::test]
    async fn removed_definition_is_not_found() {
        let repo = InMemoryEventTypeRepository::new();
        repo.put(definition("order.created"));
        repo.remove("order.created");

        let err = repo.find_by_name("order.created").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
