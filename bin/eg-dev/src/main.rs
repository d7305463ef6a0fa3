//! EventGate Development Monolith
//!
//! Simulates a two-instance broker cluster in one process: two event-type
//! caches share an in-memory coordination hub and repository, then walk the
//! full create / get / update / remove lifecycle to show cross-instance
//! invalidation converging.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LOG_FORMAT` | text | Set to `json` for JSON logs |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use eg_cache::{CacheConfig, EventTypeCache};
use eg_common::{EventType, EventTypeCategory, EventTypeSchema};
use eg_coordination::InMemoryCoordination;
use eg_registry::InMemoryEventTypeRepository;

#[tokio::main]
async fn main() -> Result<()> {
    eg_common::logging::init_logging("eg-dev");

    info!("Starting EventGate dev cluster (2 instances, in-memory coordination)");

    let repository = Arc::new(InMemoryEventTypeRepository::new());
    let coordination = Arc::new(InMemoryCoordination::new());

    let instance_a = EventTypeCache::new(
        repository.clone(),
        coordination.clone(),
        CacheConfig::default(),
    );
    let instance_b = EventTypeCache::new(
        repository.clone(),
        coordination.clone(),
        CacheConfig::default(),
    );

    instance_a.initialize().await?;
    instance_b.initialize().await?;

    let definition = EventType::new(
        "order.created",
        EventTypeCategory::Business,
        EventTypeSchema::json_schema(r#"{ "type": "object", "properties": { "price": { "type": "number" } } }"#),
    );

    // The API layer persists first, then signals the cache.
    repository.put(definition.clone());
    instance_a.created(definition.clone()).await?;
    info!(lookups = repository.lookup_count(), "created on A");

    let served = instance_a.get("order.created").await?;
    info!(category = %served.category, lookups = repository.lookup_count(), "A serves from local install");

    let served = instance_b.get("order.created").await?;
    info!(category = %served.category, lookups = repository.lookup_count(), "B read-through from repository");

    // Update on A; B converges once its watcher evicts the stale entry.
    repository.put(definition.clone());
    instance_a.updated("order.created").await?;
    info!("updated on A, waiting for B to reload");

    let baseline = repository.lookup_count();
    loop {
        instance_b.get("order.created").await?;
        if repository.lookup_count() > baseline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    info!(lookups = repository.lookup_count(), "B reloaded after invalidation");

    // Remove on A; B eventually reports the name as absent.
    instance_a.removed("order.created").await?;
    repository.remove("order.created");
    loop {
        match instance_b.get("order.created").await {
            Err(eg_cache::CacheError::NoSuchEventType(_)) => break,
            _ => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
    info!("B observes the removal, cluster converged");

    Ok(())
}
