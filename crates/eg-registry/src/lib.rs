//! Durable Event-Type Repository
//!
//! The authoritative store of event-type definitions, keyed by name. The
//! metadata cache reads through this repository on a local miss; it never
//! writes through it. The repository is assumed strongly consistent.

pub mod store;

use async_trait::async_trait;
use eg_common::EventType;
use thiserror::Error;

pub use store::{InMemoryEventTypeRepository, MongoEventTypeRepository};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("no such event type: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Read interface to the durable store.
#[async_trait]
pub trait EventTypeRepository: Send + Sync {
    /// Look up a definition by its globally unique name.
    ///
    /// Fails with [`RepositoryError::NotFound`] when no such name is
    /// persisted; any other failure is a backend error.
    async fn find_by_name(&self, name: &str) -> Result<EventType>;
}
