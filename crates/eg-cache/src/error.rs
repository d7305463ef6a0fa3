//! Error types for the event-type cache

use eg_coordination::CoordinationError;
use eg_registry::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Neither the local cache nor the repository has the name. Never
    /// retried here; the caller decides.
    #[error("no such event type: {0}")]
    NoSuchEventType(String),

    /// The coordination service was unreachable during `initialize`, after
    /// the client's own retry policy was exhausted.
    #[error("cache initialization failed: {0}")]
    Initialization(CoordinationError),

    /// A coordination write failed during `created`/`updated`/`removed`.
    /// The local map is left unchanged, except for `updated`'s deliberate
    /// invalidation-first ordering.
    #[error("coordination error: {0}")]
    Coordination(#[from] CoordinationError),

    /// Any repository failure other than not-found, propagated unchanged.
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

pub type Result<T> = std::result::Result<T, CacheError>;
