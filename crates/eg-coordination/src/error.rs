//! Error types for the coordination service

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordinationError {
    #[error("coordination service unavailable: {0}")]
    Unavailable(String),

    #[error("node does not exist: {0}")]
    NodeMissing(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("watch payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoordinationError>;
