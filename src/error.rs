// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HybridDbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage failure: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, HybridDbError>;
