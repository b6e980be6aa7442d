//! Toolbox Core - Shared types for the tool servers
//!
//! This crate defines what every other toolbox crate agrees on:
//! - Common error type
//! - Retrieval domain models (chunks and scored results)
//! - Configuration management

pub mod config;

pub use config::{
    ApiConfig, AppConfig, ConfigError, DatabaseConfig, EmbeddingConfig, EmbeddingProvider,
    LoggingConfig, QuotesConfig, RagConfig, ServerConfig,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error type for toolbox operations
#[derive(Error, Debug)]
pub enum ToolboxError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Embedding response did not contain an embedding")]
    EmbeddingMissing,

    #[error("Upstream API error: {0}")]
    UpstreamError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for ToolboxError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ToolboxError>;

// ============================================================================
// Retrieval Types
// ============================================================================

/// A stored unit of text returned by similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Opaque identifier from the store
    pub chunk_id: String,

    /// Source document the chunk was cut from
    pub filename: String,

    /// Text content
    pub content: String,
}

impl RetrievedChunk {
    pub fn new(
        chunk_id: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// A chunk with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// `1 - cosine distance`, never below 0.0
    pub score: f64,

    pub chunk: RetrievedChunk,
}

impl ScoredResult {
    /// Build a result from a cosine distance reported by the store
    pub fn from_distance(chunk: RetrievedChunk, distance: f64) -> Self {
        Self {
            score: similarity_from_distance(distance),
            chunk,
        }
    }
}

/// Convert a cosine distance into a similarity score floored at zero
pub fn similarity_from_distance(distance: f64) -> f64 {
    (1.0 - distance).max(0.0)
}

// ============================================================================
// Tests
// ============================================================================
