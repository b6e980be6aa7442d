//! Chunk store abstraction
//!
//! A store hands out one connection per retrieval call. The caller owns the
//! connection for the duration of the call and must `close` it on every exit
//! path; `close` consumes the connection so it cannot be used afterwards.

use async_trait::async_trait;
use sqlx::FromRow;
use toolbox_core::{Result, RetrievedChunk, ScoredResult};

/// Raw row produced by a similarity query
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ChunkRow {
    pub chunk_id: String,
    pub filename: String,
    pub content: String,

    /// Cosine distance to the query vector (lower is closer)
    pub distance: f64,
}

impl From<ChunkRow> for ScoredResult {
    fn from(row: ChunkRow) -> Self {
        ScoredResult::from_distance(
            RetrievedChunk {
                chunk_id: row.chunk_id,
                filename: row.filename,
                content: row.content,
            },
            row.distance,
        )
    }
}

/// Source of per-call connections to a vector-indexed chunk table
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Open a new connection
    async fn acquire(&self) -> Result<Box<dyn ChunkConnection>>;

    /// Store name for logging
    fn name(&self) -> &str;
}

/// A scoped connection to a chunk store
#[async_trait]
pub trait ChunkConnection: Send {
    /// Rows ordered by ascending distance to `embedding`, at most `limit`
    async fn nearest(&mut self, embedding: &[f32], limit: usize) -> Result<Vec<ChunkRow>>;

    /// Roll back whatever transaction a failed `nearest` left open
    async fn rollback(&mut self) -> Result<()>;

    /// Release the connection
    async fn close(self: Box<Self>) -> Result<()>;
}
