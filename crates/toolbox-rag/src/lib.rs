//! Toolbox RAG - Retrieval query path
//!
//! Turns a free-text query into an ordered list of scored chunks:
//! 1. Embed the query with the configured embedding service
//! 2. Run a nearest-neighbour query over a pgvector table on a fresh connection
//! 3. Map distances to similarity scores
//! 4. Release the connection
//!
//! Every failure along the way is logged and turns into an empty result;
//! nothing is retried and nothing propagates to the caller.

use async_trait::async_trait;
use std::sync::Arc;
use toolbox_core::ScoredResult;

pub mod embedding;
pub mod format;
pub mod pgvector;
pub mod store;

pub use embedding::{
    create_embedding_client, BedrockEmbedding, EmbeddingBackend, EmbeddingClient,
    OllamaEmbedding, OpenAiEmbedding,
};
pub use format::{format_results, DEFAULT_PREVIEW_CHARS};
pub use pgvector::PgVectorStore;
pub use store::{ChunkConnection, ChunkRow, ChunkStore};

// ============================================================================
// Reranking
// ============================================================================

/// Second-stage scoring over retrieved results
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, results: Vec<ScoredResult>) -> Vec<ScoredResult>;
}

/// Returns results untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughReranker;

#[async_trait]
impl Reranker for PassthroughReranker {
    async fn rerank(&self, _query: &str, results: Vec<ScoredResult>) -> Vec<ScoredResult> {
        tracing::debug!("Skipping re-ranking step");
        results
    }
}

// ============================================================================
// Retriever
// ============================================================================

/// The retrieval query path
pub struct Retriever {
    backend: EmbeddingBackend,
    store: Arc<dyn ChunkStore>,
    reranker: Arc<dyn Reranker>,
}

impl Retriever {
    /// Create a retriever over an initialized backend and a chunk store
    pub fn new(backend: EmbeddingBackend, store: Arc<dyn ChunkStore>) -> Self {
        Self {
            backend,
            store,
            reranker: Arc::new(PassthroughReranker),
        }
    }

    /// Replace the reranking stage
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    pub fn backend(&self) -> &EmbeddingBackend {
        &self.backend
    }

    /// Retrieve the `top_n` chunks closest to `query`, best first.
    ///
    /// Returns an empty list for an empty query or `top_n == 0` without
    /// touching any external service, and on any embedding or database
    /// failure.
    pub async fn retrieve(&self, query: &str, top_n: usize) -> Vec<ScoredResult> {
        if query.is_empty() {
            tracing::warn!("Query is empty. Cannot retrieve chunks.");
            return Vec::new();
        }
        if top_n == 0 {
            tracing::warn!("top_n is zero. Nothing to retrieve.");
            return Vec::new();
        }

        let Some(client) = self.backend.client() else {
            tracing::error!("Embedding backend not available for query embedding");
            return Vec::new();
        };

        tracing::info!(model = client.model(), "Creating query embedding");
        let embedding = match client.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create query embedding");
                return Vec::new();
            }
        };

        let mut conn = match self.store.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(store = self.store.name(), error = %e, "Failed to get database connection for retrieval");
                return Vec::new();
            }
        };

        let rows = match conn.nearest(&embedding, top_n).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "Database error during retrieval");
                if let Err(e) = conn.rollback().await {
                    tracing::warn!(error = %e, "Rollback after failed retrieval also failed");
                }
                Vec::new()
            }
        };

        match conn.close().await {
            Ok(()) => tracing::debug!("Database connection closed after retrieval"),
            Err(e) => tracing::warn!(error = %e, "Failed to close database connection"),
        }

        let results: Vec<ScoredResult> = rows
            .into_iter()
            .take(top_n)
            .map(ScoredResult::from)
            .collect();
        tracing::info!(count = results.len(), "Retrieved chunks from database");
        results
    }

    /// Retrieve and rerank; the entry point used by the RAG tool
    pub async fn answer_query(&self, query: &str, top_n: usize) -> Vec<ScoredResult> {
        tracing::info!(query = %query, top_n, "Answering query");

        let retrieved = self.retrieve(query, top_n).await;
        if retrieved.is_empty() {
            tracing::warn!("No chunks retrieved for the query");
            return retrieved;
        }

        self.reranker.rerank(query, retrieved).await
    }
}
