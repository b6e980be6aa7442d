//! PostgreSQL + pgvector chunk store
//!
//! Opens a fresh connection per retrieval call and runs the similarity query
//! inside an explicit transaction, so a failure mid-query leaves something
//! for [`ChunkConnection::rollback`] to undo.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use toolbox_core::{DatabaseConfig, Result, ToolboxError};

use crate::store::{ChunkConnection, ChunkRow, ChunkStore};

/// pgvector-backed chunk store
pub struct PgVectorStore {
    options: PgConnectOptions,
    search_sql: String,
    label: String,
}

impl PgVectorStore {
    /// Create a store from connection settings; nothing is opened until `acquire`
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        Self {
            options,
            search_sql: search_sql(&config.schema, &config.table),
            label: format!("{}@{}:{}", config.name, config.host, config.port),
        }
    }

    /// The similarity query issued by every connection
    pub fn search_sql(&self) -> &str {
        &self.search_sql
    }
}

#[async_trait]
impl ChunkStore for PgVectorStore {
    async fn acquire(&self) -> Result<Box<dyn ChunkConnection>> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| ToolboxError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        tracing::info!(database = %self.label, "Connected to database");

        Ok(Box::new(PgChunkConnection {
            conn,
            search_sql: self.search_sql.clone(),
            in_transaction: false,
        }))
    }

    fn name(&self) -> &str {
        &self.label
    }
}

struct PgChunkConnection {
    conn: PgConnection,
    search_sql: String,
    in_transaction: bool,
}

#[async_trait]
impl ChunkConnection for PgChunkConnection {
    async fn nearest(&mut self, embedding: &[f32], limit: usize) -> Result<Vec<ChunkRow>> {
        let limit = i64::try_from(limit)
            .map_err(|_| ToolboxError::InvalidArgument(format!("limit too large: {limit}")))?;

        self.conn
            .execute("BEGIN")
            .await
            .map_err(|e| ToolboxError::DatabaseError(format!("Failed to begin transaction: {e}")))?;
        self.in_transaction = true;

        let rows: Vec<ChunkRow> = sqlx::query_as(&self.search_sql)
            .bind(vector_literal(embedding))
            .bind(limit)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| ToolboxError::DatabaseError(format!("Similarity search failed: {e}")))?;

        self.conn
            .execute("COMMIT")
            .await
            .map_err(|e| ToolboxError::DatabaseError(format!("Failed to commit: {e}")))?;
        self.in_transaction = false;

        Ok(rows)
    }

    async fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }

        self.conn
            .execute("ROLLBACK")
            .await
            .map_err(|e| ToolboxError::DatabaseError(format!("Rollback failed: {e}")))?;
        self.in_transaction = false;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| ToolboxError::DatabaseError(format!("Failed to close connection: {e}")))
    }
}

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Render an embedding in pgvector's text input format, e.g. `[0.1,0.2]`
pub fn vector_literal(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn search_sql(schema: &str, table: &str) -> String {
    format!(
        r#"
        SELECT chunk_id::text AS chunk_id,
               filename,
               content,
               (embedding <=> $1::text::vector)::float8 AS distance
        FROM {}.{}
        ORDER BY distance ASC
        LIMIT $2
        "#,
        quote_identifier(schema),
        quote_identifier(table)
    )
}

// ============================================================================
// Tests
// ============================================================================
