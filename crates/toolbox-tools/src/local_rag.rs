//! Local RAG server: semantic search over a pgvector table

use serde_json::json;
use std::sync::Arc;
use toolbox_core::{AppConfig, RagConfig};
use toolbox_mcp::{args, McpServer, Registry, ToolDefinition};
use toolbox_rag::{format_results, EmbeddingBackend, PgVectorStore, Retriever};

pub const SERVER_NAME: &str = "local-rag-server";

/// Build the retriever from configuration. Embedding availability is
/// decided here, once.
pub fn retriever(config: &AppConfig) -> Retriever {
    let backend = EmbeddingBackend::initialize(&config.embedding);
    let store = PgVectorStore::new(&config.database);
    Retriever::new(backend, Arc::new(store))
}

pub fn register(registry: &mut Registry, retriever: Arc<Retriever>, rag: RagConfig) {
    registry.tool(
        ToolDefinition::new(
            "search_local_rag_knowledge_base",
            "Search the knowledge base",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The query to search the knowledge base with"
                    }
                },
                "required": ["query"]
            }),
        ),
        move |arguments| {
            let retriever = retriever.clone();
            let rag = rag.clone();
            async move {
                let query = args::required_str(&arguments, "query")?;
                let results = retriever.answer_query(query, rag.tool_top_n).await;
                Ok(format_results(&results, rag.preview_chars))
            }
        },
    );
}

pub fn server(config: &AppConfig, retriever: Arc<Retriever>) -> McpServer {
    let mut registry = Registry::new();
    register(&mut registry, retriever, config.rag.clone());
    McpServer::new(crate::server_info(config, SERVER_NAME), registry)
}
