//! Hosted knowledge-base search (Bedrock agent runtime `Retrieve`)
//!
//! Configuration problems and upstream failures come back as `Error...`
//! text so the calling model can relay them.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use toolbox_core::{ApiConfig, AppConfig, Result, ToolboxError};
use toolbox_mcp::{args, McpServer, Registry, ToolDefinition};

pub const SERVER_NAME: &str = "aws-knowledgebase-test";

pub const NO_RESULTS: &str = "No relevant information found in the knowledge base.";

/// Environment variables the knowledge-base tool cannot work without
pub fn missing_settings(apis: &ApiConfig) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if configured(&apis.knowledge_base_id).is_none() {
        missing.push("KNOWLEDGE_BASE_ID");
    }
    if configured(&apis.knowledge_base_region).is_none() {
        missing.push("AWS_REGION");
    }
    missing
}

fn configured(setting: &Option<String>) -> Option<&str> {
    setting.as_deref().filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveRequest<'a> {
    retrieval_query: RetrievalQuery<'a>,
}

#[derive(Debug, Serialize)]
struct RetrievalQuery<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    #[serde(default)]
    pub retrieval_results: Vec<RetrievalResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetrievalResult {
    #[serde(default)]
    pub content: Option<RetrievalContent>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetrievalContent {
    #[serde(default)]
    pub text: Option<String>,
}

/// Render retrieval results in the layout the tool returns
pub fn format_retrieval(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let content = result
                .content
                .as_ref()
                .and_then(|c| c.text.as_deref())
                .unwrap_or("N/A");
            let score = match &result.score {
                Some(Value::Null) | None => "N/A".to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            let location = match &result.location {
                Some(Value::Object(map)) if !map.is_empty() => Value::Object(map.clone()).to_string(),
                _ => "N/A".to_string(),
            };
            format!(
                "Result {} (Score: {score}):\nContent: {content}\nLocation: {location}\n---",
                i + 1
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Client for the `Retrieve` API of one knowledge base
pub struct KnowledgeBaseClient {
    client: Client,
    endpoint: String,
    knowledge_base_id: String,
    api_key: Option<String>,
}

impl KnowledgeBaseClient {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        knowledge_base_id: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            knowledge_base_id: knowledge_base_id.into(),
            api_key,
        }
    }

    /// Build from configuration; a missing setting is a `ConfigError`
    pub fn from_config(apis: &ApiConfig) -> Result<Self> {
        let knowledge_base_id = configured(&apis.knowledge_base_id).ok_or_else(|| {
            ToolboxError::ConfigError("KNOWLEDGE_BASE_ID environment variable not set.".into())
        })?;
        let region = configured(&apis.knowledge_base_region).ok_or_else(|| {
            ToolboxError::ConfigError(
                "AWS_REGION environment variable not set (required for Bedrock client).".into(),
            )
        })?;
        let endpoint = configured(&apis.knowledge_base_endpoint)
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://bedrock-agent-runtime.{region}.amazonaws.com"));
        let client = crate::http_client(apis.timeout_secs)?;

        Ok(Self::new(
            client,
            endpoint,
            knowledge_base_id,
            apis.knowledge_base_api_key.clone(),
        ))
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        let mut request = self
            .client
            .post(format!(
                "{}/knowledgebases/{}/retrieve",
                self.endpoint, self.knowledge_base_id
            ))
            .header("Accept", "application/json")
            .json(&RetrieveRequest {
                retrieval_query: RetrievalQuery { text: query },
            });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolboxError::UpstreamError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolboxError::UpstreamError(format!("{status}: {body}")));
        }

        let parsed: RetrieveResponse = response
            .json()
            .await
            .map_err(|e| ToolboxError::UpstreamError(format!("Invalid retrieve response: {e}")))?;
        Ok(parsed.retrieval_results)
    }

    /// Retrieve and format; never fails
    pub async fn search(&self, query: &str) -> String {
        match self.retrieve(query).await {
            Ok(results) => {
                tracing::info!(count = results.len(), "Knowledge base search completed");
                format_retrieval(&results)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Knowledge base retrieve failed");
                format!("Error calling Bedrock Retrieve API: {e}")
            }
        }
    }
}

/// Text the tool answers with when the client could not be built
fn unavailable(error: &ToolboxError) -> String {
    match error {
        ToolboxError::ConfigError(message) => format!("Error: {message}"),
        other => format!("Error: {other}"),
    }
}

/// Register the search tool. The client is built once; a server started
/// without the settings still answers every call with an explanation.
pub fn register(registry: &mut Registry, apis: &ApiConfig) {
    let client = KnowledgeBaseClient::from_config(apis)
        .map(Arc::new)
        .map_err(|e| unavailable(&e));
    registry.tool(
        ToolDefinition::new(
            "search_knowledge_base",
            "Search the AWS Bedrock knowledge base for the most relevant information.",
            json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        ),
        move |arguments| {
            let client = client.clone();
            async move {
                let query = args::required_str(&arguments, "query")?;
                match client {
                    Ok(client) => Ok(client.search(query).await),
                    Err(message) => Ok(message),
                }
            }
        },
    );
}

pub fn server(config: &AppConfig) -> McpServer {
    let missing = missing_settings(&config.apis);
    if !missing.is_empty() {
        tracing::warn!(
            missing = %missing.join(", "),
            "Missing required environment variables; search_knowledge_base will report an error"
        );
    }

    let mut registry = Registry::new();
    register(&mut registry, &config.apis);
    McpServer::new(crate::server_info(config, SERVER_NAME), registry)
}
