//! Embedding clients for turning queries into vectors
//!
//! Supports the Bedrock runtime (Titan text embeddings), OpenAI-compatible
//! and Ollama embedding APIs. Which one is used, and whether any is usable
//! at all, is decided once at startup by [`EmbeddingBackend::initialize`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use toolbox_core::{EmbeddingConfig, EmbeddingProvider, Result, ToolboxError};

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate the embedding for a single text.
    ///
    /// A response without an embedding is reported as
    /// [`ToolboxError::EmbeddingMissing`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, for logging
    fn model(&self) -> &str;
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ToolboxError::EmbeddingError(format!("Failed to build HTTP client: {e}")))
}

async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    format!("{status}: {text}")
}

// ============================================================================
// Bedrock Embedding Client
// ============================================================================

/// Bedrock runtime `InvokeModel` client for Titan text embeddings
pub struct BedrockEmbedding {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanEmbeddingRequest<'a> {
    input_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TitanEmbeddingResponse {
    embedding: Option<Vec<f32>>,
}

impl BedrockEmbedding {
    /// Create a client for the regional Bedrock runtime endpoint
    pub fn new(
        region: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            endpoint: format!("https://bedrock-runtime.{region}.amazonaws.com"),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Point the client at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config.bedrock_api_key.as_ref().ok_or_else(|| {
            ToolboxError::ConfigError("AWS_BEARER_TOKEN_BEDROCK is required for Bedrock".into())
        })?;

        let client = Self::new(
            &config.aws_region,
            api_key.clone(),
            config.model.clone(),
            config.timeout_secs,
        )?;

        Ok(match &config.base_url {
            Some(url) => client.with_endpoint(url.clone()),
            None => client,
        })
    }
}

#[async_trait]
impl EmbeddingClient for BedrockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/model/{}/invoke", self.endpoint, self.model))
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&TitanEmbeddingRequest { input_text: text })
            .send()
            .await
            .map_err(|e| ToolboxError::EmbeddingError(format!("Bedrock request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ToolboxError::EmbeddingError(format!(
                "Bedrock embedding error: {}",
                error_body(response).await
            )));
        }

        let result: TitanEmbeddingResponse = response.json().await.map_err(|e| {
            ToolboxError::EmbeddingError(format!("Failed to parse embedding response: {e}"))
        })?;

        result.embedding.ok_or(ToolboxError::EmbeddingMissing)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// OpenAI Embedding Client
// ============================================================================

/// OpenAI (or compatible) embedding API client
pub struct OpenAiEmbedding {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Option<Vec<f32>>,
}

impl OpenAiEmbedding {
    /// Create a new OpenAI embedding client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Set custom base URL (for Azure or compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ToolboxError::ConfigError("OpenAI API key required".to_string()))?;

        let client = Self::new(api_key.clone(), config.model.clone(), config.timeout_secs)?;
        Ok(match &config.base_url {
            Some(url) => client.with_base_url(url.clone()),
            None => client,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&OpenAiEmbeddingRequest {
                input: text,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| ToolboxError::EmbeddingError(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ToolboxError::EmbeddingError(format!(
                "OpenAI embedding error: {}",
                error_body(response).await
            )));
        }

        let result: OpenAiEmbeddingResponse = response.json().await.map_err(|e| {
            ToolboxError::EmbeddingError(format!("Failed to parse embedding response: {e}"))
        })?;

        result
            .data
            .into_iter()
            .next()
            .and_then(|d| d.embedding)
            .ok_or(ToolboxError::EmbeddingMissing)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Ollama Embedding Client
// ============================================================================

/// Ollama embedding API client
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Option<Vec<f32>>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| config.ollama_url.clone());
        Self::new(base_url, config.model.clone(), config.timeout_secs)
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&OllamaEmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| {
                ToolboxError::EmbeddingError(format!("Ollama embedding request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(ToolboxError::EmbeddingError(format!(
                "Ollama embedding error: {}",
                error_body(response).await
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            ToolboxError::EmbeddingError(format!("Failed to parse embedding response: {e}"))
        })?;

        result.embedding.ok_or(ToolboxError::EmbeddingMissing)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Factory and availability
// ============================================================================

/// Create an embedding client from config
pub fn create_embedding_client(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingClient>> {
    match config.provider {
        EmbeddingProvider::Bedrock => Ok(Box::new(BedrockEmbedding::from_config(config)?)),
        EmbeddingProvider::OpenAI => Ok(Box::new(OpenAiEmbedding::from_config(config)?)),
        EmbeddingProvider::Ollama => Ok(Box::new(OllamaEmbedding::from_config(config)?)),
    }
}

/// Outcome of the one-time embedding backend initialization.
///
/// Built once at startup and handed to the retriever; a backend that failed
/// to initialize stays unavailable for the life of the process.
#[derive(Clone)]
pub enum EmbeddingBackend {
    Available(Arc<dyn EmbeddingClient>),
    Unavailable { reason: String },
}

impl EmbeddingBackend {
    /// Build the configured client, logging the outcome
    pub fn initialize(config: &EmbeddingConfig) -> Self {
        match create_embedding_client(config) {
            Ok(client) => {
                tracing::info!(
                    provider = %config.provider,
                    model = %config.model,
                    "Embedding backend initialized"
                );
                Self::Available(Arc::from(client))
            }
            Err(e) => {
                tracing::warn!(
                    provider = %config.provider,
                    error = %e,
                    "Embedding backend unavailable; retrieval will return no results"
                );
                Self::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Wrap an already constructed client
    pub fn available(client: Arc<dyn EmbeddingClient>) -> Self {
        Self::Available(client)
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn client(&self) -> Option<&Arc<dyn EmbeddingClient>> {
        match self {
            Self::Available(client) => Some(client),
            Self::Unavailable { .. } => None,
        }
    }
}

impl std::fmt::Debug for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(client) => f
                .debug_tuple("Available")
                .field(&client.model())
                .finish(),
            Self::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
