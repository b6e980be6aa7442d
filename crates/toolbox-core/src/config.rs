//! Toolbox Configuration Management
//!
//! Handles configuration from environment variables and TOML files,
//! with defaults that match a local development setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Placeholder written over secrets when a config is displayed
pub const REDACTED: &str = "********";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// MCP server identity
    pub server: ServerConfig,

    /// pgvector connection
    pub database: DatabaseConfig,

    /// Embedding service
    pub embedding: EmbeddingConfig,

    /// Retrieval path tuning
    pub rag: RagConfig,

    /// Quotes data source
    pub quotes: QuotesConfig,

    /// Public and hosted HTTP APIs
    pub apis: ApiConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// `from_env` is this function over `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_lookup_override(lookup)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_lookup_override(|key| std::env::var(key).ok())
    }

    /// Overwrite every field whose key is present in `lookup`
    ///
    /// Blank values (`KEY=` in a `.env` template) count as unset.
    pub fn with_lookup_override<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        // Server
        if let Some(name) = lookup("SERVER_NAME") {
            self.server.name = Some(name);
        }
        if let Some(version) = lookup("SERVER_VERSION") {
            self.server.version = version;
        }

        // PostgreSQL / pgvector
        if let Some(name) = lookup("PGVECTOR_DB_NAME") {
            self.database.name = name;
        }
        if let Some(user) = lookup("PGVECTOR_DB_USER") {
            self.database.user = user;
        }
        if let Some(password) = lookup("PGVECTOR_DB_PASSWORD") {
            self.database.password = password;
        }
        if let Some(host) = lookup("PGVECTOR_DB_HOST") {
            self.database.host = host;
        }
        if let Some(port) = lookup("PGVECTOR_DB_PORT") {
            self.database.port = parse_value("PGVECTOR_DB_PORT", port)?;
        }
        if let Some(schema) = lookup("PGVECTOR_DB_SCHEMA") {
            self.database.schema = schema;
        }
        if let Some(table) = lookup("PGVECTOR_DB_TABLE") {
            self.database.table = table;
        }

        // Embedding
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(url) = lookup("EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(url);
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.embedding.aws_region = region.clone();
            self.apis.knowledge_base_region = Some(region);
        }
        if let Some(token) = lookup("AWS_BEARER_TOKEN_BEDROCK") {
            self.embedding.bedrock_api_key = Some(token.clone());
            self.apis.knowledge_base_api_key = Some(token);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.embedding.openai_api_key = Some(key);
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.embedding.ollama_url = url;
        }

        // Retrieval
        if let Some(top_n) = lookup("RAG_TOOL_TOP_N") {
            self.rag.tool_top_n = match parse_value("RAG_TOOL_TOP_N", top_n.clone())? {
                0 => {
                    return Err(ConfigError::InvalidValue {
                        key: "RAG_TOOL_TOP_N".to_string(),
                        value: top_n,
                    })
                }
                n => n,
            };
        }

        // Quotes
        if let Some(path) = lookup("QUOTES_PATH") {
            self.quotes.path = PathBuf::from(path);
        }

        // HTTP APIs
        if let Some(url) = lookup("POLITIET_API_URL") {
            self.apis.politiet_url = url;
        }
        if let Some(key) = lookup("ALPHAVANTAGE_API_KEY") {
            self.apis.alphavantage_api_key = Some(key);
        }
        if let Some(url) = lookup("ALPHAVANTAGE_URL") {
            self.apis.alphavantage_url = url;
        }
        if let Some(id) = lookup("KNOWLEDGE_BASE_ID") {
            self.apis.knowledge_base_id = Some(id);
        }
        if let Some(url) = lookup("KNOWLEDGE_BASE_ENDPOINT") {
            self.apis.knowledge_base_endpoint = Some(url);
        }
        if let Some(secs) = lookup("HTTP_TIMEOUT_SECS") {
            self.apis.timeout_secs = parse_value("HTTP_TIMEOUT_SECS", secs)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(self)
    }

    /// Copy of this config with passwords and API keys masked
    pub fn redacted(&self) -> Self {
        fn mask(secret: &Option<String>) -> Option<String> {
            secret.as_ref().map(|_| REDACTED.to_string())
        }

        let mut config = self.clone();
        config.database.password = REDACTED.to_string();
        config.embedding.bedrock_api_key = mask(&self.embedding.bedrock_api_key);
        config.embedding.openai_api_key = mask(&self.embedding.openai_api_key);
        config.apis.alphavantage_api_key = mask(&self.apis.alphavantage_api_key);
        config.apis.knowledge_base_api_key = mask(&self.apis.knowledge_base_api_key);
        config
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }
}

fn parse_value<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// MCP server identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Overrides the per-server default name in `initialize` responses
    pub name: Option<String>,

    /// Version reported in `initialize` responses
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: None,
            version: "0.1.0".to_string(),
        }
    }
}

/// PostgreSQL (pgvector) connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,

    /// Schema holding the chunk table
    pub schema: String,

    /// Table with `chunk_id`, `filename`, `content` and `embedding` columns
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "vectordb".to_string(),
            user: "my_username".to_string(),
            password: "my_password".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            schema: "embeddings".to_string(),
            table: "documents".to_string(),
        }
    }
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which embedding API to call
    pub provider: EmbeddingProvider,

    /// Model identifier sent with each request
    pub model: String,

    /// Overrides the provider's endpoint (proxies, tests)
    pub base_url: Option<String>,

    /// Region used to build the Bedrock runtime endpoint
    pub aws_region: String,

    /// Bedrock API key (bearer token)
    pub bedrock_api_key: Option<String>,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Bedrock,
            model: "amazon.titan-embed-text-v2:0".to_string(),
            base_url: None,
            aws_region: "eu-west-1".to_string(),
            bedrock_api_key: None,
            openai_api_key: None,
            ollama_url: "http://localhost:11434".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Bedrock,
    OpenAI,
    Ollama,
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bedrock => write!(f, "bedrock"),
            Self::OpenAI => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bedrock" | "aws" => Ok(Self::Bedrock),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "EMBEDDING_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Retrieval path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Results returned by the `search_local_rag_knowledge_base` tool
    pub tool_top_n: usize,

    /// Results returned by `toolbox query` when `--top-n` is omitted
    pub default_top_n: usize,

    /// Characters of chunk content shown per formatted result
    pub preview_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            tool_top_n: 3,
            default_top_n: 5,
            preview_chars: 250,
        }
    }
}

/// Quotes data source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    /// JSON file shaped as `{"quotes": [{"quote": ..., "author": ...}]}`
    pub path: PathBuf,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/motivational_quotes.json"),
        }
    }
}

/// HTTP API endpoints and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Police log messages endpoint
    pub politiet_url: String,

    /// Alpha Vantage query endpoint
    pub alphavantage_url: String,

    pub alphavantage_api_key: Option<String>,

    /// Hosted knowledge base identifier
    pub knowledge_base_id: Option<String>,

    /// Region of the hosted knowledge base
    pub knowledge_base_region: Option<String>,

    /// Overrides the regional agent-runtime endpoint
    pub knowledge_base_endpoint: Option<String>,

    pub knowledge_base_api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            politiet_url: "https://api.politiet.no/politiloggen/v1/messages".to_string(),
            alphavantage_url: "https://www.alphavantage.co/query".to_string(),
            alphavantage_api_key: None,
            knowledge_base_id: None,
            knowledge_base_region: None,
            knowledge_base_endpoint: None,
            knowledge_base_api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.name, "vectordb");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.schema, "embeddings");
        assert_eq!(config.database.table, "documents");
        assert_eq!(config.embedding.provider, EmbeddingProvider::Bedrock);
        assert_eq!(config.embedding.aws_region, "eu-west-1");
        assert_eq!(config.rag.tool_top_n, 3);
        assert!(config.apis.knowledge_base_region.is_none());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PGVECTOR_DB_NAME", "chunks"),
            ("PGVECTOR_DB_PORT", "6543"),
            ("EMBEDDING_PROVIDER", "ollama"),
            ("AWS_REGION", "us-east-1"),
            ("ALPHAVANTAGE_API_KEY", "demo"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.database.name, "chunks");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Ollama);
        assert_eq!(config.embedding.aws_region, "us-east-1");
        assert_eq!(config.apis.knowledge_base_region.as_deref(), Some("us-east-1"));
        assert_eq!(config.apis.alphavantage_api_key.as_deref(), Some("demo"));
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("PGVECTOR_DB_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PGVECTOR_DB_PORT"));

        let err = AppConfig::from_lookup(lookup_from(&[("RAG_TOOL_TOP_N", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "RAG_TOOL_TOP_N"));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("KNOWLEDGE_BASE_ID", ""),
            ("AWS_REGION", ""),
            ("ALPHAVANTAGE_API_KEY", "  "),
            ("AWS_BEARER_TOKEN_BEDROCK", ""),
            ("SERVER_NAME", ""),
            ("PGVECTOR_DB_PORT", ""),
            ("PGVECTOR_DB_NAME", ""),
        ]))
        .unwrap();

        assert!(config.apis.knowledge_base_id.is_none());
        assert!(config.apis.knowledge_base_region.is_none());
        assert!(config.apis.knowledge_base_api_key.is_none());
        assert!(config.apis.alphavantage_api_key.is_none());
        assert!(config.server.name.is_none());
        assert_eq!(config.embedding.aws_region, "eu-west-1");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.name, "vectordb");
    }

    #[test]
    fn test_embedding_provider_parse() {
        assert_eq!(
            "bedrock".parse::<EmbeddingProvider>().unwrap(),
            EmbeddingProvider::Bedrock
        );
        assert_eq!(
            "OpenAI".parse::<EmbeddingProvider>().unwrap(),
            EmbeddingProvider::OpenAI
        );
        assert!("invalid".parse::<EmbeddingProvider>().is_err());
    }

    #[test]
    fn test_file_then_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
host = "db.internal"
table = "chunks"

[rag]
preview_chars = 80
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path())
            .unwrap()
            .with_lookup_override(lookup_from(&[("PGVECTOR_DB_HOST", "override")]))
            .unwrap();

        assert_eq!(config.database.host, "override");
        assert_eq!(config.database.table, "chunks");
        assert_eq!(config.database.name, "vectordb");
        assert_eq!(config.rag.preview_chars, 80);
        assert_eq!(config.rag.tool_top_n, 3);
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file("/nonexistent/toolbox.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-secret"),
            ("PGVECTOR_DB_PASSWORD", "hunter2"),
        ]))
        .unwrap()
        .redacted();

        assert_eq!(config.database.password, REDACTED);
        assert_eq!(config.embedding.openai_api_key.as_deref(), Some(REDACTED));
        assert!(config.apis.alphavantage_api_key.is_none());

        let rendered = config.to_toml().unwrap();
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("hunter2"));
    }
}
