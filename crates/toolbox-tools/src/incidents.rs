//! Norwegian police incident log
//!
//! Both tools return the upstream body verbatim. Upstream failures are
//! returned as text rather than as tool errors so the model sees them.

use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use toolbox_core::{AppConfig, Result, ToolboxError};
use toolbox_mcp::{args, McpServer, Registry, ToolDefinition};

pub const SERVER_NAME: &str = "police-incidents";

/// Client for the politiloggen messages endpoint
#[derive(Clone)]
pub struct IncidentsClient {
    client: Client,
    url: String,
}

impl IncidentsClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = crate::http_client(config.apis.timeout_secs)?;
        Ok(Self::new(client, config.apis.politiet_url.clone()))
    }

    /// Latest incidents across all municipalities
    pub async fn latest(&self) -> Result<String> {
        self.fetch(None).await
    }

    /// Latest incidents for one municipality
    pub async fn by_municipality(&self, municipality: &str) -> Result<String> {
        self.fetch(Some(municipality)).await
    }

    async fn fetch(&self, municipality: Option<&str>) -> Result<String> {
        let mut request = self.client.get(&self.url).header("accept", "text/plain");
        if let Some(municipality) = municipality {
            request = request.query(&[("Municipalities", municipality)]);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ToolboxError::UpstreamError(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| ToolboxError::UpstreamError(e.to_string()))
    }
}

pub fn register(registry: &mut Registry, client: Arc<IncidentsClient>) {
    let latest = client.clone();
    registry.tool(
        ToolDefinition::without_arguments("latest_incidents", "Get the 10 latest police incidents"),
        move |_| {
            let client = latest.clone();
            async move {
                Ok(client.latest().await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Failed to fetch incidents");
                    format!("Error fetching incidents: {e}")
                }))
            }
        },
    );

    registry.tool(
        ToolDefinition::new(
            "incidents_by_municipality",
            "Get the latest police incidents for a specific municipality",
            json!({
                "type": "object",
                "properties": {
                    "municipality": {
                        "type": "string",
                        "description": "The municipality to fetch incidents for"
                    }
                },
                "required": ["municipality"]
            }),
        ),
        move |arguments| {
            let client = client.clone();
            async move {
                let municipality = args::required_str(&arguments, "municipality")?;
                Ok(client
                    .by_municipality(municipality)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(municipality, error = %e, "Failed to fetch incidents");
                        format!("Error fetching incidents for {municipality}: {e}")
                    }))
            }
        },
    );
}

pub fn server(config: &AppConfig) -> Result<McpServer> {
    let client = IncidentsClient::from_config(config)?;
    let mut registry = Registry::new();
    register(&mut registry, Arc::new(client));
    Ok(McpServer::new(
        crate::server_info(config, SERVER_NAME),
        registry,
    ))
}
