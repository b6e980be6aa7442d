//! Ticker lookup through the Alpha Vantage symbol search

use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use toolbox_core::{AppConfig, Result, ToolboxError};
use toolbox_mcp::{args, McpServer, Registry, ToolDefinition};

pub const SERVER_NAME: &str = "investment-data";

#[derive(Clone)]
pub struct TickerClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl TickerClient {
    pub fn new(client: Client, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = crate::http_client(config.apis.timeout_secs)?;
        Ok(Self::new(
            client,
            config.apis.alphavantage_url.clone(),
            config.apis.alphavantage_api_key.clone(),
        ))
    }

    /// Best-matching ticker symbol for a company name
    pub async fn lookup(&self, company_name: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ToolboxError::ConfigError(
                    "ALPHAVANTAGE_API_KEY environment variable not set.".into(),
                )
            })?;

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("function", "SYMBOL_SEARCH"),
                ("keywords", company_name),
                ("apikey", api_key),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                ToolboxError::UpstreamError(format!("Error connecting to Alpha Vantage API: {e}"))
            })?;

        let data: Value = response.json().await.map_err(|e| {
            ToolboxError::UpstreamError(format!("Invalid Alpha Vantage response: {e}"))
        })?;

        first_symbol(company_name, &data)
    }
}

fn first_symbol(company_name: &str, data: &Value) -> Result<String> {
    match data.get("bestMatches").and_then(Value::as_array) {
        Some(matches) if !matches.is_empty() => matches[0]
            .get("1. symbol")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ToolboxError::UpstreamError("Could not find ticker symbol in API response.".into())
            }),
        _ => match data.get("Note") {
            Some(note) => Err(ToolboxError::UpstreamError(format!(
                "API call frequency limit reached or other note: {}",
                note.as_str().map(str::to_string).unwrap_or_else(|| note.to_string())
            ))),
            None => Err(ToolboxError::NotFound(format!(
                "No ticker found for '{company_name}'. API Response: {data}"
            ))),
        },
    }
}

pub fn register(registry: &mut Registry, client: Arc<TickerClient>) {
    registry.tool(
        ToolDefinition::new(
            "ticker_search",
            "Get the ticker for a company, e.g. \"Apple\" -> \"AAPL\"",
            json!({
                "type": "object",
                "properties": {
                    "company_name": {
                        "type": "string",
                        "description": "The name of the company to search for"
                    }
                },
                "required": ["company_name"]
            }),
        ),
        move |arguments| {
            let client = client.clone();
            async move {
                let company_name = args::required_str(&arguments, "company_name")?;
                client.lookup(company_name).await
            }
        },
    );
}

pub fn server(config: &AppConfig) -> Result<McpServer> {
    let client = TickerClient::from_config(config)?;
    let mut registry = Registry::new();
    register(&mut registry, Arc::new(client));
    Ok(McpServer::new(
        crate::server_info(config, SERVER_NAME),
        registry,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_symbol() {
        let data = json!({ "bestMatches": [{ "1. symbol": "AAPL" }, { "1. symbol": "APLE" }] });
        assert_eq!(first_symbol("Apple", &data).unwrap(), "AAPL");
    }

    #[test]
    fn test_first_symbol_failures() {
        let err = first_symbol("Nothing", &json!({ "bestMatches": [] })).unwrap_err();
        assert!(matches!(err, ToolboxError::NotFound(_)));

        let err = first_symbol("Apple", &json!({ "Note": "Thank you for using Alpha Vantage" }))
            .unwrap_err();
        assert!(err.to_string().contains("frequency limit"));

        assert!(first_symbol("Apple", &json!({ "bestMatches": [{}] })).is_err());
    }
}
