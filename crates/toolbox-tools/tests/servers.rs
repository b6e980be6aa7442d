//! Example servers exercised through MCP dispatch, with upstream APIs mocked

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use toolbox_core::{AppConfig, Result};
use toolbox_mcp::McpServer;
use toolbox_rag::{
    ChunkConnection, ChunkRow, ChunkStore, EmbeddingBackend, EmbeddingClient, Retriever,
};
use toolbox_tools::{finance, incidents, investment, knowledge_base, local_rag, quotes};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn call(server: &McpServer, method_name: &str, params: Value) -> Value {
    let request = serde_json::from_value(json!({
        "jsonrpc": "2.0", "id": 1, "method": method_name, "params": params
    }))
    .unwrap();
    let response = server.handle_request(request).await.unwrap();
    serde_json::to_value(response).unwrap()
}

async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> (String, bool) {
    let response = call(server, "tools/call", json!({ "name": name, "arguments": arguments })).await;
    let result = &response["result"];
    (
        result["content"][0]["text"].as_str().unwrap().to_string(),
        result["isError"].as_bool().unwrap(),
    )
}

// =============================================================================
// Quotes and finance
// =============================================================================

#[tokio::test]
async fn test_quotes_server_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"quotes": [{"quote": "Stay hungry", "author": "Steve Jobs"}]}"#)
        .unwrap();

    let mut config = AppConfig::default();
    config.quotes.path = file.path().to_path_buf();
    let server = quotes::server(&config).unwrap();
    assert_eq!(server.info().name, "motivational-quotes");

    let (text, is_error) = call_tool(&server, "random_quote", json!({})).await;
    assert!(!is_error);
    assert_eq!(text, "\"Stay hungry\" - Steve Jobs");

    let prompt = call(
        &server,
        "prompts/get",
        json!({ "name": "funny_quote", "arguments": { "quote": "Stay hungry" } }),
    )
    .await;
    assert_eq!(
        prompt["result"]["messages"][0]["content"]["text"],
        "Please turn this quote into a funny motivational quote:\n\nStay hungry"
    );
}

#[test]
fn test_quotes_server_fails_without_file() {
    let mut config = AppConfig::default();
    config.quotes.path = "/nonexistent/quotes.json".into();
    assert!(quotes::server(&config).is_err());
}

#[tokio::test]
async fn test_finance_resources() {
    let server = finance::server(&AppConfig::default()).unwrap();

    let response = call(&server, "resources/read", json!({ "uri": "stock://AAPL/earnings" })).await;
    let text = response["result"]["contents"][0]["text"].as_str().unwrap();
    let amount: u64 = text
        .strip_prefix("The earnings for AAPL are ")
        .unwrap()
        .parse()
        .unwrap();
    assert!(finance::EARNINGS_RANGE.contains(&amount));

    let response = call(&server, "resources/read", json!({ "uri": "stock://earnings" })).await;
    let text = response["result"]["contents"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("The latest earnings for NVIDIA are "));
}

#[tokio::test]
async fn test_finance_cagr_tool() {
    let server = finance::server(&AppConfig::default()).unwrap();

    let (text, is_error) = call_tool(
        &server,
        "calculate_cagr",
        json!({ "symbol": "ACME", "years": 5, "start_price": 100, "end_price": 200 }),
    )
    .await;
    assert!(!is_error);
    assert_eq!(text, "The CAGR for ACME over 5 years is 14.87%");

    let (text, is_error) = call_tool(
        &server,
        "calculate_cagr",
        json!({ "symbol": "ACME", "years": 0, "start_price": 100, "end_price": 200 }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("years"));
}

// =============================================================================
// Police incidents
// =============================================================================

fn incidents_server(mock: &MockServer) -> McpServer {
    let mut config = AppConfig::default();
    config.apis.politiet_url = format!("{}/politiloggen/v1/messages", mock.uri());
    incidents::server(&config).unwrap()
}

#[tokio::test]
async fn test_latest_incidents_returns_body_verbatim() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/politiloggen/v1/messages"))
        .and(header("accept", "text/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Traffic accident in Oslo"))
        .expect(1)
        .mount(&mock)
        .await;

    let (text, is_error) = call_tool(&incidents_server(&mock), "latest_incidents", json!({})).await;
    assert!(!is_error);
    assert_eq!(text, "Traffic accident in Oslo");
}

#[tokio::test]
async fn test_incidents_by_municipality_sends_filter() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/politiloggen/v1/messages"))
        .and(query_param("Municipalities", "Bergen"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Fire in Bergen"))
        .mount(&mock)
        .await;

    let (text, _) = call_tool(
        &incidents_server(&mock),
        "incidents_by_municipality",
        json!({ "municipality": "Bergen" }),
    )
    .await;
    assert_eq!(text, "Fire in Bergen");
}

#[tokio::test]
async fn test_incidents_upstream_failure_is_text() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock)
        .await;

    let server = incidents_server(&mock);
    let (text, is_error) = call_tool(&server, "latest_incidents", json!({})).await;
    assert!(!is_error);
    assert!(text.starts_with("Error fetching incidents: "));

    let (text, is_error) =
        call_tool(&server, "incidents_by_municipality", json!({ "municipality": "Oslo" })).await;
    assert!(!is_error);
    assert!(text.starts_with("Error fetching incidents for Oslo: "));
}

// =============================================================================
// Investment data
// =============================================================================

fn investment_server(mock: &MockServer, api_key: Option<&str>) -> McpServer {
    let mut config = AppConfig::default();
    config.apis.alphavantage_url = format!("{}/query", mock.uri());
    config.apis.alphavantage_api_key = api_key.map(str::to_string);
    investment::server(&config).unwrap()
}

#[tokio::test]
async fn test_ticker_search() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("function", "SYMBOL_SEARCH"))
        .and(query_param("keywords", "Apple"))
        .and(query_param("apikey", "demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bestMatches": [{ "1. symbol": "AAPL", "2. name": "Apple Inc" }]
        })))
        .mount(&mock)
        .await;

    let (text, is_error) = call_tool(
        &investment_server(&mock, Some("demo")),
        "ticker_search",
        json!({ "company_name": "Apple" }),
    )
    .await;
    assert!(!is_error);
    assert_eq!(text, "AAPL");
}

#[tokio::test]
async fn test_ticker_search_rate_limited() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
        })))
        .mount(&mock)
        .await;

    let (text, is_error) = call_tool(
        &investment_server(&mock, Some("demo")),
        "ticker_search",
        json!({ "company_name": "Apple" }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("frequency limit"));
}

#[tokio::test]
async fn test_ticker_search_without_key_makes_no_request() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;

    let (text, is_error) = call_tool(
        &investment_server(&mock, None),
        "ticker_search",
        json!({ "company_name": "Apple" }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("ALPHAVANTAGE_API_KEY"));
}

#[tokio::test]
async fn test_ticker_search_with_blank_key_makes_no_request() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;

    let url = format!("{}/query", mock.uri());
    let config = AppConfig::from_lookup(|key| match key {
        "ALPHAVANTAGE_API_KEY" => Some(String::new()),
        "ALPHAVANTAGE_URL" => Some(url.clone()),
        _ => None,
    })
    .unwrap();
    let (text, is_error) = call_tool(
        &investment::server(&config).unwrap(),
        "ticker_search",
        json!({ "company_name": "Apple" }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("ALPHAVANTAGE_API_KEY"));

    // A blank key set directly on the config is rejected too
    let (_, is_error) = call_tool(
        &investment_server(&mock, Some("")),
        "ticker_search",
        json!({ "company_name": "Apple" }),
    )
    .await;
    assert!(is_error);
}

// =============================================================================
// Hosted knowledge base
// =============================================================================

fn knowledge_base_server(mock: &MockServer) -> McpServer {
    let mut config = AppConfig::default();
    config.apis.knowledge_base_id = Some("KB123".to_string());
    config.apis.knowledge_base_region = Some("eu-west-1".to_string());
    config.apis.knowledge_base_endpoint = Some(mock.uri());
    config.apis.knowledge_base_api_key = Some("token".to_string());
    knowledge_base::server(&config)
}

#[tokio::test]
async fn test_knowledge_base_search() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/knowledgebases/KB123/retrieve"))
        .and(header("authorization", "Bearer token"))
        .and(body_json(json!({ "retrievalQuery": { "text": "vacation policy" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "retrievalResults": [
                { "content": { "text": "25 days" }, "score": 0.5, "location": {} }
            ]
        })))
        .mount(&mock)
        .await;

    let (text, is_error) = call_tool(
        &knowledge_base_server(&mock),
        "search_knowledge_base",
        json!({ "query": "vacation policy" }),
    )
    .await;
    assert!(!is_error);
    assert_eq!(text, "Result 1 (Score: 0.5):\nContent: 25 days\nLocation: N/A\n---");
}

#[tokio::test]
async fn test_knowledge_base_empty_and_failing() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/knowledgebases/KB123/retrieve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "retrievalResults": [] })))
        .up_to_n_times(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
        .mount(&mock)
        .await;

    let server = knowledge_base_server(&mock);
    let (text, _) = call_tool(&server, "search_knowledge_base", json!({ "query": "q" })).await;
    assert_eq!(text, knowledge_base::NO_RESULTS);

    let (text, is_error) = call_tool(&server, "search_knowledge_base", json!({ "query": "q" })).await;
    assert!(!is_error);
    assert!(text.starts_with("Error calling Bedrock Retrieve API: "));
    assert!(text.contains("denied"));
}

#[tokio::test]
async fn test_knowledge_base_missing_configuration() {
    let server = knowledge_base::server(&AppConfig::default());
    let (text, is_error) = call_tool(&server, "search_knowledge_base", json!({ "query": "q" })).await;
    assert!(!is_error);
    assert_eq!(text, "Error: KNOWLEDGE_BASE_ID environment variable not set.");
}

#[tokio::test]
async fn test_knowledge_base_blank_settings_are_missing() {
    let config = AppConfig::from_lookup(|key| match key {
        "KNOWLEDGE_BASE_ID" | "AWS_REGION" => Some(String::new()),
        _ => None,
    })
    .unwrap();
    assert_eq!(
        knowledge_base::missing_settings(&config.apis),
        vec!["KNOWLEDGE_BASE_ID", "AWS_REGION"]
    );

    let server = knowledge_base::server(&config);
    let (text, is_error) = call_tool(&server, "search_knowledge_base", json!({ "query": "q" })).await;
    assert!(!is_error);
    assert_eq!(text, "Error: KNOWLEDGE_BASE_ID environment variable not set.");
}

#[tokio::test]
async fn test_knowledge_base_missing_region() {
    let mut config = AppConfig::default();
    config.apis.knowledge_base_id = Some("KB123".to_string());
    let server = knowledge_base::server(&config);

    let (text, _) = call_tool(&server, "search_knowledge_base", json!({ "query": "q" })).await;
    assert_eq!(
        text,
        "Error: AWS_REGION environment variable not set (required for Bedrock client)."
    );
}

// =============================================================================
// Local RAG
// =============================================================================

struct StaticEmbedder;

#[async_trait]
impl EmbeddingClient for StaticEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.5; 4])
    }

    fn model(&self) -> &str {
        "static"
    }
}

struct StaticStore(Vec<ChunkRow>);

#[async_trait]
impl ChunkStore for StaticStore {
    async fn acquire(&self) -> Result<Box<dyn ChunkConnection>> {
        Ok(Box::new(StaticConnection(self.0.clone())))
    }

    fn name(&self) -> &str {
        "static"
    }
}

struct StaticConnection(Vec<ChunkRow>);

#[async_trait]
impl ChunkConnection for StaticConnection {
    async fn nearest(&mut self, _embedding: &[f32], limit: usize) -> Result<Vec<ChunkRow>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }

    async fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

fn chunk(id: &str, distance: f64, content: &str) -> ChunkRow {
    ChunkRow {
        chunk_id: id.to_string(),
        filename: "handbook.md".to_string(),
        content: content.to_string(),
        distance,
    }
}

#[tokio::test]
async fn test_local_rag_search_uses_three_results() {
    let rows = vec![
        chunk("1", 0.1, "Employees get 25 vacation days."),
        chunk("2", 0.2, "Carry-over is limited to 5 days."),
        chunk("3", 0.3, "Requests go through the HR portal."),
        chunk("4", 0.4, "Unrelated."),
    ];
    let retriever = Retriever::new(
        EmbeddingBackend::available(Arc::new(StaticEmbedder)),
        Arc::new(StaticStore(rows)),
    );
    let server = local_rag::server(&AppConfig::default(), Arc::new(retriever));

    let (text, is_error) = call_tool(
        &server,
        "search_local_rag_knowledge_base",
        json!({ "query": "vacation" }),
    )
    .await;

    assert!(!is_error);
    assert!(text.starts_with("Found relevant information:\n\n"));
    assert!(text.contains("Result 1 (Score: 0.9000, Source: handbook.md, ID: 1):"));
    assert!(text.contains("Result 3 (Score: 0.7000"));
    assert!(!text.contains("Result 4"));
}

#[tokio::test]
async fn test_local_rag_without_embeddings() {
    let retriever = Retriever::new(
        EmbeddingBackend::unavailable("no credentials"),
        Arc::new(StaticStore(vec![chunk("1", 0.1, "x")])),
    );
    let server = local_rag::server(&AppConfig::default(), Arc::new(retriever));

    let (text, is_error) =
        call_tool(&server, "search_local_rag_knowledge_base", json!({ "query": "vacation" })).await;
    assert!(!is_error);
    assert_eq!(text, "No relevant information found.");
}

#[tokio::test]
async fn test_local_rag_requires_query() {
    let retriever = Retriever::new(
        EmbeddingBackend::unavailable("unused"),
        Arc::new(StaticStore(vec![])),
    );
    let server = local_rag::server(&AppConfig::default(), Arc::new(retriever));

    let (_, is_error) = call_tool(&server, "search_local_rag_knowledge_base", json!({})).await;
    assert!(is_error);
}
