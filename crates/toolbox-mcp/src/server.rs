//! Line-delimited JSON-RPC server over stdin/stdout
//!
//! One request per line, one response per line. Requests are handled in
//! order; notifications are consumed without a response. Nothing but
//! protocol messages is ever written to the output stream.

use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::protocol::{
    text_content, JsonRpcRequest, JsonRpcResponse, RpcError, METHOD_NOT_FOUND, PROTOCOL_VERSION,
};
use crate::registry::Registry;

/// Name and version reported in `initialize`
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// An MCP server: identity plus everything it exposes
pub struct McpServer {
    info: ServerInfo,
    registry: Registry,
}

type RpcResult = std::result::Result<Value, RpcError>;

impl McpServer {
    pub fn new(info: ServerInfo, registry: Registry) -> Self {
        Self { info, registry }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Serve on the process's stdin and stdout until stdin closes
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        tracing::info!(
            name = %self.info.name,
            version = %self.info.version,
            tools = self.registry.tools().len(),
            "MCP server starting on stdio"
        );
        let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
        let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());
        self.serve(stdin, stdout).await
    }

    /// Serve over any line reader and writer
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let encoded = match serde_json::to_string(&response) {
                Ok(encoded) => encoded,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize response");
                    continue;
                }
            };
            writer.write_all(encoded.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        tracing::info!("Input closed, MCP server stopping");
        Ok(())
    }

    /// Handle one raw input line; `None` means nothing is written back
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value = match serde_json::from_str::<Value>(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable request line");
                return None;
            }
        };
        let id = value.get("id").cloned().filter(|id| !id.is_null());

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed request");
                Some(JsonRpcResponse::failure(
                    id?,
                    RpcError::invalid_request(format!("Invalid request: {e}")),
                ))
            }
        }
    }

    /// Dispatch a parsed request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone().filter(|id| !id.is_null()) else {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        };

        if request.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
            return Some(JsonRpcResponse::failure(
                id,
                RpcError::invalid_request("Unsupported jsonrpc version"),
            ));
        }

        tracing::debug!(method = %request.method, "Handling request");
        let params = request.params.unwrap_or(Value::Null);
        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.registry.tools() })),
            "tools/call" => self.call_tool(&params).await,
            "resources/list" => Ok(json!({ "resources": self.registry.resources() })),
            "resources/templates/list" => {
                Ok(json!({ "resourceTemplates": self.registry.resource_templates() }))
            }
            "resources/read" => self.read_resource(&params).await,
            "prompts/list" => Ok(json!({ "prompts": self.registry.prompts() })),
            "prompts/get" => self.get_prompt(&params).await,
            other => Err(RpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                tracing::debug!(code = error.code, message = %error.message, "Request failed");
                JsonRpcResponse::failure(id, error)
            }
        })
    }

    // ========================================================================
    // Method handlers
    // ========================================================================

    fn initialize(&self) -> Value {
        let mut capabilities = serde_json::Map::new();
        if !self.registry.tools().is_empty() {
            capabilities.insert("tools".into(), json!({ "listChanged": false }));
        }
        if !self.registry.resources().is_empty() || !self.registry.resource_templates().is_empty() {
            capabilities.insert(
                "resources".into(),
                json!({ "subscribe": false, "listChanged": false }),
            );
        }
        if !self.registry.prompts().is_empty() {
            capabilities.insert("prompts".into(), json!({ "listChanged": false }));
        }

        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": capabilities,
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version,
            }
        })
    }

    async fn call_tool(&self, params: &Value) -> RpcResult {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("Missing tool name"))?;
        let handler = self
            .registry
            .tool_handlers
            .get(name)
            .cloned()
            .ok_or_else(|| RpcError::new(METHOD_NOT_FOUND, format!("Tool not found: {name}")))?;
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        tracing::info!(tool = name, "Calling tool");
        match handler(arguments).await {
            Ok(text) => Ok(json!({ "content": [text_content(text)], "isError": false })),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                Ok(json!({ "content": [text_content(format!("Error: {e}"))], "isError": true }))
            }
        }
    }

    async fn read_resource(&self, params: &Value) -> RpcResult {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("Missing resource uri"))?;
        let (handler, captured) = self
            .registry
            .resolve_resource(uri)
            .ok_or_else(|| RpcError::resource_not_found(uri))?;

        let text = handler(captured)
            .await
            .map_err(|e| RpcError::internal(format!("Failed to read {uri}: {e}")))?;

        Ok(json!({
            "contents": [{ "uri": uri, "mimeType": "text/plain", "text": text }]
        }))
    }

    async fn get_prompt(&self, params: &Value) -> RpcResult {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("Missing prompt name"))?;
        let (definition, handler) = self
            .registry
            .find_prompt(name)
            .ok_or_else(|| RpcError::invalid_params(format!("Prompt not found: {name}")))?;

        let arguments = prompt_arguments(params.get("arguments"));
        if let Some(missing) = definition
            .arguments
            .iter()
            .find(|a| a.required && !arguments.contains_key(&a.name))
        {
            return Err(RpcError::invalid_params(format!(
                "Missing required argument: {}",
                missing.name
            )));
        }

        let text = handler(arguments)
            .await
            .map_err(|e| RpcError::internal(format!("Failed to render prompt {name}: {e}")))?;

        Ok(json!({
            "description": definition.description,
            "messages": [{ "role": "user", "content": text_content(text) }]
        }))
    }
}

/// Prompt arguments arrive as strings; other scalars are stringified
fn prompt_arguments(raw: Option<&Value>) -> HashMap<String, String> {
    let Some(Value::Object(map)) = raw else {
        return HashMap::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            };
            Some((key.clone(), value))
        })
        .collect()
}
