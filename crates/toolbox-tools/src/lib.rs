//! Toolbox Tools - Example MCP servers
//!
//! Each module registers its tools, resources and prompts on a
//! [`Registry`](toolbox_mcp::Registry) and exposes a `server` constructor
//! that the CLI runs over stdio.

use std::time::Duration;
use toolbox_core::{AppConfig, Result, ToolboxError};
use toolbox_mcp::ServerInfo;

pub mod finance;
pub mod greeting;
pub mod incidents;
pub mod investment;
pub mod knowledge_base;
pub mod local_rag;
pub mod quotes;

/// Server identity, honouring a configured name override
pub fn server_info(config: &AppConfig, default_name: &str) -> ServerInfo {
    let name = config.server.name.as_deref().unwrap_or(default_name);
    ServerInfo::new(name, config.server.version.as_str())
}

/// Shared HTTP client for the upstream API tools
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ToolboxError::ConfigError(format!("Failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_name_override() {
        let mut config = AppConfig::default();
        assert_eq!(server_info(&config, "greeting-server").name, "greeting-server");

        config.server.name = Some("custom".to_string());
        assert_eq!(server_info(&config, "greeting-server").name, "custom");
    }
}
