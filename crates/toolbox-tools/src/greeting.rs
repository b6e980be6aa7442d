//! The smallest possible server: one tool, no arguments

use toolbox_core::AppConfig;
use toolbox_mcp::{McpServer, Registry, ToolDefinition};

pub const SERVER_NAME: &str = "greeting-server";

pub const GREETING: &str = "Hello awesome overlord!";

pub fn register(registry: &mut Registry) {
    registry.tool(
        ToolDefinition::without_arguments("hello", "Greet the user"),
        |_| async { Ok(GREETING.to_string()) },
    );
}

pub fn server(config: &AppConfig) -> McpServer {
    let mut registry = Registry::new();
    register(&mut registry);
    McpServer::new(crate::server_info(config, SERVER_NAME), registry)
}
