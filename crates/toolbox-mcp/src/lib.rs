//! Toolbox MCP - Model Context Protocol server plumbing
//!
//! Provides the JSON-RPC message types, a registry for tools, resources and
//! prompts, and a stdio server loop that dispatches requests to the registry.

pub mod protocol;
pub mod registry;
pub mod server;
pub mod uri_template;

pub use protocol::{JsonRpcRequest, JsonRpcResponse, RpcError, PROTOCOL_VERSION};
pub use registry::{
    args, PromptArgument, PromptDefinition, Registry, ResourceDefinition,
    ResourceTemplateDefinition, ToolDefinition,
};
pub use server::{McpServer, ServerInfo};
pub use uri_template::UriTemplate;
