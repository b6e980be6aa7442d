//! Registry of tools, resources and prompts exposed by a server
//!
//! Each entry pairs the metadata returned by the `*/list` methods with an
//! async handler. Handlers return plain text; the server wraps it in the
//! appropriate MCP content envelope.

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use toolbox_core::Result;

use crate::uri_template::UriTemplate;

/// Handler for `tools/call`; receives the raw `arguments` object
pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// Handler for resources and prompts; receives string parameters
pub type TextHandler =
    Arc<dyn Fn(HashMap<String, String>) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// Tool metadata as listed by `tools/list`
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// A tool that takes no arguments
    pub fn without_arguments(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(
            name,
            description,
            serde_json::json!({ "type": "object", "properties": {} }),
        )
    }
}

/// Fixed-URI resource metadata
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

impl ResourceDefinition {
    pub fn new(uri: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: description.into(),
            mime_type: "text/plain".to_string(),
        }
    }
}

/// Templated resource metadata
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateDefinition {
    pub uri_template: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// A prompt argument
#[derive(Serialize, Debug, Clone)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl PromptArgument {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Prompt metadata as listed by `prompts/list`
#[derive(Serialize, Debug, Clone)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

impl PromptDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        arguments: Vec<PromptArgument>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            arguments,
        }
    }
}

pub(crate) struct RegisteredTemplate {
    pub definition: ResourceTemplateDefinition,
    pub template: UriTemplate,
    pub handler: TextHandler,
}

/// Everything a server exposes
#[derive(Default)]
pub struct Registry {
    pub(crate) tools: Vec<ToolDefinition>,
    pub(crate) tool_handlers: HashMap<String, ToolHandler>,
    pub(crate) resources: Vec<ResourceDefinition>,
    pub(crate) resource_handlers: HashMap<String, TextHandler>,
    pub(crate) templates: Vec<RegisteredTemplate>,
    pub(crate) prompts: Vec<PromptDefinition>,
    pub(crate) prompt_handlers: HashMap<String, TextHandler>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later registration with the same name replaces
    /// the earlier one.
    pub fn tool<F, Fut>(&mut self, definition: ToolDefinition, handler: F) -> &mut Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let name = definition.name.clone();
        self.tools.retain(|t| t.name != name);
        self.tools.push(definition);
        self.tool_handlers
            .insert(name, Arc::new(move |args| Box::pin(handler(args))));
        self
    }

    /// Register a resource with a fixed URI
    pub fn resource<F, Fut>(&mut self, definition: ResourceDefinition, handler: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let uri = definition.uri.clone();
        self.resources.retain(|r| r.uri != uri);
        self.resources.push(definition);
        self.resource_handlers
            .insert(uri, Arc::new(move |_| Box::pin(handler())));
        self
    }

    /// Register a templated resource; the handler receives the captured
    /// placeholder values
    pub fn resource_template<F, Fut>(
        &mut self,
        template: &str,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self>
    where
        F: Fn(HashMap<String, String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let parsed = UriTemplate::parse(template)?;
        self.templates
            .retain(|t| t.definition.uri_template != template);
        self.templates.push(RegisteredTemplate {
            definition: ResourceTemplateDefinition {
                uri_template: template.to_string(),
                name: name.into(),
                description: description.into(),
                mime_type: "text/plain".to_string(),
            },
            template: parsed,
            handler: Arc::new(move |params| Box::pin(handler(params))),
        });
        Ok(self)
    }

    /// Register a prompt; the handler returns the user message text
    pub fn prompt<F, Fut>(&mut self, definition: PromptDefinition, handler: F) -> &mut Self
    where
        F: Fn(HashMap<String, String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let name = definition.name.clone();
        self.prompts.retain(|p| p.name != name);
        self.prompts.push(definition);
        self.prompt_handlers
            .insert(name, Arc::new(move |args| Box::pin(handler(args))));
        self
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    pub fn resource_templates(&self) -> Vec<&ResourceTemplateDefinition> {
        self.templates.iter().map(|t| &t.definition).collect()
    }

    pub fn prompts(&self) -> &[PromptDefinition] {
        &self.prompts
    }

    pub(crate) fn find_prompt(&self, name: &str) -> Option<(&PromptDefinition, &TextHandler)> {
        let definition = self.prompts.iter().find(|p| p.name == name)?;
        let handler = self.prompt_handlers.get(name)?;
        Some((definition, handler))
    }

    /// Resolve a URI to its handler and parameters; fixed resources win
    /// over templates, templates are tried in registration order
    pub(crate) fn resolve_resource(
        &self,
        uri: &str,
    ) -> Option<(&TextHandler, HashMap<String, String>)> {
        if let Some(handler) = self.resource_handlers.get(uri) {
            return Some((handler, HashMap::new()));
        }
        self.templates
            .iter()
            .find_map(|t| t.template.matches(uri).map(|params| (&t.handler, params)))
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

/// Typed accessors over a `tools/call` arguments object
pub mod args {
    use serde_json::Value;
    use toolbox_core::{Result, ToolboxError};

    fn missing(name: &str) -> ToolboxError {
        ToolboxError::InvalidArgument(format!("Missing required parameter: {name}"))
    }

    pub fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
        args.get(name).and_then(Value::as_str).ok_or_else(|| missing(name))
    }

    /// Accepts JSON numbers and numeric strings
    pub fn required_f64(args: &Value, name: &str) -> Result<f64> {
        match args.get(name) {
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| missing(name)),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| {
                ToolboxError::InvalidArgument(format!("Parameter {name} must be a number"))
            }),
            Some(_) => Err(ToolboxError::InvalidArgument(format!(
                "Parameter {name} must be a number"
            ))),
            None => Err(missing(name)),
        }
    }

    /// Accepts JSON integers and integer strings
    pub fn required_i64(args: &Value, name: &str) -> Result<i64> {
        let invalid =
            || ToolboxError::InvalidArgument(format!("Parameter {name} must be an integer"));
        match args.get(name) {
            Some(Value::Number(n)) => n.as_i64().ok_or_else(invalid),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
            Some(_) => Err(invalid()),
            None => Err(missing(name)),
        }
    }
}
