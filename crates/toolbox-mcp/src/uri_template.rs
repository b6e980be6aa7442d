//! Resource URI templates such as `stock://{symbol}/earnings`

use std::collections::HashMap;
use toolbox_core::{Result, ToolboxError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Param(String),
}

/// A URI with `{name}` placeholders.
///
/// A placeholder matches one or more characters other than `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(Part::Literal(rest[..open].to_string()));
            }
            let close = rest[open..].find('}').map(|i| open + i).ok_or_else(|| {
                ToolboxError::InvalidArgument(format!("Unclosed placeholder in '{template}'"))
            })?;
            let name = &rest[open + 1..close];
            if name.is_empty() || name.contains('{') {
                return Err(ToolboxError::InvalidArgument(format!(
                    "Invalid placeholder in '{template}'"
                )));
            }
            if matches!(parts.last(), Some(Part::Param(_))) {
                return Err(ToolboxError::InvalidArgument(format!(
                    "Adjacent placeholders are ambiguous in '{template}'"
                )));
            }
            parts.push(Part::Param(name.to_string()));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self {
            raw: template.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance
    pub fn params(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Param(name) => Some(name.as_str()),
                Part::Literal(_) => None,
            })
            .collect()
    }

    /// Match a concrete URI, returning the captured placeholder values
    pub fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        let mut captures = HashMap::new();
        let mut rest = uri;
        let mut parts = self.parts.iter().peekable();

        while let Some(part) = parts.next() {
            match part {
                Part::Literal(literal) => {
                    rest = rest.strip_prefix(literal.as_str())?;
                }
                Part::Param(name) => {
                    let end = match parts.peek() {
                        Some(Part::Literal(next)) => rest.find(next.as_str())?,
                        _ => rest.len(),
                    };
                    let value = &rest[..end];
                    if value.is_empty() || value.contains('/') {
                        return None;
                    }
                    captures.insert(name.clone(), value.to_string());
                    rest = &rest[end..];
                }
            }
        }

        rest.is_empty().then_some(captures)
    }
}
