//! Motivational quotes served from a JSON file loaded at startup

use rand::seq::SliceRandom;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use toolbox_core::{AppConfig, Result, ToolboxError};
use toolbox_mcp::{McpServer, PromptArgument, PromptDefinition, Registry, ToolDefinition};

pub const SERVER_NAME: &str = "motivational-quotes";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Quote {
    pub quote: String,
    pub author: String,
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" - {}", self.quote, self.author)
    }
}

/// The quotes file: `{"quotes": [{"quote": "...", "author": "..."}]}`
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteBook {
    quotes: Vec<Quote>,
}

impl QuoteBook {
    pub fn new(quotes: Vec<Quote>) -> Result<Self> {
        if quotes.is_empty() {
            return Err(ToolboxError::ConfigError(
                "Quote collection is empty".to_string(),
            ));
        }
        Ok(Self { quotes })
    }

    /// Load and validate a quotes file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let book: QuoteBook = serde_json::from_str(&content).map_err(|e| {
            ToolboxError::ConfigError(format!("Invalid quotes file {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), count = book.quotes.len(), "Loaded quotes");
        Self::new(book.quotes)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn random(&self) -> Option<&Quote> {
        self.quotes.choose(&mut rand::thread_rng())
    }
}

pub fn funny_quote_prompt(quote: &str) -> String {
    format!("Please turn this quote into a funny motivational quote:\n\n{quote}")
}

pub fn register(registry: &mut Registry, book: Arc<QuoteBook>) {
    registry.tool(
        ToolDefinition::without_arguments("random_quote", "Get a random motivational quote"),
        move |_| {
            let picked = book
                .random()
                .map(Quote::to_string)
                .ok_or_else(|| ToolboxError::NotFound("No quotes available".to_string()));
            async move { picked }
        },
    );

    registry.prompt(
        PromptDefinition::new(
            "funny_quote",
            "Turns a motivational quote into a funny motivational quote",
            vec![PromptArgument::required("quote", "The quote to rewrite")],
        ),
        |args| async move {
            let quote = args.get("quote").map(String::as_str).unwrap_or_default();
            Ok(funny_quote_prompt(quote))
        },
    );
}

/// Build the server; fails if the quotes file cannot be loaded
pub fn server(config: &AppConfig) -> Result<McpServer> {
    let book = QuoteBook::load(&config.quotes.path)?;
    let mut registry = Registry::new();
    register(&mut registry, Arc::new(book));
    Ok(McpServer::new(
        crate::server_info(config, SERVER_NAME),
        registry,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_quotes(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_quotes() {
        let file = write_quotes(
            r#"{"quotes": [{"quote": "Stay hungry", "author": "Steve Jobs"}, {"quote": "Keep going", "author": "Anon"}]}"#,
        );
        let book = QuoteBook::load(file.path()).unwrap();
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_load_failures() {
        assert!(QuoteBook::load(Path::new("/nonexistent/quotes.json")).is_err());
        assert!(QuoteBook::load(write_quotes("not json").path()).is_err());
        assert!(QuoteBook::load(write_quotes(r#"{"quotes": []}"#).path()).is_err());
    }

    #[test]
    fn test_quote_display() {
        let quote = Quote {
            quote: "Stay hungry".to_string(),
            author: "Steve Jobs".to_string(),
        };
        assert_eq!(quote.to_string(), "\"Stay hungry\" - Steve Jobs");
    }

    #[test]
    fn test_random_returns_member() {
        let quotes = vec![
            Quote { quote: "a".into(), author: "x".into() },
            Quote { quote: "b".into(), author: "y".into() },
        ];
        let book = QuoteBook::new(quotes.clone()).unwrap();
        for _ in 0..20 {
            assert!(quotes.contains(book.random().unwrap()));
        }
    }

    #[test]
    fn test_funny_quote_prompt() {
        assert_eq!(
            funny_quote_prompt("Keep going"),
            "Please turn this quote into a funny motivational quote:\n\nKeep going"
        );
    }
}
