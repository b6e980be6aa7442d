//! Toolbox CLI - Launch MCP servers and query the local knowledge base
//!
//! Usage:
//!   toolbox serve <server>
//!   toolbox query <question> [--top-n N]
//!   toolbox config

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use toolbox_core::{AppConfig, LoggingConfig};
use toolbox_mcp::McpServer;
use toolbox_rag::format_results;
use toolbox_tools::{finance, greeting, incidents, investment, knowledge_base, local_rag, quotes};

#[derive(Parser)]
#[command(name = "toolbox")]
#[command(about = "MCP tool servers and local RAG retrieval")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an MCP server over stdio
    Serve {
        #[arg(value_enum)]
        server: ServerKind,
    },
    /// Search the local knowledge base and print the results
    Query {
        /// Question to search for
        question: String,

        /// Number of results (defaults to rag.default_top_n)
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Print the effective configuration with secrets redacted
    Config,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ServerKind {
    Greeting,
    Quotes,
    Finance,
    Incidents,
    Investment,
    KnowledgeBase,
    LocalRag,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Logs always go to stderr; stdout carries the protocol
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.with_ansi(false).init();
    }
}

fn build_server(kind: ServerKind, config: &AppConfig) -> anyhow::Result<McpServer> {
    let server = match kind {
        ServerKind::Greeting => greeting::server(config),
        ServerKind::Quotes => quotes::server(config).with_context(|| {
            format!("Failed to load quotes from {}", config.quotes.path.display())
        })?,
        ServerKind::Finance => finance::server(config)?,
        ServerKind::Incidents => incidents::server(config)?,
        ServerKind::Investment => investment::server(config)?,
        ServerKind::KnowledgeBase => knowledge_base::server(config),
        ServerKind::LocalRag => {
            let retriever = Arc::new(local_rag::retriever(config));
            local_rag::server(config, retriever)
        }
    };
    Ok(server)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env file: {e}");
        }
    }

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { server } => {
            let server = build_server(server, &config)?;
            server.run_stdio().await?;
        }
        Commands::Query { question, top_n } => {
            let top_n = top_n.unwrap_or(config.rag.default_top_n);
            if top_n == 0 {
                bail!("--top-n must be at least 1");
            }
            let retriever = local_rag::retriever(&config);
            let results = retriever.answer_query(&question, top_n).await;
            println!("{}", format_results(&results, config.rag.preview_chars));
        }
        Commands::Config => {
            print!("{}", config.redacted().to_toml()?);
        }
    }

    Ok(())
}
