//! Dummy finance server: random earnings resources, a summary prompt and a
//! CAGR calculator

use rand::Rng;
use serde_json::json;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use toolbox_core::{AppConfig, Result, ToolboxError};
use toolbox_mcp::{
    args, McpServer, PromptArgument, PromptDefinition, Registry, ResourceDefinition,
    ToolDefinition,
};

pub const SERVER_NAME: &str = "basic-finance-server";

/// Range of the simulated earnings figures
pub const EARNINGS_RANGE: RangeInclusive<u64> = 1_000_000..=1_000_000_000;

fn random_earnings() -> u64 {
    rand::thread_rng().gen_range(EARNINGS_RANGE)
}

/// Compound annual growth rate as a fraction, e.g. `0.1` for 10%
pub fn cagr(start_price: f64, end_price: f64, years: i64) -> Result<f64> {
    if years < 1 {
        return Err(ToolboxError::InvalidArgument(format!(
            "years must be at least 1, got {years}"
        )));
    }
    if start_price.is_nan() || start_price <= 0.0 {
        return Err(ToolboxError::InvalidArgument(format!(
            "start_price must be greater than zero, got {start_price}"
        )));
    }
    if end_price.is_nan() || end_price < 0.0 {
        return Err(ToolboxError::InvalidArgument(format!(
            "end_price must not be negative, got {end_price}"
        )));
    }
    Ok((end_price / start_price).powf(1.0 / years as f64) - 1.0)
}

pub fn format_cagr(symbol: &str, years: i64, rate: f64) -> String {
    format!(
        "The CAGR for {symbol} over {years} years is {:.2}%",
        rate * 100.0
    )
}

pub fn earnings_summary_prompt(symbol: &str, earnings: &str) -> String {
    format!(
        "You are an expert financial analyst. Please summarize the earnings for {symbol} which are {earnings}"
    )
}

pub fn register(registry: &mut Registry) -> Result<()> {
    registry.resource_template(
        "stock://{symbol}/earnings",
        "earnings",
        "Get the earnings for a stock",
        |params: HashMap<String, String>| async move {
            let symbol = params
                .get("symbol")
                .ok_or_else(|| ToolboxError::InvalidArgument("Missing symbol".to_string()))?;
            Ok(format!("The earnings for {symbol} are {}", random_earnings()))
        },
    )?;

    registry.resource(
        ResourceDefinition::new(
            "stock://earnings",
            "latest_nvidia_earnings",
            "Get the latest earnings for NVIDIA",
        ),
        || async {
            Ok(format!(
                "The latest earnings for NVIDIA are {}",
                random_earnings()
            ))
        },
    );

    registry.prompt(
        PromptDefinition::new(
            "earnings_summary",
            "Summarize the earnings for a stock",
            vec![
                PromptArgument::required("symbol", "Stock symbol"),
                PromptArgument::required("earnings", "Reported earnings"),
            ],
        ),
        |params| async move {
            let symbol = params.get("symbol").map(String::as_str).unwrap_or_default();
            let earnings = params.get("earnings").map(String::as_str).unwrap_or_default();
            Ok(earnings_summary_prompt(symbol, earnings))
        },
    );

    registry.tool(
        ToolDefinition::new(
            "calculate_cagr",
            "Calculate the CAGR for a stock",
            json!({
                "type": "object",
                "properties": {
                    "symbol": { "type": "string" },
                    "years": { "type": "integer", "minimum": 1 },
                    "start_price": { "type": "number" },
                    "end_price": { "type": "number" }
                },
                "required": ["symbol", "years", "start_price", "end_price"]
            }),
        ),
        |arguments| async move {
            let symbol = args::required_str(&arguments, "symbol")?;
            let years = args::required_i64(&arguments, "years")?;
            let start_price = args::required_f64(&arguments, "start_price")?;
            let end_price = args::required_f64(&arguments, "end_price")?;

            let rate = cagr(start_price, end_price, years)?;
            Ok(format_cagr(symbol, years, rate))
        },
    );

    Ok(())
}

pub fn server(config: &AppConfig) -> Result<McpServer> {
    let mut registry = Registry::new();
    register(&mut registry)?;
    Ok(McpServer::new(
        crate::server_info(config, SERVER_NAME),
        registry,
    ))
}
