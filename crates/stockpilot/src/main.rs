use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use stockpilot::models::config::StockpilotConfig;
use stockpilot::Service;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stockpilot", about = "Per-product inventory analysis agents")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/stockpilot.toml")]
    config: String,

    /// Pretty-print the output JSON
    #[arg(long, global = true)]
    pretty: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze the given products now
    Analyze {
        #[arg(required = true)]
        product_ids: Vec<String>,
    },
    /// Run one cycle over active products
    Cycle {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Run cycles continuously until Ctrl-C
    Run,
    /// List unprocessed opportunities, newest first
    Opportunities {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Only opportunities moving stock out of or into this store
        #[arg(short, long)]
        store: Option<String>,
    },
    /// Record a verdict on an opportunity
    Process {
        opportunity_id: String,
        /// `approved` or `rejected`
        #[arg(short, long)]
        decision: String,
        #[arg(long)]
        trade_id: Option<String>,
        #[arg(long)]
        bid_id: Option<String>,
        /// RFC 3339 timestamp of the verdict; defaults to now
        #[arg(long)]
        processed_at: Option<DateTime<Utc>>,
    },
    /// Check the database, cache and oracle CLI
    Health,
    /// Summary of active products and agents
    Status,
    /// Detailed status of one product
    Product { product_id: String },
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    error: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (respects RUST_LOG env var)
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: StockpilotConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse config")?;

    if let Some(dir) = Path::new(&config.store.sqlite_path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        }
    }

    let service = stockpilot::build_service(&config).context("Failed to build service")?;

    match execute(&service, cli.command).await {
        Ok(output) => print_json(&output, cli.pretty),
        Err(e) => {
            print_json(
                &ErrorResponse {
                    status: "error",
                    error: format!("{e:#}"),
                },
                cli.pretty,
            )?;
            std::process::exit(1);
        }
    }
}

async fn execute(service: &Service, command: Command) -> Result<serde_json::Value> {
    let value = match command {
        Command::Analyze { product_ids } => {
            serde_json::to_value(service.analyze(&product_ids).await)?
        }
        Command::Cycle { limit } => serde_json::to_value(service.run_cycle(limit).await?)?,
        Command::Run => {
            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown requested");
                    ctrl_c.cancel();
                }
            });
            service.run_continuous(cancel).await;
            serde_json::json!({ "status": "stopped" })
        }
        Command::Opportunities { limit, store } => {
            serde_json::to_value(service.list_opportunities(limit, store.as_deref())?)?
        }
        Command::Process {
            opportunity_id,
            decision,
            trade_id,
            bid_id,
            processed_at,
        } => serde_json::to_value(service.process_opportunity(
            &opportunity_id,
            &decision,
            trade_id,
            bid_id,
            processed_at,
        )?)?,
        Command::Health => serde_json::to_value(service.health().await)?,
        Command::Status => serde_json::to_value(service.status().await?)?,
        Command::Product { product_id } => {
            serde_json::to_value(service.product_status(&product_id).await?)?
        }
    };
    Ok(value)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}
