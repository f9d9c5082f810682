//! Stockpilot - per-product inventory analysis agents
//!
//! Periodically analyses each active product's multi-store inventory with a
//! reasoning oracle (the `claude` CLI), records the resulting decisions and
//! acts on confident arbitrage opportunities through the trading backend.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use stockpilot::models::config::StockpilotConfig;
//! use stockpilot::agents::{Orchestrator, Scheduler, ClaudeOracle, HttpTradingBackend};
//! use stockpilot::store::DecisionStore;
//! use stockpilot::{build_service, Service};
//! ```

pub use stockpilot_agents as agents;
pub use stockpilot_models as models;
pub use stockpilot_store as store;

pub mod service;

pub use service::Service;

use std::sync::Arc;

use anyhow::Context;
use stockpilot_agents::claude_cli::ClaudeCliConfig;
use stockpilot_agents::{ClaudeOracle, HttpTradingBackend};
use stockpilot_models::config::StockpilotConfig;
use stockpilot_store::DecisionStore;

/// Build a [`Service`] from configuration, wired to the SQLite store, the
/// `claude` CLI and the HTTP trading backend.
pub fn build_service(config: &StockpilotConfig) -> Result<Service, anyhow::Error> {
    let store = DecisionStore::open(&config.store)
        .with_context(|| format!("Failed to open store: {}", config.store.sqlite_path))?;
    let backend =
        HttpTradingBackend::new(&config.backend).context("Failed to build backend client")?;
    let oracle = ClaudeOracle::new(ClaudeCliConfig::from(&config.oracle));

    Ok(Service::new(
        config,
        Arc::new(store),
        Arc::new(oracle),
        Arc::new(backend),
    ))
}
