use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use stockpilot_agents::{CycleReport, Oracle, Orchestrator, Scheduler, TradingBackend};
use stockpilot_models::{
    CycleSummary, Decision, OpportunityListing, PolicyPreset, ProcessReceipt, ProductReport,
    Resolution, StockpilotConfig,
};
use stockpilot_store::{DecisionStore, StoreError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Number of recent decisions inspected by [`Service::product_status`].
const PRODUCT_STATUS_DECISIONS: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Completed,
    Started,
    Success,
    /// The opportunity id named no decision; nothing was written.
    NotFound,
    /// The id could not be resolved and every decision with open
    /// opportunities received the entry.
    Ambiguous,
    Error,
}

/// A finished cycle over explicit or listed products.
#[derive(Debug, Clone, Serialize)]
pub struct CycleResponse {
    pub status: ResponseStatus,
    pub analyzed_products: usize,
    pub started_at: DateTime<Utc>,
    pub results: Vec<ProductReport>,
    pub summary: CycleSummary,
}

impl From<CycleReport> for CycleResponse {
    fn from(cycle: CycleReport) -> Self {
        Self {
            status: ResponseStatus::Completed,
            analyzed_products: cycle.reports.len(),
            started_at: cycle.started_at,
            results: cycle.reports,
            summary: cycle.summary,
        }
    }
}

/// Acknowledgement for a cycle running in the background.
#[derive(Debug, Clone, Serialize)]
pub struct CycleStarted {
    pub status: ResponseStatus,
    pub product_ids: Vec<String>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpportunitiesResponse {
    pub status: ResponseStatus,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    pub opportunities: Vec<OpportunityListing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ProcessReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    ConfigurationNeeded,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Healthy,
    Unhealthy,
    /// The dependency is not installed or not configured.
    Missing,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub database: CheckState,
    pub cache: CheckState,
    pub oracle_cli: CheckState,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HealthChecks,
    pub timestamp: DateTime<Utc>,
}

impl HealthChecks {
    /// A missing oracle outranks storage trouble: nothing can be analysed
    /// until it is configured.
    pub fn overall(&self) -> HealthStatus {
        if self.oracle_cli != CheckState::Healthy {
            HealthStatus::ConfigurationNeeded
        } else if self.database != CheckState::Healthy || self.cache != CheckState::Healthy {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStatusResponse {
    pub status: ResponseStatus,
    pub active_products: usize,
    pub cached_agents: u64,
    pub decisions_last_hour: usize,
    pub policy: PolicyPreset,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductStatusResponse {
    pub status: ResponseStatus,
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub total_inventory: i64,
    pub store_count: usize,
    pub recent_decisions: usize,
    pub last_analysis: Option<DateTime<Utc>>,
    pub cached_decision: Option<Decision>,
    pub agent_cached: bool,
}

/// The control surface: one handle over the store, the per-product agents
/// and the scheduler.
pub struct Service {
    store: Arc<DecisionStore>,
    oracle: Arc<dyn Oracle>,
    orchestrator: Arc<Orchestrator>,
    scheduler: Arc<Scheduler>,
    policy: PolicyPreset,
}

impl Service {
    pub fn new(
        config: &StockpilotConfig,
        store: Arc<DecisionStore>,
        oracle: Arc<dyn Oracle>,
        backend: Arc<dyn TradingBackend>,
    ) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&store),
            Arc::clone(&oracle),
            backend,
            &config.agents,
        ));
        let scheduler = Arc::new(Scheduler::new(
            orchestrator.clone(),
            Arc::clone(&store),
            config.scheduler.clone(),
        ));

        Self {
            store,
            oracle,
            orchestrator,
            scheduler,
            policy: config.agents.policy,
        }
    }

    pub fn store(&self) -> &Arc<DecisionStore> {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Run one cycle over the given product ids with the configured batching.
    pub async fn analyze(&self, product_ids: &[String]) -> CycleResponse {
        info!(products = product_ids.len(), "Analyzing requested products");
        self.scheduler.run_products(product_ids).await.into()
    }

    /// Run one cycle over up to `limit` active products and wait for it.
    pub async fn run_cycle(&self, limit: usize) -> Result<CycleResponse> {
        let cycle = self
            .scheduler
            .run_once(limit)
            .await
            .context("Failed to list active products")?;
        Ok(cycle.into())
    }

    /// Start a cycle over up to `limit` active products without waiting.
    ///
    /// The product list is taken before returning, so a listing failure is
    /// reported here rather than inside the task.
    pub fn start_cycle(&self, limit: usize) -> Result<(CycleStarted, JoinHandle<CycleReport>)> {
        let product_ids = self
            .store
            .active_product_ids(limit)
            .context("Failed to list active products")?;

        let scheduler = Arc::clone(&self.scheduler);
        let ids = product_ids.clone();
        let handle = tokio::spawn(async move { scheduler.run_products(&ids).await });

        info!(products = product_ids.len(), "Background cycle started");
        Ok((
            CycleStarted {
                status: ResponseStatus::Started,
                product_ids,
                started_at: Utc::now(),
            },
            handle,
        ))
    }

    /// Continuous mode until `cancel` fires.
    pub async fn run_continuous(&self, cancel: CancellationToken) {
        self.scheduler.run_continuous(cancel).await;
    }

    pub fn list_opportunities(
        &self,
        limit: usize,
        store_id: Option<&str>,
    ) -> Result<OpportunitiesResponse> {
        let opportunities = self
            .store
            .list_opportunities(limit, store_id)
            .context("Failed to list opportunities")?;

        Ok(OpportunitiesResponse {
            status: ResponseStatus::Success,
            count: opportunities.len(),
            store_id: store_id.map(str::to_string),
            opportunities,
        })
    }

    /// Record an `approved` or `rejected` verdict on an opportunity.
    ///
    /// The response status follows the receipt's resolution: `success` for an
    /// exact match, `not_found` when the owning decision is gone and
    /// `ambiguous` when the fallback wrote to every open decision. An
    /// unrecognised verdict comes back as `error` with nothing written.
    pub fn process_opportunity(
        &self,
        opportunity_id: &str,
        decision: &str,
        trade_id: Option<String>,
        bid_id: Option<String>,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<ProcessResponse> {
        match self
            .store
            .mark_processed(opportunity_id, decision, trade_id, bid_id, processed_at)
        {
            Ok(receipt) => {
                let status = match receipt.resolution {
                    Resolution::Exact => ResponseStatus::Success,
                    Resolution::Unmatched => ResponseStatus::NotFound,
                    Resolution::Ambiguous => ResponseStatus::Ambiguous,
                };
                Ok(ProcessResponse {
                    status,
                    receipt: Some(receipt),
                    error: None,
                })
            }
            Err(e @ StoreError::InvalidDecisionValue(_)) => {
                warn!(opportunity_id = %opportunity_id, error = %e, "Rejected processing request");
                Ok(ProcessResponse {
                    status: ResponseStatus::Error,
                    receipt: None,
                    error: Some(e.to_string()),
                })
            }
            Err(e) => Err(e).context("Failed to mark opportunity processed"),
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let database = match self.store.ping() {
            Ok(()) => CheckState::Healthy,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                CheckState::Unhealthy
            }
        };
        let cache = if self.store.cache_ping() {
            CheckState::Healthy
        } else {
            CheckState::Unhealthy
        };
        let oracle_cli = if self.oracle.available().await {
            CheckState::Healthy
        } else {
            CheckState::Missing
        };

        let checks = HealthChecks {
            database,
            cache,
            oracle_cli,
        };
        HealthResponse {
            status: checks.overall(),
            checks,
            timestamp: Utc::now(),
        }
    }

    pub async fn status(&self) -> Result<AgentStatusResponse> {
        let active_products = self
            .store
            .count_active_products()
            .context("Failed to count active products")?;
        let decisions_last_hour = self
            .store
            .count_decisions_since(Utc::now() - ChronoDuration::hours(1))
            .context("Failed to count recent decisions")?;

        let agents = self.orchestrator.agents();
        agents.sync().await;

        Ok(AgentStatusResponse {
            status: ResponseStatus::Success,
            active_products,
            cached_agents: agents.len(),
            decisions_last_hour,
            policy: self.policy,
            timestamp: Utc::now(),
        })
    }

    pub async fn product_status(&self, product_id: &str) -> Result<ProductStatusResponse> {
        let snapshot = self
            .store
            .product_snapshot(product_id)
            .context("Failed to load product")?
            .with_context(|| format!("Product not found: {product_id}"))?;
        let recent = self
            .store
            .decisions_for_product(product_id, PRODUCT_STATUS_DECISIONS)
            .context("Failed to load recent decisions")?;

        Ok(ProductStatusResponse {
            status: ResponseStatus::Success,
            product_id: snapshot.product_id.clone(),
            name: snapshot.name.clone(),
            category: snapshot.category.clone(),
            total_inventory: snapshot.total_units(),
            store_count: snapshot.inventory.len(),
            recent_decisions: recent.len(),
            last_analysis: recent.first().map(|d| d.created_at),
            cached_decision: self.store.recent_decision(product_id).await,
            agent_cached: self.orchestrator.agents().contains(product_id),
        })
    }
}
