use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockpilot_models::{CycleSummary, ProductReport, SchedulerConfig};
use stockpilot_store::DecisionStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::AgentError;

/// Something that can run one analysis cycle for a product. Mockable for testing.
///
/// Implementations report failures inside the returned [`ProductReport`]
/// rather than as errors.
#[async_trait]
pub trait ProductAnalyzer: Send + Sync {
    async fn analyze(&self, product_id: &str) -> ProductReport;
}

/// Results of one cycle, in batch-major then within-batch order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub reports: Vec<ProductReport>,
    pub summary: CycleSummary,
}

/// Analyze `product_ids` in consecutive batches of `batch_size`.
///
/// Products within a batch run concurrently; batches run one after another
/// with `inter_batch_delay` between them (none after the last). A panicking
/// analysis becomes an error report for that product. A `batch_size` of 0 is
/// treated as 1.
pub async fn run_cycle(
    analyzer: Arc<dyn ProductAnalyzer>,
    product_ids: &[String],
    batch_size: usize,
    inter_batch_delay: Duration,
) -> CycleReport {
    let started_at = Utc::now();
    let start = Instant::now();
    let batch_size = batch_size.max(1);
    let batches = product_ids.len().div_ceil(batch_size);

    info!(products = product_ids.len(), batch_size, batches, "Starting analysis cycle");

    let mut reports = Vec::with_capacity(product_ids.len());
    for (index, batch) in product_ids.chunks(batch_size).enumerate() {
        let handles: Vec<_> = batch
            .iter()
            .map(|product_id| {
                let analyzer = Arc::clone(&analyzer);
                let product_id = product_id.clone();
                tokio::spawn(async move { analyzer.analyze(&product_id).await })
            })
            .collect();

        for (product_id, handle) in batch.iter().zip(handles) {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(product_id = %product_id, error = %e, "Analysis task panicked");
                    reports.push(ProductReport::failed(
                        product_id,
                        format!("analysis task failed: {e}"),
                        0,
                    ));
                }
            }
        }

        if index + 1 < batches && !inter_batch_delay.is_zero() {
            tokio::time::sleep(inter_batch_delay).await;
        }
    }

    let summary = CycleSummary::from_reports(&reports, start.elapsed().as_millis() as u64);
    info!(
        products = summary.products,
        completed = summary.completed,
        degraded = summary.degraded,
        failed = summary.failed,
        opportunities = summary.opportunities,
        executed = summary.executed,
        elapsed_ms = summary.elapsed_ms,
        "Analysis cycle complete"
    );

    CycleReport {
        started_at,
        reports,
        summary,
    }
}

/// Pulls active products from the store and runs cycles over them.
pub struct Scheduler {
    analyzer: Arc<dyn ProductAnalyzer>,
    store: Arc<DecisionStore>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        analyzer: Arc<dyn ProductAnalyzer>,
        store: Arc<DecisionStore>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            analyzer,
            store,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run the given products with the configured batching.
    pub async fn run_products(&self, product_ids: &[String]) -> CycleReport {
        run_cycle(
            Arc::clone(&self.analyzer),
            product_ids,
            self.config.batch_size,
            Duration::from_millis(self.config.inter_batch_delay_ms),
        )
        .await
    }

    /// One cycle over up to `limit` active products. Fails only when the
    /// product listing itself fails.
    pub async fn run_once(&self, limit: usize) -> Result<CycleReport, AgentError> {
        let product_ids = self.store.active_product_ids(limit)?;
        Ok(self.run_products(&product_ids).await)
    }

    /// Repeat cycles every `cycle_interval_seconds` until cancelled, backing
    /// off for `error_backoff_seconds` after a cycle-level failure.
    pub async fn run_continuous(&self, cancel: CancellationToken) {
        let interval = Duration::from_secs(self.config.cycle_interval_seconds);
        let backoff = Duration::from_secs(self.config.error_backoff_seconds);
        info!(
            interval_secs = interval.as_secs(),
            max_products = self.config.max_products,
            "Continuous analysis starting"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let pause = match self.run_once(self.config.max_products).await {
                Ok(cycle) => {
                    info!(
                        succeeded = cycle.summary.completed + cycle.summary.degraded,
                        failed = cycle.summary.failed,
                        "Continuous cycle finished"
                    );
                    interval
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        backoff_secs = backoff.as_secs(),
                        "Cycle failed; backing off"
                    );
                    backoff
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("Continuous analysis stopped");
    }
}
