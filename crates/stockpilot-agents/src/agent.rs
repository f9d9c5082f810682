use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use stockpilot_models::{ProductReport, ProductStatus};
use stockpilot_store::DecisionStore;
use tracing::{error, info, warn};

use crate::context::build_context;
use crate::error::AgentError;
use crate::gate::ExecutionGate;
use crate::oracle::Oracle;
use crate::parser::parse_oracle_response;
use crate::prompts::{product_system_prompt, product_user_prompt};

/// The long-lived agent responsible for one product.
///
/// Holds the product's fixed system prompt and shared handles to the store,
/// oracle and execution gate. Each call to [`ProductAgent::analyze`] is one
/// independent cycle.
pub struct ProductAgent {
    product_id: String,
    system_prompt: String,
    oracle: Arc<dyn Oracle>,
    store: Arc<DecisionStore>,
    gate: Arc<ExecutionGate>,
}

impl ProductAgent {
    pub fn new(
        product_id: &str,
        oracle: Arc<dyn Oracle>,
        store: Arc<DecisionStore>,
        gate: Arc<ExecutionGate>,
    ) -> Self {
        Self {
            product_id: product_id.to_string(),
            system_prompt: product_system_prompt(product_id),
            oracle,
            store,
            gate,
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Run one analysis cycle. Never fails: errors become an `error` report.
    pub async fn analyze(&self) -> ProductReport {
        let start = Instant::now();
        match self.run(start).await {
            Ok(report) => report,
            Err(e) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                error!(
                    product_id = %self.product_id,
                    error = %e,
                    elapsed_ms,
                    "Product analysis failed"
                );
                ProductReport::failed(&self.product_id, e, elapsed_ms)
            }
        }
    }

    async fn run(&self, start: Instant) -> Result<ProductReport, AgentError> {
        let snapshot = self
            .store
            .product_snapshot(&self.product_id)?
            .ok_or_else(|| {
                AgentError::DataUnavailable(format!("product {} not found", self.product_id))
            })?;

        let marketplace = self.gate.backend().marketplace_summary().await;
        let context = build_context(&snapshot, &marketplace);
        let user_prompt = product_user_prompt(&context)?;

        let raw = self.oracle.complete(&self.system_prompt, &user_prompt).await?;

        let analysis = match parse_oracle_response(&raw) {
            Ok(analysis) => analysis,
            Err(AgentError::MalformedOracleResponse(reason)) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                warn!(
                    product_id = %self.product_id,
                    reason = %reason,
                    raw_len = raw.len(),
                    elapsed_ms,
                    "Oracle reply unusable; no opportunities this cycle"
                );
                return Ok(ProductReport {
                    product_id: self.product_id.clone(),
                    status: ProductStatus::Degraded,
                    decision_id: None,
                    opportunities_found: 0,
                    opportunities_dropped: 0,
                    outcomes: vec![],
                    error: Some(AgentError::MalformedOracleResponse(reason).to_string()),
                    elapsed_ms,
                    analyzed_at: Utc::now(),
                });
            }
            Err(e) => return Err(e),
        };

        let decision = self.store.record(&self.product_id, analysis.draft).await?;
        let outcomes = self.gate.apply(&decision).await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            product_id = %self.product_id,
            decision_id = %decision.decision_id,
            opportunities = decision.opportunities.len(),
            dropped = analysis.dropped,
            elapsed_ms,
            "Product analysis complete"
        );

        Ok(ProductReport {
            product_id: self.product_id.clone(),
            status: ProductStatus::Completed,
            decision_id: Some(decision.decision_id),
            opportunities_found: decision.opportunities.len(),
            opportunities_dropped: analysis.dropped,
            outcomes,
            error: None,
            elapsed_ms,
            analyzed_at: Utc::now(),
        })
    }
}
