use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::execution::{GateAction, OpportunityOutcome};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Analysis finished and its decision was recorded.
    Completed,
    /// Analysis finished but the oracle output was unusable; zero opportunities.
    Degraded,
    Error,
}

/// Per-product result of one analysis cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductReport {
    pub product_id: String,
    pub status: ProductStatus,
    pub decision_id: Option<Uuid>,
    pub opportunities_found: usize,
    /// Oracle entries discarded because their numeric fields were unusable.
    pub opportunities_dropped: usize,
    pub outcomes: Vec<OpportunityOutcome>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub analyzed_at: DateTime<Utc>,
}

impl ProductReport {
    pub fn failed(product_id: &str, error: impl ToString, elapsed_ms: u64) -> Self {
        Self {
            product_id: product_id.to_string(),
            status: ProductStatus::Error,
            decision_id: None,
            opportunities_found: 0,
            opportunities_dropped: 0,
            outcomes: vec![],
            error: Some(error.to_string()),
            elapsed_ms,
            analyzed_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ProductStatus::Error
    }
}

/// Aggregate statistics for one cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CycleSummary {
    pub products: usize,
    pub completed: usize,
    pub degraded: usize,
    pub failed: usize,
    pub opportunities: usize,
    pub executed: usize,
    pub execution_failures: usize,
    pub logged: usize,
    pub skipped: usize,
    pub elapsed_ms: u64,
}

impl CycleSummary {
    pub fn from_reports(reports: &[ProductReport], elapsed_ms: u64) -> Self {
        let mut summary = Self {
            products: reports.len(),
            elapsed_ms,
            ..Self::default()
        };
        for report in reports {
            match report.status {
                ProductStatus::Completed => summary.completed += 1,
                ProductStatus::Degraded => summary.degraded += 1,
                ProductStatus::Error => summary.failed += 1,
            }
            summary.opportunities += report.opportunities_found;
            for outcome in &report.outcomes {
                match outcome.action {
                    GateAction::Executed { .. } => summary.executed += 1,
                    GateAction::Failed { .. } => summary.execution_failures += 1,
                    GateAction::Logged => summary.logged += 1,
                    GateAction::Skipped { .. } => summary.skipped += 1,
                }
            }
        }
        summary
    }
}
