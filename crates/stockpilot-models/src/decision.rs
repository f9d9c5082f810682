use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::opportunity::{opportunity_id, Opportunity, ProcessDecision, ProcessedOpportunity};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    /// Unrecognised labels fall back to `Medium`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// The analysis output of one cycle for one product, before it is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DecisionDraft {
    pub opportunities: Vec<Opportunity>,
    pub analysis_summary: String,
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    pub confidence_score: Decimal,
}

/// A persisted analysis cycle for one product.
///
/// Immutable once written, apart from `processed` which only grows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub decision_id: Uuid,
    pub product_id: String,
    pub created_at: DateTime<Utc>,
    pub opportunities: Vec<Opportunity>,
    pub analysis_summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    pub confidence_score: Decimal,
    #[serde(default)]
    pub processed: Vec<ProcessedOpportunity>,
}

impl Decision {
    /// Derived id of the opportunity at `position`.
    pub fn opportunity_id(&self, position: usize) -> Option<String> {
        self.opportunities
            .get(position)
            .map(|opp| opportunity_id(self.decision_id, &self.product_id, opp, position))
    }

    pub fn is_processed(&self, opportunity_id: &str) -> bool {
        self.processed
            .iter()
            .any(|entry| entry.opportunity_id == opportunity_id)
    }

    /// Opportunities with their derived ids that have no audit entry yet.
    pub fn unprocessed(&self) -> impl Iterator<Item = (String, &Opportunity)> + '_ {
        self.opportunities
            .iter()
            .enumerate()
            .map(|(i, opp)| (opportunity_id(self.decision_id, &self.product_id, opp, i), opp))
            .filter(|(id, _)| !self.is_processed(id))
    }

    pub fn has_unprocessed(&self) -> bool {
        self.unprocessed().next().is_some()
    }
}

/// One unprocessed opportunity as returned by listing queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpportunityListing {
    pub opportunity_id: String,
    pub product_id: String,
    pub opportunity: Opportunity,
    pub timestamp: DateTime<Utc>,
    pub analysis: String,
}

/// How a processing request found the decision(s) it wrote to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The identifier named its owning decision and that decision was updated.
    Exact,
    /// The identifier named a decision that does not exist; nothing was written.
    Unmatched,
    /// The identifier could not be resolved, so every decision with open
    /// opportunities received the audit entry.
    Ambiguous,
}

/// Result of marking an opportunity as processed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessReceipt {
    pub opportunity_id: String,
    pub decision: ProcessDecision,
    pub trade_id: Option<String>,
    pub bid_id: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub updated_records: usize,
    pub resolution: Resolution,
}
