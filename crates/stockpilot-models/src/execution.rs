use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::opportunity::{OpportunityType, Urgency};

/// Bid body posted to the trading backend for an arbitrage transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BidRequest {
    pub product_id: String,
    pub source_store_id: String,
    pub target_store_id: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub max_price: Decimal,
    pub urgency: Urgency,
    pub reasoning: String,
}

/// Why the gate declined to act on an opportunity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    LowConfidence,
    UnsupportedType,
    /// Missing or identical source/target store.
    NotActionable,
}

/// Outcome of one opportunity passing through the execution gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateAction {
    /// The backend accepted the bid.
    Executed { bid: BidRequest },
    /// Execution was attempted and the backend refused or was unreachable.
    Failed { bid: BidRequest, error: String },
    /// Recommendation recorded, no backend call.
    Logged,
    Skipped { reason: SkipReason },
}

impl GateAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Executed { .. } => "executed",
            Self::Failed { .. } => "failed",
            Self::Logged => "logged",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Gate result for one opportunity in a freshly recorded decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpportunityOutcome {
    pub opportunity_id: String,
    pub kind: OpportunityType,
    pub confidence: Decimal,
    pub action: GateAction,
}
