use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of action an opportunity proposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    /// Move stock from an overstocked store to an understocked one.
    Arbitrage,
    Restock,
    PriceOptimization,
    /// Anything the oracle proposed that we do not recognise.
    #[serde(other)]
    Unknown,
}

impl OpportunityType {
    /// Lenient mapping from the oracle's free-text type label.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "arbitrage" => Self::Arbitrage,
            "restock" => Self::Restock,
            "price_optimization" | "price-optimization" | "price optimization" => {
                Self::PriceOptimization
            }
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arbitrage => "arbitrage",
            Self::Restock => "restock",
            Self::PriceOptimization => "price_optimization",
            Self::Unknown => "unknown",
        }
    }

    /// Types that move stock between two stores and so need both ends named.
    pub fn requires_stores(&self) -> bool {
        matches!(self, Self::Arbitrage | Self::Restock)
    }
}

impl std::fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Unrecognised labels fall back to `Low`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Low,
        }
    }
}

/// A single proposed action surfaced by the oracle for one product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    #[serde(rename = "type")]
    pub kind: OpportunityType,
    /// 0.0 to 1.0.
    pub confidence: Decimal,
    pub potential_profit: Decimal,
    /// Empty when the oracle did not name a store.
    #[serde(default)]
    pub source_store: String,
    #[serde(default)]
    pub target_store: String,
    pub quantity: u32,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub urgency: Urgency,
}

impl Opportunity {
    /// Whether the record names two distinct stores when its type needs them.
    ///
    /// Records failing this are persisted but never executed.
    pub fn is_actionable(&self) -> bool {
        if !self.kind.requires_stores() {
            return true;
        }
        !self.source_store.is_empty()
            && !self.target_store.is_empty()
            && self.source_store != self.target_store
    }

    /// Whether this opportunity moves stock out of or into `store_id`.
    pub fn touches_store(&self, store_id: &str) -> bool {
        self.source_store == store_id || self.target_store == store_id
    }
}

/// Current version tag of the derived opportunity identifier format.
///
/// Bumping it makes every previously recorded processed-audit entry stop
/// matching, so old opportunities resurface instead of silently colliding.
pub const OPPORTUNITY_ID_VERSION: &str = "v1";

/// Derive the identifier of the opportunity at `position` inside a decision.
///
/// Format: `v1-{decision_id hex}-{product_id}-{source_store}-{target_store}-{position}`.
/// The decision id is rendered without hyphens so it can be recovered by
/// [`decision_id_from_opportunity_id`].
pub fn opportunity_id(
    decision_id: Uuid,
    product_id: &str,
    opportunity: &Opportunity,
    position: usize,
) -> String {
    format!(
        "{OPPORTUNITY_ID_VERSION}-{}-{product_id}-{}-{}-{position}",
        decision_id.simple(),
        opportunity.source_store,
        opportunity.target_store,
    )
}

/// Recover the owning decision id from a derived opportunity identifier.
///
/// Returns `None` for identifiers of another version or a malformed decision
/// component.
pub fn decision_id_from_opportunity_id(opportunity_id: &str) -> Option<Uuid> {
    let rest = opportunity_id
        .strip_prefix(OPPORTUNITY_ID_VERSION)?
        .strip_prefix('-')?;
    let (decision_part, _) = rest.split_once('-')?;
    if decision_part.len() != 32 {
        return None;
    }
    Uuid::parse_str(decision_part).ok()
}

/// A human or system verdict on a listed opportunity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessDecision {
    Approved,
    Rejected,
}

impl ProcessDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for ProcessDecision {
    type Err = String;

    /// Exact match only: `approved` or `rejected`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for ProcessDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit entry marking an opportunity as handled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedOpportunity {
    pub opportunity_id: String,
    pub decision: ProcessDecision,
    pub trade_id: Option<String>,
    pub bid_id: Option<String>,
    pub processed_at: DateTime<Utc>,
}
