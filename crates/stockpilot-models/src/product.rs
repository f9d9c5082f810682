use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reorder point assumed when an inventory row does not carry one.
pub const DEFAULT_REORDER_POINT: i64 = 50;

/// Pricing information for a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Pricing {
    pub base_cost: Decimal,
    pub standard_retail: Option<Decimal>,
    /// Free-form margin targets (e.g. `{"min": 0.15, "target": 0.25}`).
    #[serde(default)]
    pub margin_targets: serde_json::Value,
}

impl Pricing {
    /// Standard retail, falling back to base cost.
    pub fn reference_price(&self) -> Decimal {
        self.standard_retail.unwrap_or(self.base_cost)
    }
}

/// A product catalog entry as stored in the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub pricing: Pricing,
    pub is_active: bool,
}

/// Stock of one product at one store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryRow {
    pub store_id: String,
    pub quantity: i64,
    #[serde(default = "default_reorder_point")]
    pub reorder_point: i64,
    pub retail_price: Option<Decimal>,
}

fn default_reorder_point() -> i64 {
    DEFAULT_REORDER_POINT
}

/// Per-cycle, read-only view of a product and its stock across stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSnapshot {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub pricing: Pricing,
    pub inventory: Vec<InventoryRow>,
    pub captured_at: DateTime<Utc>,
}

impl ProductSnapshot {
    pub fn total_units(&self) -> i64 {
        self.inventory.iter().map(|row| row.quantity).sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarketActivity {
    High,
    #[default]
    Low,
}

/// Current activity on the trading backend's marketplace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MarketplaceSummary {
    pub active_bids: usize,
    pub recent_matches: usize,
    pub market_activity: MarketActivity,
}

impl MarketplaceSummary {
    /// Active bid count above which the market is considered busy.
    pub const HIGH_ACTIVITY_BIDS: usize = 10;

    pub fn from_counts(active_bids: usize, recent_matches: usize) -> Self {
        let market_activity = if active_bids > Self::HIGH_ACTIVITY_BIDS {
            MarketActivity::High
        } else {
            MarketActivity::Low
        };
        Self {
            active_bids,
            recent_matches,
            market_activity,
        }
    }
}
