//! Test doubles for the oracle, trading backend and product analyzer, plus
//! store seeding helpers.
//!
//! Used by unit tests in this crate and by the scenario tests under `tests/`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use stockpilot_models::{
    BidRequest, InventoryRow, MarketplaceSummary, Pricing, ProductRecord, ProductReport,
    ProductStatus,
};
use stockpilot_store::{DecisionStore, StoreError};

use crate::backend::TradingBackend;
use crate::error::AgentError;
use crate::oracle::Oracle;
use crate::scheduler::ProductAnalyzer;

/// An oracle that returns canned replies, optionally per product.
///
/// The product is recognised from the fixed system prompt, which names it.
pub struct ScriptedOracle {
    default_reply: Option<String>,
    replies: HashMap<String, String>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    /// Same reply for every product.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            default_reply: Some(reply.into()),
            replies: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// A reply per product id; unknown products get a CLI error.
    pub fn per_product<I, K, V>(replies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            default_reply: None,
            replies: replies
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let per_product = self
            .replies
            .iter()
            .find(|(product_id, _)| system_prompt.contains(&format!("product {product_id} ")))
            .map(|(_, reply)| reply.clone());

        per_product
            .or_else(|| self.default_reply.clone())
            .ok_or_else(|| AgentError::Cli("no scripted reply for this product".to_string()))
    }
}

/// An oracle whose every call fails like a crashed CLI, and which reports
/// itself unavailable.
pub struct FailingOracle;

#[async_trait]
impl Oracle for FailingOracle {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, AgentError> {
        Err(AgentError::Cli("mock oracle failure".to_string()))
    }

    async fn available(&self) -> bool {
        false
    }
}

/// In-memory trading backend that records submitted bids.
pub struct RecordingBackend {
    accept_bids: bool,
    bids: Mutex<Vec<BidRequest>>,
}

impl RecordingBackend {
    pub fn accepting() -> Self {
        Self {
            accept_bids: true,
            bids: Mutex::new(Vec::new()),
        }
    }

    pub fn refusing() -> Self {
        Self {
            accept_bids: false,
            ..Self::accepting()
        }
    }

    pub fn bids(&self) -> Vec<BidRequest> {
        self.bids.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TradingBackend for RecordingBackend {
    async fn marketplace_summary(&self) -> MarketplaceSummary {
        MarketplaceSummary::default()
    }

    async fn submit_bid(&self, bid: &BidRequest) -> Result<(), AgentError> {
        if let Ok(mut bids) = self.bids.lock() {
            bids.push(bid.clone());
        }
        if self.accept_bids {
            Ok(())
        } else {
            Err(AgentError::BackendExecutionFailure {
                status: 409,
                body: "bid rejected".to_string(),
            })
        }
    }
}

/// Analyzer that completes every product and tracks peak concurrency.
#[derive(Default)]
pub struct RecordingAnalyzer {
    jitter: bool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingAnalyzer {
    /// Later product ids finish sooner, so completion order differs from
    /// input order.
    pub fn with_jitter() -> Self {
        Self {
            jitter: true,
            ..Self::default()
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductAnalyzer for RecordingAnalyzer {
    async fn analyze(&self, product_id: &str) -> ProductReport {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.jitter {
            let rank = product_id.bytes().next().map(u64::from).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(200u64.saturating_sub(rank))).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        completed_report(product_id)
    }
}

/// Analyzer that reports an error for the listed products.
pub struct FailingAnalyzer {
    failing: Vec<String>,
}

impl FailingAnalyzer {
    pub fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ProductAnalyzer for FailingAnalyzer {
    async fn analyze(&self, product_id: &str) -> ProductReport {
        if self.failing.iter().any(|p| p == product_id) {
            ProductReport::failed(product_id, "mock analysis failure", 0)
        } else {
            completed_report(product_id)
        }
    }
}

/// Analyzer that panics for one product.
pub struct PanickingAnalyzer {
    product_id: String,
}

impl PanickingAnalyzer {
    pub fn new(product_id: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
        }
    }
}

#[async_trait]
impl ProductAnalyzer for PanickingAnalyzer {
    async fn analyze(&self, product_id: &str) -> ProductReport {
        if product_id == self.product_id {
            panic!("analysis blew up for {product_id}");
        }
        completed_report(product_id)
    }
}

fn completed_report(product_id: &str) -> ProductReport {
    ProductReport {
        product_id: product_id.to_string(),
        status: ProductStatus::Completed,
        decision_id: None,
        opportunities_found: 0,
        opportunities_dropped: 0,
        outcomes: vec![],
        error: None,
        elapsed_ms: 0,
        analyzed_at: Utc::now(),
    }
}

/// Insert an active product with the given `(store_id, quantity)` stock.
/// Reorder points default to 50 and retail price to the product's standard
/// retail of 4.99.
pub fn seed_product(
    store: &DecisionStore,
    product_id: &str,
    stock: &[(&str, i64)],
) -> Result<(), StoreError> {
    store.upsert_product(&ProductRecord {
        product_id: product_id.to_string(),
        name: format!("Product {product_id}"),
        category: "grocery".to_string(),
        brand: "Acme".to_string(),
        pricing: Pricing {
            base_cost: Decimal::new(250, 2),
            standard_retail: Some(Decimal::new(499, 2)),
            margin_targets: serde_json::json!({"target": 0.25}),
        },
        is_active: true,
    })?;
    for (store_id, quantity) in stock {
        store.upsert_inventory(
            product_id,
            &InventoryRow {
                store_id: store_id.to_string(),
                quantity: *quantity,
                reorder_point: stockpilot_models::product::DEFAULT_REORDER_POINT,
                retail_price: None,
            },
        )?;
    }
    Ok(())
}
