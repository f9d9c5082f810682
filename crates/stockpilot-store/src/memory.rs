use moka::future::Cache;
use std::time::Duration;

use stockpilot_models::store_schema::key_patterns;
use stockpilot_models::Decision;
use tracing::warn;

/// Short-lived mirror of the latest decision per product, backed by moka.
///
/// Answers "what did we last decide" without touching SQLite. Entries expire
/// after the configured TTL; the SQLite store stays the source of truth.
pub struct RecentDecisionCache {
    inner: Cache<String, String>,
}

impl RecentDecisionCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Equivalent of `SET recent_decision:{product_id} <json> EX ttl`.
    pub async fn put(&self, decision: &Decision) {
        match serde_json::to_string(decision) {
            Ok(json) => {
                self.inner
                    .insert(key_patterns::recent_decision(&decision.product_id), json)
                    .await;
            }
            Err(e) => {
                warn!(product_id = %decision.product_id, error = %e, "Failed to mirror decision");
            }
        }
    }

    pub async fn get(&self, product_id: &str) -> Option<Decision> {
        let json = self
            .inner
            .get(&key_patterns::recent_decision(product_id))
            .await?;
        serde_json::from_str(&json).ok()
    }

    /// Liveness probe; the in-process cache is always reachable.
    pub fn ping(&self) -> bool {
        true
    }
}
