use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use stockpilot_models::{
    decision_id_from_opportunity_id, Decision, DecisionDraft, InventoryRow, OpportunityListing,
    ProcessDecision, ProcessReceipt, ProcessedOpportunity, ProductRecord, ProductSnapshot,
    Resolution, StoreConfig,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::memory::RecentDecisionCache;
use crate::sqlite::SqliteStore;

/// Decision persistence plus the recent-decision mirror.
///
/// SQLite is the source of truth; every recorded decision is also mirrored
/// into the moka cache under `recent_decision:{product_id}`.
///
/// SQLite access is synchronized via `Mutex` since `rusqlite::Connection` is not `Sync`.
pub struct DecisionStore {
    sqlite: Mutex<SqliteStore>,
    recent: RecentDecisionCache,
}

impl DecisionStore {
    pub fn new(sqlite: SqliteStore, recent_capacity: u64, recent_ttl: Duration) -> Self {
        Self {
            sqlite: Mutex::new(sqlite),
            recent: RecentDecisionCache::new(recent_capacity, recent_ttl),
        }
    }

    /// Open the file-backed store described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let sqlite = SqliteStore::open(&config.sqlite_path)?;
        Ok(Self::new(
            sqlite,
            config.recent_decision_capacity,
            Duration::from_secs(config.recent_decision_ttl_seconds),
        ))
    }

    fn db(&self) -> Result<MutexGuard<'_, SqliteStore>, StoreError> {
        self.sqlite
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    pub fn ping(&self) -> Result<(), StoreError> {
        self.db()?.ping()
    }

    pub fn cache_ping(&self) -> bool {
        self.recent.ping()
    }

    // ---- catalog ----

    pub fn upsert_product(&self, product: &ProductRecord) -> Result<(), StoreError> {
        self.db()?.upsert_product(product)
    }

    pub fn upsert_inventory(&self, product_id: &str, row: &InventoryRow) -> Result<(), StoreError> {
        self.db()?.upsert_inventory(product_id, row)
    }

    /// Fresh snapshot of a product and its inventory, or `None` if unknown.
    pub fn product_snapshot(
        &self,
        product_id: &str,
    ) -> Result<Option<ProductSnapshot>, StoreError> {
        let db = self.db()?;
        let Some(product) = db.product(product_id)? else {
            return Ok(None);
        };
        let inventory = db.inventory(product_id)?;
        Ok(Some(ProductSnapshot {
            product_id: product.product_id,
            name: product.name,
            category: product.category,
            brand: product.brand,
            pricing: product.pricing,
            inventory,
            captured_at: Utc::now(),
        }))
    }

    pub fn active_product_ids(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        self.db()?.active_product_ids(limit)
    }

    pub fn count_active_products(&self) -> Result<usize, StoreError> {
        self.db()?.count_active_products()
    }

    // ---- decisions ----

    /// Persist a new decision and mirror it into the recent-decision cache.
    pub async fn record(
        &self,
        product_id: &str,
        draft: DecisionDraft,
    ) -> Result<Decision, StoreError> {
        let decision = Decision {
            decision_id: Uuid::new_v4(),
            product_id: product_id.to_string(),
            created_at: Utc::now(),
            opportunities: draft.opportunities,
            analysis_summary: draft.analysis_summary,
            recommendations: draft.recommendations,
            risk_level: draft.risk_level,
            confidence_score: draft.confidence_score,
            processed: vec![],
        };

        self.db()?.insert_decision(&decision)?;
        self.recent.put(&decision).await;

        debug!(
            product_id,
            decision_id = %decision.decision_id,
            opportunities = decision.opportunities.len(),
            "Decision recorded"
        );
        Ok(decision)
    }

    /// Latest decision for a product, from the TTL mirror only.
    pub async fn recent_decision(&self, product_id: &str) -> Option<Decision> {
        self.recent.get(product_id).await
    }

    pub fn decision(&self, decision_id: Uuid) -> Result<Option<Decision>, StoreError> {
        self.db()?.decision(decision_id)
    }

    pub fn decisions_for_product(
        &self,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<Decision>, StoreError> {
        self.db()?.decisions_for_product(product_id, limit)
    }

    pub fn count_decisions_since(&self, since: DateTime<Utc>) -> Result<usize, StoreError> {
        self.db()?.count_decisions_since(since)
    }

    /// Unprocessed opportunities, newest decision first.
    ///
    /// Decisions are scanned in pages of `2 * limit` until `limit` listings
    /// are collected or the decisions run out. When `store_id` is given only
    /// opportunities moving stock out of or into that store are returned.
    pub fn list_opportunities(
        &self,
        limit: usize,
        store_id: Option<&str>,
    ) -> Result<Vec<OpportunityListing>, StoreError> {
        let mut listings = Vec::new();
        if limit == 0 {
            return Ok(listings);
        }

        let page = limit.saturating_mul(2);
        let mut offset = 0;
        let db = self.db()?;

        loop {
            let decisions = db.recent_decisions(page, offset)?;
            let exhausted = decisions.len() < page;

            for decision in &decisions {
                for (opportunity_id, opportunity) in decision.unprocessed() {
                    if store_id.is_some_and(|s| !opportunity.touches_store(s)) {
                        continue;
                    }
                    listings.push(OpportunityListing {
                        opportunity_id,
                        product_id: decision.product_id.clone(),
                        opportunity: opportunity.clone(),
                        timestamp: decision.created_at,
                        analysis: decision.analysis_summary.clone(),
                    });
                    if listings.len() == limit {
                        return Ok(listings);
                    }
                }
            }

            if exhausted {
                return Ok(listings);
            }
            offset += page;
        }
    }

    /// Record a verdict on a listed opportunity.
    ///
    /// `decision` must be exactly `approved` or `rejected`; anything else is
    /// refused before any write. Identifiers that do not embed a decision id
    /// fall back to appending the entry to every decision that still has
    /// unprocessed opportunities.
    pub fn mark_processed(
        &self,
        opportunity_id: &str,
        decision: &str,
        trade_id: Option<String>,
        bid_id: Option<String>,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<ProcessReceipt, StoreError> {
        let verdict: ProcessDecision = decision
            .parse()
            .map_err(StoreError::InvalidDecisionValue)?;

        let entry = ProcessedOpportunity {
            opportunity_id: opportunity_id.to_string(),
            decision: verdict,
            trade_id,
            bid_id,
            processed_at: processed_at.unwrap_or_else(Utc::now),
        };

        let mut db = self.db()?;
        let (updated_records, resolution) = match decision_id_from_opportunity_id(opportunity_id) {
            Some(decision_id) => match db.append_processed(decision_id, &entry)? {
                0 => (0, Resolution::Unmatched),
                n => (n, Resolution::Exact),
            },
            None => {
                let targets: Vec<Uuid> = db
                    .decisions_with_unprocessed()?
                    .into_iter()
                    .map(|d| d.decision_id)
                    .collect();
                let updated = db.append_processed_many(&targets, &entry)?;
                warn!(
                    opportunity_id,
                    updated_records = updated,
                    "Opportunity id did not resolve to a decision; applied to all open decisions"
                );
                (updated, Resolution::Ambiguous)
            }
        };

        info!(
            opportunity_id,
            decision = %verdict,
            updated_records,
            ?resolution,
            "Opportunity processed"
        );

        Ok(ProcessReceipt {
            opportunity_id: entry.opportunity_id,
            decision: entry.decision,
            trade_id: entry.trade_id,
            bid_id: entry.bid_id,
            processed_at: entry.processed_at,
            updated_records,
            resolution,
        })
    }
}
