use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use stockpilot_models::store_schema::{DecisionRow, STORE_DDL};
use stockpilot_models::{
    Decision, InventoryRow, Pricing, ProcessDecision, ProcessedOpportunity, ProductRecord,
    RiskLevel,
};
use uuid::Uuid;

use crate::error::StoreError;

/// Upper bound on inventory rows loaded for a single product.
pub const MAX_INVENTORY_ROWS: usize = 1_000;

const DECISION_COLUMNS: &str = "decision_id, product_id, created_at, opportunities_json, \
     analysis_summary, recommendations_json, risk_level, confidence_score";

/// SQLite-backed document store for products, inventory and decisions.
///
/// Every write touches a single row, apart from the multi-decision audit
/// append which runs in one transaction.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a read-write connection, creating the schema if needed. Enables WAL.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(STORE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database with the schema applied. Useful for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(STORE_DDL)?;
        Ok(Self { conn })
    }

    pub fn ping(&self) -> Result<(), StoreError> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    // ---- products & inventory ----

    pub fn upsert_product(&self, product: &ProductRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO products \
             (product_id, name, category, brand, pricing_json, is_active, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                product.product_id,
                product.name,
                product.category,
                product.brand,
                serde_json::to_string(&product.pricing)?,
                product.is_active,
                timestamp(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    pub fn upsert_inventory(&self, product_id: &str, row: &InventoryRow) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO inventory \
             (product_id, store_id, quantity, reorder_point, retail_price) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                product_id,
                row.store_id,
                row.quantity,
                row.reorder_point,
                row.retail_price.map(|p| p.to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn product(&self, product_id: &str) -> Result<Option<ProductRecord>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT product_id, name, category, brand, pricing_json, is_active \
             FROM products WHERE product_id = ?1",
        )?;

        let result = stmt.query_row(params![product_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
            ))
        });

        let (product_id, name, category, brand, pricing_json, is_active) = match result {
            Ok(fields) => fields,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(StoreError::Sqlite(e)),
        };

        let pricing: Pricing = serde_json::from_str(&pricing_json)?;
        Ok(Some(ProductRecord {
            product_id,
            name,
            category,
            brand,
            pricing,
            is_active,
        }))
    }

    /// Inventory rows for a product, ordered by store id, at most
    /// [`MAX_INVENTORY_ROWS`].
    pub fn inventory(&self, product_id: &str) -> Result<Vec<InventoryRow>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT store_id, quantity, reorder_point, retail_price \
             FROM inventory WHERE product_id = ?1 ORDER BY store_id LIMIT ?2",
        )?;

        let raw = stmt
            .query_map(params![product_id, MAX_INVENTORY_ROWS as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(store_id, quantity, reorder_point, retail_price)| {
                Ok(InventoryRow {
                    store_id,
                    quantity,
                    reorder_point,
                    retail_price: retail_price.as_deref().map(parse_decimal).transpose()?,
                })
            })
            .collect()
    }

    /// Ids of active products, in a stable order.
    pub fn active_product_ids(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT product_id FROM products WHERE is_active = 1 ORDER BY product_id LIMIT ?1",
        )?;
        let ids = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    pub fn count_active_products(&self) -> Result<usize, StoreError> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ---- decisions ----

    pub fn insert_decision(&self, decision: &Decision) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO decisions \
             (decision_id, product_id, created_at, opportunities_json, analysis_summary, \
              recommendations_json, risk_level, confidence_score) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                decision.decision_id.to_string(),
                decision.product_id,
                timestamp(&decision.created_at),
                serde_json::to_string(&decision.opportunities)?,
                decision.analysis_summary,
                serde_json::to_string(&decision.recommendations)?,
                decision.risk_level.as_str(),
                decision.confidence_score.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn decision(&self, decision_id: Uuid) -> Result<Option<Decision>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {DECISION_COLUMNS} FROM decisions WHERE decision_id = ?1"
        ))?;

        let row = match stmt.query_row(params![decision_id.to_string()], decision_row) {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(StoreError::Sqlite(e)),
        };
        self.hydrate(row).map(Some)
    }

    /// Decisions newest first, paged by `limit`/`offset`.
    pub fn recent_decisions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Decision>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {DECISION_COLUMNS} FROM decisions \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
            .query_map(params![limit as i64, offset as i64], decision_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|row| self.hydrate(row)).collect()
    }

    pub fn decisions_for_product(
        &self,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<Decision>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {DECISION_COLUMNS} FROM decisions WHERE product_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![product_id, limit as i64], decision_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|row| self.hydrate(row)).collect()
    }

    pub fn count_decisions_since(&self, since: DateTime<Utc>) -> Result<usize, StoreError> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM decisions WHERE created_at >= ?1",
            params![timestamp(&since)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Every decision that still has at least one unprocessed opportunity.
    pub fn decisions_with_unprocessed(&self) -> Result<Vec<Decision>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {DECISION_COLUMNS} FROM decisions WHERE opportunities_json != '[]' \
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map([], decision_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut open = Vec::new();
        for row in rows {
            let decision = self.hydrate(row)?;
            if decision.has_unprocessed() {
                open.push(decision);
            }
        }
        Ok(open)
    }

    /// Append an audit entry to one decision. Returns the number of decisions
    /// updated (0 when the decision does not exist).
    pub fn append_processed(
        &self,
        decision_id: Uuid,
        entry: &ProcessedOpportunity,
    ) -> Result<usize, StoreError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM decisions WHERE decision_id = ?1)",
            params![decision_id.to_string()],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(0);
        }
        insert_processed(&self.conn, decision_id, entry)?;
        Ok(1)
    }

    /// Append the same audit entry to several decisions in one transaction.
    pub fn append_processed_many(
        &mut self,
        decision_ids: &[Uuid],
        entry: &ProcessedOpportunity,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        for decision_id in decision_ids {
            insert_processed(&tx, *decision_id, entry)?;
        }
        tx.commit()?;
        Ok(decision_ids.len())
    }

    fn processed_for(&self, decision_id: &str) -> Result<Vec<ProcessedOpportunity>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT opportunity_id, decision, trade_id, bid_id, processed_at \
             FROM processed_opportunities WHERE decision_id = ?1 ORDER BY id",
        )?;
        let raw = stmt
            .query_map(params![decision_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(opportunity_id, decision, trade_id, bid_id, processed_at)| {
                Ok(ProcessedOpportunity {
                    opportunity_id,
                    decision: ProcessDecision::from_str(&decision).map_err(|bad| {
                        StoreError::Corrupt(format!("processed decision value '{bad}'"))
                    })?,
                    trade_id,
                    bid_id,
                    processed_at: parse_timestamp(&processed_at)?,
                })
            })
            .collect()
    }

    fn hydrate(&self, row: DecisionRow) -> Result<Decision, StoreError> {
        let processed = self.processed_for(&row.decision_id)?;
        Ok(Decision {
            decision_id: Uuid::parse_str(&row.decision_id)
                .map_err(|e| StoreError::Corrupt(format!("decision_id: {e}")))?,
            product_id: row.product_id,
            created_at: parse_timestamp(&row.created_at)?,
            opportunities: serde_json::from_str(&row.opportunities_json)?,
            analysis_summary: row.analysis_summary,
            recommendations: serde_json::from_str(&row.recommendations_json)?,
            risk_level: RiskLevel::from_label(&row.risk_level),
            confidence_score: parse_decimal(&row.confidence_score)?,
            processed,
        })
    }
}

fn insert_processed(
    conn: &Connection,
    decision_id: Uuid,
    entry: &ProcessedOpportunity,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO processed_opportunities \
         (decision_id, opportunity_id, decision, trade_id, bid_id, processed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            decision_id.to_string(),
            entry.opportunity_id,
            entry.decision.as_str(),
            entry.trade_id,
            entry.bid_id,
            timestamp(&entry.processed_at),
        ],
    )?;
    Ok(())
}

fn decision_row(row: &Row<'_>) -> rusqlite::Result<DecisionRow> {
    Ok(DecisionRow {
        decision_id: row.get(0)?,
        product_id: row.get(1)?,
        created_at: row.get(2)?,
        opportunities_json: row.get(3)?,
        analysis_summary: row.get(4)?,
        recommendations_json: row.get(5)?,
        risk_level: row.get(6)?,
        confidence_score: row.get(7)?,
    })
}

/// Fixed-width UTC timestamps so lexical order matches chronological order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{raw}': {e}")))
}

fn parse_decimal(raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw).map_err(|e| StoreError::Corrupt(format!("decimal '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use stockpilot_models::{Opportunity, OpportunityType, Urgency};

    fn product(id: &str, active: bool) -> ProductRecord {
        ProductRecord {
            product_id: id.to_string(),
            name: format!("Product {id}"),
            category: "grocery".to_string(),
            brand: "Acme".to_string(),
            pricing: Pricing {
                base_cost: dec!(2.50),
                standard_retail: Some(dec!(4.99)),
                margin_targets: serde_json::json!({"target": 0.25}),
            },
            is_active: active,
        }
    }

    fn decision(product_id: &str, created_at: DateTime<Utc>, stores: &[(&str, &str)]) -> Decision {
        Decision {
            decision_id: Uuid::new_v4(),
            product_id: product_id.to_string(),
            created_at,
            opportunities: stores
                .iter()
                .map(|(source, target)| Opportunity {
                    kind: OpportunityType::Arbitrage,
                    confidence: dec!(0.8),
                    potential_profit: dec!(100),
                    source_store: source.to_string(),
                    target_store: target.to_string(),
                    quantity: 10,
                    reasoning: "imbalance".to_string(),
                    urgency: Urgency::High,
                })
                .collect(),
            analysis_summary: "summary".to_string(),
            recommendations: vec!["move stock".to_string()],
            risk_level: RiskLevel::Medium,
            confidence_score: dec!(0.65),
            processed: vec![],
        }
    }

    fn entry(opportunity_id: &str) -> ProcessedOpportunity {
        ProcessedOpportunity {
            opportunity_id: opportunity_id.to_string(),
            decision: ProcessDecision::Approved,
            trade_id: Some("T-1".to_string()),
            bid_id: None,
            processed_at: Utc::now(),
        }
    }

    #[test]
    fn product_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_product(&product("P1", true)).unwrap();

        let loaded = store.product("P1").unwrap().unwrap();
        assert_eq!(loaded, product("P1", true));
        assert!(store.product("missing").unwrap().is_none());
    }

    #[test]
    fn inventory_ordered_by_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (store_id, qty) in [("S3", 5), ("S1", 300), ("S2", 40)] {
            store
                .upsert_inventory(
                    "P1",
                    &InventoryRow {
                        store_id: store_id.to_string(),
                        quantity: qty,
                        reorder_point: 50,
                        retail_price: Some(dec!(4.99)),
                    },
                )
                .unwrap();
        }

        let rows = store.inventory("P1").unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.store_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3"]);
        assert_eq!(rows[0].retail_price, Some(dec!(4.99)));
    }

    #[test]
    fn active_products_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_product(&product("P2", true)).unwrap();
        store.upsert_product(&product("P1", true)).unwrap();
        store.upsert_product(&product("P3", false)).unwrap();

        assert_eq!(store.active_product_ids(10).unwrap(), vec!["P1", "P2"]);
        assert_eq!(store.active_product_ids(1).unwrap(), vec!["P1"]);
        assert_eq!(store.count_active_products().unwrap(), 2);
    }

    #[test]
    fn recent_decisions_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        let old = decision("P1", now - Duration::minutes(10), &[("S1", "S2")]);
        let new = decision("P2", now, &[("S3", "S4")]);
        store.insert_decision(&old).unwrap();
        store.insert_decision(&new).unwrap();

        let page = store.recent_decisions(10, 0).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].decision_id, new.decision_id);
        assert_eq!(page[1], old);

        let second_page = store.recent_decisions(1, 1).unwrap();
        assert_eq!(second_page[0].decision_id, old.decision_id);
    }

    #[test]
    fn append_processed_to_existing_decision() {
        let store = SqliteStore::open_in_memory().unwrap();
        let d = decision("P1", Utc::now(), &[("S1", "S2")]);
        store.insert_decision(&d).unwrap();

        let id = d.opportunity_id(0).unwrap();
        assert_eq!(store.append_processed(d.decision_id, &entry(&id)).unwrap(), 1);
        assert_eq!(store.append_processed(Uuid::new_v4(), &entry(&id)).unwrap(), 0);

        let loaded = store.decision(d.decision_id).unwrap().unwrap();
        assert_eq!(loaded.processed.len(), 1);
        assert!(loaded.is_processed(&id));
    }

    #[test]
    fn decisions_with_unprocessed_skips_fully_processed() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let done = decision("P1", Utc::now(), &[("S1", "S2")]);
        let open = decision("P2", Utc::now(), &[("S3", "S4")]);
        let empty = decision("P3", Utc::now(), &[]);
        for d in [&done, &open, &empty] {
            store.insert_decision(d).unwrap();
        }
        store
            .append_processed(done.decision_id, &entry(&done.opportunity_id(0).unwrap()))
            .unwrap();

        let pending = store.decisions_with_unprocessed().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].decision_id, open.decision_id);

        let updated = store
            .append_processed_many(&[open.decision_id], &entry("whatever"))
            .unwrap();
        assert_eq!(updated, 1);
    }

    #[test]
    fn count_decisions_since() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .insert_decision(&decision("P1", now - Duration::hours(2), &[]))
            .unwrap();
        store.insert_decision(&decision("P1", now, &[])).unwrap();

        assert_eq!(
            store.count_decisions_since(now - Duration::hours(1)).unwrap(),
            1
        );
        assert_eq!(store.decisions_for_product("P1", 5).unwrap().len(), 2);
    }
}
