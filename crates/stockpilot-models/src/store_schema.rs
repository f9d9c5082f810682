/// The SQLite schema of the document store.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS products (
///     product_id    TEXT PRIMARY KEY,
///     name          TEXT NOT NULL,
///     category      TEXT NOT NULL,
///     brand         TEXT NOT NULL,
///     pricing_json  TEXT NOT NULL,
///     is_active     INTEGER NOT NULL DEFAULT 1,
///     updated_at    TEXT NOT NULL
/// );
///
/// CREATE TABLE IF NOT EXISTS inventory (
///     product_id     TEXT NOT NULL,
///     store_id       TEXT NOT NULL,
///     quantity       INTEGER NOT NULL,
///     reorder_point  INTEGER NOT NULL DEFAULT 50,
///     retail_price   TEXT,
///     PRIMARY KEY (product_id, store_id)
/// );
///
/// CREATE TABLE IF NOT EXISTS decisions (...);
/// CREATE TABLE IF NOT EXISTS processed_opportunities (...);
/// ```
pub const STORE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS products (
    product_id    TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    category      TEXT NOT NULL,
    brand         TEXT NOT NULL,
    pricing_json  TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1,
    updated_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_products_active ON products(is_active);

CREATE TABLE IF NOT EXISTS inventory (
    product_id     TEXT NOT NULL,
    store_id       TEXT NOT NULL,
    quantity       INTEGER NOT NULL,
    reorder_point  INTEGER NOT NULL DEFAULT 50,
    retail_price   TEXT,
    PRIMARY KEY (product_id, store_id)
);

CREATE TABLE IF NOT EXISTS decisions (
    decision_id        TEXT PRIMARY KEY,
    product_id         TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    opportunities_json TEXT NOT NULL,
    analysis_summary   TEXT NOT NULL,
    recommendations_json TEXT NOT NULL,
    risk_level         TEXT NOT NULL,
    confidence_score   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_decisions_created ON decisions(created_at);
CREATE INDEX IF NOT EXISTS idx_decisions_product ON decisions(product_id);

CREATE TABLE IF NOT EXISTS processed_opportunities (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    decision_id     TEXT NOT NULL,
    opportunity_id  TEXT NOT NULL,
    decision        TEXT NOT NULL,
    trade_id        TEXT,
    bid_id          TEXT,
    processed_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_processed_decision ON processed_opportunities(decision_id);
";

/// Key conventions for the recent-decision mirror.
///
/// - Latest decision per product: `recent_decision:{product_id}`
pub mod key_patterns {
    pub fn recent_decision(product_id: &str) -> String {
        format!("recent_decision:{product_id}")
    }
}

/// A raw `decisions` row as read from SQLite.
#[derive(Debug, Clone)]
pub struct DecisionRow {
    pub decision_id: String,
    pub product_id: String,
    pub created_at: String,
    pub opportunities_json: String,
    pub analysis_summary: String,
    pub recommendations_json: String,
    pub risk_level: String,
    pub confidence_score: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_pattern_recent_decision() {
        assert_eq!(
            key_patterns::recent_decision("P-1"),
            "recent_decision:P-1"
        );
    }

    #[test]
    fn ddl_declares_all_tables() {
        for table in ["products", "inventory", "decisions", "processed_opportunities"] {
            assert!(
                STORE_DDL.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "missing {table}"
            );
        }
    }
}
