use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockpilot_models::{InventoryRow, MarketplaceSummary, ProductSnapshot};

/// Stores holding more than this many units count as high-stock.
pub const HIGH_STOCK_UNITS: i64 = 200;
/// Minimum unit difference for a (high, critical-low) pair to be a candidate.
pub const ARBITRAGE_MIN_DIFF: i64 = 100;
pub const MAX_INVENTORY_DETAILS: usize = 15;
pub const MAX_ARBITRAGE_CANDIDATES: usize = 10;

/// Structured document handed to the oracle for one product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisContext {
    pub product_info: ProductInfo,
    pub inventory_summary: InventorySummary,
    pub inventory_details: Vec<InventoryRow>,
    pub arbitrage_candidates: Vec<ArbitrageCandidate>,
    pub marketplace_state: MarketplaceSummary,
    pub analysis_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductInfo {
    pub id: String,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub standard_retail_price: Decimal,
    pub base_cost: Decimal,
    pub margin_targets: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventorySummary {
    pub total_units: i64,
    pub stores_count: usize,
    pub high_stock_stores: usize,
    pub low_stock_stores: usize,
    pub critical_low_stores: usize,
    pub average_stock_per_store: Decimal,
}

/// A pre-computed transfer pair from a high-stock store to a critical-low one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArbitrageCandidate {
    pub source_store: String,
    pub target_store: String,
    pub source_quantity: i64,
    pub target_quantity: i64,
    pub quantity_diff: i64,
    pub target_reorder_point: i64,
    pub source_retail_price: Decimal,
    pub target_retail_price: Decimal,
}

fn is_high_stock(row: &InventoryRow) -> bool {
    row.quantity > HIGH_STOCK_UNITS
}

fn is_low_stock(row: &InventoryRow) -> bool {
    row.quantity < row.reorder_point
}

/// Below half the reorder point.
fn is_critical_low(row: &InventoryRow) -> bool {
    row.quantity * 2 < row.reorder_point
}

/// Build the oracle context for a snapshot. Pure: same inputs, same output.
pub fn build_context(
    snapshot: &ProductSnapshot,
    marketplace: &MarketplaceSummary,
) -> AnalysisContext {
    let inventory = &snapshot.inventory;
    let reference_price = snapshot.pricing.reference_price();
    let total_units = snapshot.total_units();

    let high: Vec<&InventoryRow> = inventory.iter().filter(|r| is_high_stock(r)).collect();
    let critical: Vec<&InventoryRow> = inventory.iter().filter(|r| is_critical_low(r)).collect();

    let mut candidates: Vec<ArbitrageCandidate> = critical
        .iter()
        .flat_map(|low| high.iter().map(move |high| (*high, *low)))
        .filter(|(high, low)| high.store_id != low.store_id)
        .filter_map(|(high, low)| {
            let quantity_diff = high.quantity - low.quantity;
            (quantity_diff > ARBITRAGE_MIN_DIFF).then(|| ArbitrageCandidate {
                source_store: high.store_id.clone(),
                target_store: low.store_id.clone(),
                source_quantity: high.quantity,
                target_quantity: low.quantity,
                quantity_diff,
                target_reorder_point: low.reorder_point,
                source_retail_price: high.retail_price.unwrap_or(reference_price),
                target_retail_price: low.retail_price.unwrap_or(reference_price),
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.quantity_diff
            .cmp(&a.quantity_diff)
            .then_with(|| a.source_store.cmp(&b.source_store))
            .then_with(|| a.target_store.cmp(&b.target_store))
    });
    candidates.truncate(MAX_ARBITRAGE_CANDIDATES);

    let stores = inventory.len();
    let average_stock_per_store =
        (Decimal::from(total_units) / Decimal::from(stores.max(1))).round_dp(2);

    AnalysisContext {
        product_info: ProductInfo {
            id: snapshot.product_id.clone(),
            name: snapshot.name.clone(),
            category: snapshot.category.clone(),
            brand: snapshot.brand.clone(),
            standard_retail_price: reference_price,
            base_cost: snapshot.pricing.base_cost,
            margin_targets: snapshot.pricing.margin_targets.clone(),
        },
        inventory_summary: InventorySummary {
            total_units,
            stores_count: stores,
            high_stock_stores: high.len(),
            low_stock_stores: inventory.iter().filter(|r| is_low_stock(r)).count(),
            critical_low_stores: critical.len(),
            average_stock_per_store,
        },
        inventory_details: inventory.iter().take(MAX_INVENTORY_DETAILS).cloned().collect(),
        arbitrage_candidates: candidates,
        marketplace_state: marketplace.clone(),
        analysis_timestamp: snapshot.captured_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockpilot_models::{MarketActivity, Pricing};

    fn row(store_id: &str, quantity: i64) -> InventoryRow {
        InventoryRow {
            store_id: store_id.to_string(),
            quantity,
            reorder_point: 50,
            retail_price: None,
        }
    }

    fn snapshot(inventory: Vec<InventoryRow>) -> ProductSnapshot {
        ProductSnapshot {
            product_id: "P1".to_string(),
            name: "Cold Brew".to_string(),
            category: "beverages".to_string(),
            brand: "Stumptown".to_string(),
            pricing: Pricing {
                base_cost: dec!(2.10),
                standard_retail: Some(dec!(4.99)),
                margin_targets: serde_json::json!({"target": 0.3}),
            },
            inventory,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn single_imbalance_yields_one_candidate() {
        let ctx = build_context(
            &snapshot(vec![row("S1", 300), row("S2", 10)]),
            &MarketplaceSummary::default(),
        );

        assert_eq!(ctx.inventory_summary.total_units, 310);
        assert_eq!(ctx.inventory_summary.high_stock_stores, 1);
        assert_eq!(ctx.inventory_summary.low_stock_stores, 1);
        assert_eq!(ctx.inventory_summary.critical_low_stores, 1);
        assert_eq!(ctx.inventory_summary.average_stock_per_store, dec!(155));
        assert_eq!(ctx.arbitrage_candidates.len(), 1);

        let c = &ctx.arbitrage_candidates[0];
        assert_eq!(c.source_store, "S1");
        assert_eq!(c.target_store, "S2");
        assert_eq!(c.quantity_diff, 290);
        assert_eq!(c.target_reorder_point, 50);
        assert_eq!(c.source_retail_price, dec!(4.99));
    }

    #[test]
    fn small_difference_is_not_a_candidate() {
        // 201 is high-stock, 20 is critical-low, but the diff needs to exceed 100.
        let ctx = build_context(
            &snapshot(vec![row("S1", 201), row("S2", 20)]),
            &MarketplaceSummary::default(),
        );
        assert_eq!(ctx.arbitrage_candidates.len(), 1);

        let ctx = build_context(
            &snapshot(vec![row("S1", 120), row("S2", 20)]),
            &MarketplaceSummary::default(),
        );
        assert!(ctx.arbitrage_candidates.is_empty());
    }

    #[test]
    fn critical_low_is_strictly_below_half_reorder_point() {
        let ctx = build_context(
            &snapshot(vec![row("S1", 400), row("S2", 25), row("S3", 24)]),
            &MarketplaceSummary::default(),
        );
        assert_eq!(ctx.inventory_summary.critical_low_stores, 1);
        assert_eq!(ctx.inventory_summary.low_stock_stores, 2);
        assert_eq!(ctx.arbitrage_candidates[0].target_store, "S3");
    }

    #[test]
    fn candidates_sorted_and_capped() {
        let mut inventory: Vec<InventoryRow> =
            (0..4).map(|i| row(&format!("H{i}"), 300 + i)).collect();
        inventory.extend((0..4).map(|i| row(&format!("L{i}"), i)));

        let ctx = build_context(&snapshot(inventory), &MarketplaceSummary::default());
        assert_eq!(ctx.arbitrage_candidates.len(), MAX_ARBITRAGE_CANDIDATES);

        let diffs: Vec<i64> = ctx.arbitrage_candidates.iter().map(|c| c.quantity_diff).collect();
        let mut sorted = diffs.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(diffs, sorted);
        // H3 (303) to L0 (0) is the widest gap.
        assert_eq!(ctx.arbitrage_candidates[0].source_store, "H3");
        assert_eq!(ctx.arbitrage_candidates[0].target_store, "L0");
    }

    #[test]
    fn ties_broken_by_store_ids() {
        let ctx = build_context(
            &snapshot(vec![row("B", 300), row("A", 300), row("X", 0)]),
            &MarketplaceSummary::default(),
        );
        let sources: Vec<&str> = ctx
            .arbitrage_candidates
            .iter()
            .map(|c| c.source_store.as_str())
            .collect();
        assert_eq!(sources, vec!["A", "B"]);
    }

    #[test]
    fn inventory_details_capped() {
        let inventory = (0..20).map(|i| row(&format!("S{i:02}"), 60)).collect();
        let ctx = build_context(&snapshot(inventory), &MarketplaceSummary::default());
        assert_eq!(ctx.inventory_details.len(), MAX_INVENTORY_DETAILS);
        assert_eq!(ctx.inventory_summary.stores_count, 20);
    }

    #[test]
    fn empty_inventory_and_marketplace_state() {
        let market = MarketplaceSummary::from_counts(12, 3);
        let snap = snapshot(vec![]);
        let ctx = build_context(&snap, &market);

        assert_eq!(ctx.inventory_summary.average_stock_per_store, dec!(0));
        assert_eq!(ctx.marketplace_state.market_activity, MarketActivity::High);
        assert_eq!(ctx.analysis_timestamp, snap.captured_at);
    }

    #[test]
    fn deterministic_and_input_untouched() {
        let snap = snapshot(vec![row("S1", 300), row("S2", 10), row("S3", 500)]);
        let before = snap.clone();
        let market = MarketplaceSummary::default();

        assert_eq!(build_context(&snap, &market), build_context(&snap, &market));
        assert_eq!(snap, before);
    }
}
