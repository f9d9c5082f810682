//! Control-surface tests: the `Service` facade over an in-memory store,
//! scripted oracles and a recording backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use stockpilot::agents::test_support::{
    seed_product, FailingOracle, RecordingBackend, ScriptedOracle,
};
use stockpilot::agents::Oracle;
use stockpilot::models::{
    decision_id_from_opportunity_id, ProductStatus, Resolution, StockpilotConfig,
};
use stockpilot::service::{CheckState, HealthStatus, ResponseStatus};
use stockpilot::store::{DecisionStore, SqliteStore};
use stockpilot::Service;

const TWO_MOVES_REPLY: &str = r#"{
    "analysis": "S1 overstocked against S2 and S3",
    "opportunities": [
        {"type": "arbitrage", "confidence": 0.8, "potential_profit": 90, "source_store": "S1", "target_store": "S2", "quantity": 100, "reasoning": "S2 nearly empty", "urgency": "high"},
        {"type": "restock", "confidence": 0.65, "potential_profit": 20, "source_store": "S1", "target_store": "S3", "quantity": 30, "reasoning": "S3 under reorder point", "urgency": "medium"}
    ],
    "recommendations": [],
    "risk_level": "low",
    "confidence_score": 0.75
}"#;

fn build(oracle: Arc<dyn Oracle>) -> (Service, Arc<DecisionStore>) {
    let store = Arc::new(DecisionStore::new(
        SqliteStore::open_in_memory().unwrap(),
        100,
        Duration::from_secs(300),
    ));
    let mut config = StockpilotConfig::default();
    config.scheduler.inter_batch_delay_ms = 0;

    let service = Service::new(
        &config,
        Arc::clone(&store),
        oracle,
        Arc::new(RecordingBackend::accepting()),
    );
    (service, store)
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn analyze_then_process_an_opportunity() {
    let (service, store) = build(Arc::new(ScriptedOracle::always(TWO_MOVES_REPLY)));
    seed_product(&store, "P1", &[("S1", 320), ("S2", 5), ("S3", 40)]).unwrap();

    let cycle = service.analyze(&ids(&["P1"])).await;
    assert_eq!(cycle.status, ResponseStatus::Completed);
    assert_eq!(cycle.analyzed_products, 1);
    assert_eq!(cycle.results[0].status, ProductStatus::Completed);

    let listed = service.list_opportunities(10, None).unwrap();
    assert_eq!(listed.status, ResponseStatus::Success);
    assert_eq!(listed.count, 2);

    let first = listed.opportunities[0].opportunity_id.clone();
    let processed = service
        .process_opportunity(&first, "approved", Some("T-1".to_string()), None, None)
        .unwrap();
    assert_eq!(processed.status, ResponseStatus::Success);
    let receipt = processed.receipt.unwrap();
    assert_eq!(receipt.resolution, Resolution::Exact);
    assert_eq!(receipt.updated_records, 1);

    let remaining = service.list_opportunities(10, None).unwrap();
    assert_eq!(remaining.count, 1);
    assert_ne!(remaining.opportunities[0].opportunity_id, first);
}

#[tokio::test]
async fn invalid_verdict_is_an_error_response() {
    let (service, store) = build(Arc::new(ScriptedOracle::always(TWO_MOVES_REPLY)));
    seed_product(&store, "P1", &[("S1", 320), ("S2", 5)]).unwrap();
    service.analyze(&ids(&["P1"])).await;

    let listed = service.list_opportunities(10, None).unwrap();
    let id = &listed.opportunities[0].opportunity_id;

    let response = service.process_opportunity(id, "maybe", None, None, None).unwrap();
    assert_eq!(response.status, ResponseStatus::Error);
    assert!(response.receipt.is_none());
    assert!(response.error.unwrap().contains("maybe"));

    assert_eq!(service.list_opportunities(10, None).unwrap().count, 2);
}

#[tokio::test]
async fn unresolvable_id_reports_ambiguous() {
    let (service, store) = build(Arc::new(ScriptedOracle::always(TWO_MOVES_REPLY)));
    seed_product(&store, "P1", &[("S1", 320), ("S2", 5)]).unwrap();
    seed_product(&store, "P2", &[("S1", 250), ("S2", 12)]).unwrap();
    service.analyze(&ids(&["P1", "P2"])).await;

    let response = service
        .process_opportunity("legacy-id", "rejected", None, None, None)
        .unwrap();
    assert_eq!(response.status, ResponseStatus::Ambiguous);
    let receipt = response.receipt.unwrap();
    assert_eq!(receipt.resolution, Resolution::Ambiguous);
    assert_eq!(receipt.updated_records, 2);

    let json = serde_json::to_value(
        service
            .process_opportunity("legacy-id", "rejected", None, None, None)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(json["status"], "ambiguous");
}

#[tokio::test]
async fn missing_decision_reports_not_found() {
    let (service, store) = build(Arc::new(ScriptedOracle::always(TWO_MOVES_REPLY)));
    seed_product(&store, "P1", &[("S1", 320), ("S2", 5)]).unwrap();
    service.analyze(&ids(&["P1"])).await;

    let orphan = format!("v1-{}-P1-S1-S2-0", "0".repeat(32));
    let response = service
        .process_opportunity(&orphan, "approved", None, None, None)
        .unwrap();
    assert_eq!(response.status, ResponseStatus::NotFound);
    let receipt = response.receipt.unwrap();
    assert_eq!(receipt.resolution, Resolution::Unmatched);
    assert_eq!(receipt.updated_records, 0);
    assert_eq!(service.list_opportunities(10, None).unwrap().count, 2);
}

#[tokio::test]
async fn supplied_processing_time_is_recorded() {
    let (service, store) = build(Arc::new(ScriptedOracle::always(TWO_MOVES_REPLY)));
    seed_product(&store, "P1", &[("S1", 320), ("S2", 5)]).unwrap();
    service.analyze(&ids(&["P1"])).await;

    let listed = service.list_opportunities(10, None).unwrap();
    let id = listed.opportunities[0].opportunity_id.clone();
    let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();

    let response = service
        .process_opportunity(&id, "approved", None, Some("B-7".to_string()), Some(at))
        .unwrap();
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.receipt.unwrap().processed_at, at);

    let decision_id = decision_id_from_opportunity_id(&id).unwrap();
    let decision = store.decision(decision_id).unwrap().unwrap();
    assert_eq!(decision.processed.len(), 1);
    assert_eq!(decision.processed[0].processed_at, at);
    assert_eq!(decision.processed[0].bid_id.as_deref(), Some("B-7"));
}

#[tokio::test]
async fn store_filter_applies_to_listing() {
    let (service, store) = build(Arc::new(ScriptedOracle::always(TWO_MOVES_REPLY)));
    seed_product(&store, "P1", &[("S1", 320), ("S2", 5), ("S3", 40)]).unwrap();
    service.analyze(&ids(&["P1"])).await;

    let s3 = service.list_opportunities(10, Some("S3")).unwrap();
    assert_eq!(s3.count, 1);
    assert_eq!(s3.store_id.as_deref(), Some("S3"));
    assert_eq!(s3.opportunities[0].opportunity.target_store, "S3");
}

#[tokio::test]
async fn background_cycle_covers_active_products() {
    let (service, store) = build(Arc::new(ScriptedOracle::always(TWO_MOVES_REPLY)));
    seed_product(&store, "P1", &[("S1", 320), ("S2", 5)]).unwrap();
    seed_product(&store, "P2", &[("S1", 250), ("S2", 12)]).unwrap();

    let before = Utc::now() - ChronoDuration::minutes(1);
    let (started, handle) = service.start_cycle(10).unwrap();
    assert_eq!(started.status, ResponseStatus::Started);
    assert_eq!(started.product_ids, ids(&["P1", "P2"]));

    let cycle = handle.await.unwrap();
    assert_eq!(cycle.summary.completed, 2);
    assert_eq!(store.count_decisions_since(before).unwrap(), 2);
}

#[tokio::test]
async fn status_reports_products_agents_and_decisions() {
    let (service, store) = build(Arc::new(ScriptedOracle::always(TWO_MOVES_REPLY)));
    seed_product(&store, "P1", &[("S1", 320), ("S2", 5)]).unwrap();
    seed_product(&store, "P2", &[("S1", 250), ("S2", 12)]).unwrap();

    service.run_cycle(1).await.unwrap();

    let status = service.status().await.unwrap();
    assert_eq!(status.status, ResponseStatus::Success);
    assert_eq!(status.active_products, 2);
    assert_eq!(status.cached_agents, 1);
    assert_eq!(status.decisions_last_hour, 1);
}

#[tokio::test]
async fn product_status_after_analysis() {
    let (service, store) = build(Arc::new(ScriptedOracle::always(TWO_MOVES_REPLY)));
    seed_product(&store, "P1", &[("S1", 320), ("S2", 5), ("S3", 40)]).unwrap();

    let before = service.product_status("P1").await.unwrap();
    assert_eq!(before.total_inventory, 365);
    assert_eq!(before.store_count, 3);
    assert_eq!(before.recent_decisions, 0);
    assert!(before.last_analysis.is_none());
    assert!(!before.agent_cached);

    service.analyze(&ids(&["P1"])).await;

    let after = service.product_status("P1").await.unwrap();
    assert_eq!(after.name, "Product P1");
    assert_eq!(after.category, "grocery");
    assert_eq!(after.recent_decisions, 1);
    assert!(after.last_analysis.is_some());
    assert!(after.agent_cached);
    assert_eq!(after.cached_decision.unwrap().product_id, "P1");
}

#[tokio::test]
async fn unknown_product_status_is_an_error() {
    let (service, _store) = build(Arc::new(ScriptedOracle::always(TWO_MOVES_REPLY)));
    let err = service.product_status("NOPE").await.unwrap_err();
    assert!(err.to_string().contains("NOPE"));
}

#[tokio::test]
async fn health_reflects_oracle_availability() {
    let (service, _store) = build(Arc::new(ScriptedOracle::always("{}")));
    let health = service.health().await;
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.checks.database, CheckState::Healthy);

    let (service, _store) = build(Arc::new(FailingOracle));
    let health = service.health().await;
    assert_eq!(health.status, HealthStatus::ConfigurationNeeded);
    assert_eq!(health.checks.oracle_cli, CheckState::Missing);
}
