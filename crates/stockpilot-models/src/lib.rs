pub mod config;
pub mod decision;
pub mod execution;
pub mod opportunity;
pub mod product;
pub mod report;
pub mod store_schema;

pub use config::{
    AgentsConfig, BackendConfig, OracleConfig, PolicyPreset, SchedulerConfig, StockpilotConfig,
    StoreConfig,
};
pub use decision::{
    Decision, DecisionDraft, OpportunityListing, ProcessReceipt, Resolution, RiskLevel,
};
pub use execution::{BidRequest, GateAction, OpportunityOutcome, SkipReason};
pub use opportunity::{
    decision_id_from_opportunity_id, opportunity_id, Opportunity, OpportunityType,
    ProcessDecision, ProcessedOpportunity, Urgency,
};
pub use product::{
    InventoryRow, MarketActivity, MarketplaceSummary, Pricing, ProductRecord, ProductSnapshot,
};
pub use report::{CycleSummary, ProductReport, ProductStatus};
