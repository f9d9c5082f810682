use std::sync::Arc;

use rust_decimal::Decimal;
use stockpilot_models::{
    BidRequest, Decision, GateAction, Opportunity, OpportunityOutcome, OpportunityType,
    PolicyPreset, SkipReason,
};
use tracing::{info, warn};

use crate::backend::TradingBackend;

/// Confidence thresholds for acting on opportunities. Both are strict
/// (`confidence > threshold`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    pub arbitrage_execute_above: Decimal,
    pub restock_log_above: Decimal,
}

impl GatePolicy {
    /// Orchestrator path: arbitrage > 0.7, restock > 0.6.
    pub fn strict() -> Self {
        Self {
            arbitrage_execute_above: Decimal::new(7, 1),
            restock_log_above: Decimal::new(6, 1),
        }
    }

    /// Single-agent path: arbitrage > 0.6, restock > 0.5.
    pub fn permissive() -> Self {
        Self {
            arbitrage_execute_above: Decimal::new(6, 1),
            restock_log_above: Decimal::new(5, 1),
        }
    }

    /// Decide what to do with one opportunity. Pure; no I/O.
    pub fn evaluate(&self, product_id: &str, opportunity: &Opportunity) -> Verdict {
        match opportunity.kind {
            OpportunityType::Arbitrage => {
                if opportunity.confidence <= self.arbitrage_execute_above {
                    Verdict::Skip(SkipReason::LowConfidence)
                } else if !opportunity.is_actionable() {
                    Verdict::Skip(SkipReason::NotActionable)
                } else {
                    Verdict::Execute(bid_for(product_id, opportunity))
                }
            }
            // Restocks log whatever their stores.
            OpportunityType::Restock => {
                if opportunity.confidence <= self.restock_log_above {
                    Verdict::Skip(SkipReason::LowConfidence)
                } else {
                    Verdict::Log
                }
            }
            OpportunityType::PriceOptimization | OpportunityType::Unknown => {
                Verdict::Skip(SkipReason::UnsupportedType)
            }
        }
    }
}

impl From<PolicyPreset> for GatePolicy {
    fn from(preset: PolicyPreset) -> Self {
        match preset {
            PolicyPreset::Strict => Self::strict(),
            PolicyPreset::Permissive => Self::permissive(),
        }
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::from(PolicyPreset::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Execute(BidRequest),
    Log,
    Skip(SkipReason),
}

/// Bid body for an arbitrage transfer: the offered price is 80% of the
/// projected profit.
pub fn bid_for(product_id: &str, opportunity: &Opportunity) -> BidRequest {
    BidRequest {
        product_id: product_id.to_string(),
        source_store_id: opportunity.source_store.clone(),
        target_store_id: opportunity.target_store.clone(),
        quantity: opportunity.quantity,
        max_price: opportunity.potential_profit * Decimal::new(8, 1),
        urgency: opportunity.urgency,
        reasoning: opportunity.reasoning.clone(),
    }
}

/// Applies a [`GatePolicy`] to every opportunity of a recorded decision.
pub struct ExecutionGate {
    policy: GatePolicy,
    backend: Arc<dyn TradingBackend>,
}

impl ExecutionGate {
    pub fn new(policy: GatePolicy, backend: Arc<dyn TradingBackend>) -> Self {
        Self { policy, backend }
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn backend(&self) -> &Arc<dyn TradingBackend> {
        &self.backend
    }

    /// One outcome per opportunity, in decision order. Backend failures become
    /// `failed` outcomes and are not retried.
    pub async fn apply(&self, decision: &Decision) -> Vec<OpportunityOutcome> {
        let mut outcomes = Vec::with_capacity(decision.opportunities.len());

        for (position, opportunity) in decision.opportunities.iter().enumerate() {
            let opportunity_id = decision.opportunity_id(position).unwrap_or_default();
            let action = match self.policy.evaluate(&decision.product_id, opportunity) {
                Verdict::Execute(bid) => match self.backend.submit_bid(&bid).await {
                    Ok(()) => {
                        info!(
                            product_id = %decision.product_id,
                            opportunity_id = %opportunity_id,
                            quantity = bid.quantity,
                            max_price = %bid.max_price,
                            "Arbitrage bid created"
                        );
                        GateAction::Executed { bid }
                    }
                    Err(e) => {
                        warn!(
                            product_id = %decision.product_id,
                            opportunity_id = %opportunity_id,
                            error = %e,
                            "Arbitrage bid failed"
                        );
                        GateAction::Failed {
                            bid,
                            error: e.to_string(),
                        }
                    }
                },
                Verdict::Log => {
                    info!(
                        product_id = %decision.product_id,
                        opportunity_id = %opportunity_id,
                        source = %opportunity.source_store,
                        target = %opportunity.target_store,
                        quantity = opportunity.quantity,
                        reasoning = %opportunity.reasoning,
                        "Restock recommendation"
                    );
                    GateAction::Logged
                }
                Verdict::Skip(reason) => {
                    info!(
                        product_id = %decision.product_id,
                        opportunity_id = %opportunity_id,
                        kind = %opportunity.kind,
                        confidence = %opportunity.confidence,
                        ?reason,
                        "Opportunity skipped"
                    );
                    GateAction::Skipped { reason }
                }
            };

            outcomes.push(OpportunityOutcome {
                opportunity_id,
                kind: opportunity.kind,
                confidence: opportunity.confidence,
                action,
            });
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockpilot_models::Urgency;

    fn opp(kind: OpportunityType, confidence: Decimal, source: &str, target: &str) -> Opportunity {
        Opportunity {
            kind,
            confidence,
            potential_profit: dec!(120),
            source_store: source.to_string(),
            target_store: target.to_string(),
            quantity: 100,
            reasoning: "imbalance".to_string(),
            urgency: Urgency::High,
        }
    }

    #[test]
    fn strict_arbitrage_threshold_is_exclusive() {
        let policy = GatePolicy::strict();
        let at = opp(OpportunityType::Arbitrage, dec!(0.7), "S1", "S2");
        let above = opp(OpportunityType::Arbitrage, dec!(0.71), "S1", "S2");

        assert_eq!(policy.evaluate("P1", &at), Verdict::Skip(SkipReason::LowConfidence));
        assert!(matches!(policy.evaluate("P1", &above), Verdict::Execute(_)));
    }

    #[test]
    fn permissive_thresholds() {
        let policy = GatePolicy::permissive();
        assert!(matches!(
            policy.evaluate("P1", &opp(OpportunityType::Arbitrage, dec!(0.65), "S1", "S2")),
            Verdict::Execute(_)
        ));
        assert_eq!(
            policy.evaluate("P1", &opp(OpportunityType::Restock, dec!(0.55), "S1", "S2")),
            Verdict::Log
        );
        assert_eq!(
            policy.evaluate("P1", &opp(OpportunityType::Restock, dec!(0.5), "S1", "S2")),
            Verdict::Skip(SkipReason::LowConfidence)
        );
    }

    #[test]
    fn strict_restock_at_055_is_skipped() {
        let restock = opp(OpportunityType::Restock, dec!(0.55), "S1", "S2");
        assert_eq!(
            GatePolicy::strict().evaluate("P1", &restock),
            Verdict::Skip(SkipReason::LowConfidence)
        );
    }

    #[test]
    fn non_actionable_arbitrage_never_executes() {
        let policy = GatePolicy::permissive();
        for (source, target) in [("", "S2"), ("S1", ""), ("S1", "S1"), ("", "")] {
            let arbitrage = opp(OpportunityType::Arbitrage, dec!(0.99), source, target);
            assert_eq!(
                policy.evaluate("P1", &arbitrage),
                Verdict::Skip(SkipReason::NotActionable)
            );
        }
    }

    #[test]
    fn restock_logs_without_stores() {
        let policy = GatePolicy::permissive();
        for (source, target) in [("", ""), ("", "S2"), ("S1", "S1")] {
            let restock = opp(OpportunityType::Restock, dec!(0.55), source, target);
            assert_eq!(policy.evaluate("P1", &restock), Verdict::Log);
        }
    }

    #[test]
    fn unsupported_types_skipped() {
        let policy = GatePolicy::permissive();
        for kind in [OpportunityType::PriceOptimization, OpportunityType::Unknown] {
            assert_eq!(
                policy.evaluate("P1", &opp(kind, dec!(1), "S1", "S2")),
                Verdict::Skip(SkipReason::UnsupportedType)
            );
        }
    }

    #[test]
    fn bid_offers_eighty_percent_of_profit() {
        let bid = bid_for("P1", &opp(OpportunityType::Arbitrage, dec!(0.9), "S1", "S2"));
        assert_eq!(bid.max_price, dec!(96));
        assert_eq!(bid.product_id, "P1");
        assert_eq!(bid.source_store_id, "S1");
        assert_eq!(bid.target_store_id, "S2");
        assert_eq!(bid.quantity, 100);
    }

    #[test]
    fn preset_mapping() {
        assert_eq!(GatePolicy::from(PolicyPreset::Strict), GatePolicy::strict());
        assert_eq!(GatePolicy::from(PolicyPreset::Permissive), GatePolicy::permissive());
        assert_eq!(GatePolicy::default(), GatePolicy::strict());
    }
}
