use std::sync::Arc;

use async_trait::async_trait;
use stockpilot_models::{AgentsConfig, ProductReport};
use stockpilot_store::DecisionStore;
use tracing::info;

use crate::agent::ProductAgent;
use crate::agent_cache::AgentCache;
use crate::backend::TradingBackend;
use crate::gate::{ExecutionGate, GatePolicy};
use crate::oracle::Oracle;
use crate::scheduler::ProductAnalyzer;

/// Routes each product to its cached [`ProductAgent`].
pub struct Orchestrator {
    agents: AgentCache<ProductAgent>,
    store: Arc<DecisionStore>,
    gate: Arc<ExecutionGate>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<DecisionStore>,
        oracle: Arc<dyn Oracle>,
        backend: Arc<dyn TradingBackend>,
        config: &AgentsConfig,
    ) -> Self {
        let policy = GatePolicy::from(config.policy);
        let gate = Arc::new(ExecutionGate::new(policy, backend));
        let oracle_name = oracle.name().to_string();

        let agents = {
            let store = Arc::clone(&store);
            let gate = Arc::clone(&gate);
            AgentCache::new(config.cache_capacity, move |product_id: &str| {
                ProductAgent::new(
                    product_id,
                    Arc::clone(&oracle),
                    Arc::clone(&store),
                    Arc::clone(&gate),
                )
            })
        };

        info!(
            policy = ?config.policy,
            cache_capacity = config.cache_capacity,
            oracle = %oracle_name,
            "Orchestrator ready"
        );

        Self {
            agents,
            store,
            gate,
        }
    }

    pub fn agents(&self) -> &AgentCache<ProductAgent> {
        &self.agents
    }

    pub fn store(&self) -> &Arc<DecisionStore> {
        &self.store
    }

    pub fn policy(&self) -> GatePolicy {
        self.gate.policy()
    }

    pub async fn analyze_product(&self, product_id: &str) -> ProductReport {
        self.agents.get_or_create(product_id).await.analyze().await
    }
}

#[async_trait]
impl ProductAnalyzer for Orchestrator {
    async fn analyze(&self, product_id: &str) -> ProductReport {
        self.analyze_product(product_id).await
    }
}
