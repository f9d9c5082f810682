use serde::{Deserialize, Serialize};

/// Top-level configuration for stockpilot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StockpilotConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
}

/// Configuration for the document store and the recent-decision mirror.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite document store.
    pub sqlite_path: String,
    /// How long the latest decision per product stays in the mirror.
    pub recent_decision_ttl_seconds: u64,
    /// Maximum number of products mirrored at once.
    pub recent_decision_capacity: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/stockpilot.db".to_string(),
            recent_decision_ttl_seconds: 300,
            recent_decision_capacity: 10_000,
        }
    }
}

/// Configuration for the reasoning oracle (the `claude` CLI).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    pub model: String,
    /// Hard limit for a single completion call.
    pub timeout_seconds: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            timeout_seconds: 45,
        }
    }
}

/// Configuration for the trading backend HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL including the API prefix, e.g. `http://localhost:3000/api/v1`.
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api/v1".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Configuration for cycle scheduling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Products analysed concurrently per batch.
    pub batch_size: usize,
    /// Pause between consecutive batches.
    pub inter_batch_delay_ms: u64,
    /// Upper bound on active products pulled per cycle.
    pub max_products: usize,
    /// Pause between cycles in continuous mode.
    pub cycle_interval_seconds: u64,
    /// Pause after a cycle-level failure before retrying.
    pub error_backoff_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            inter_batch_delay_ms: 2_000,
            max_products: 50,
            cycle_interval_seconds: 60,
            error_backoff_seconds: 30,
        }
    }
}

/// Named execution policies.
///
/// `Strict` is the multi-agent orchestrator posture, `Permissive` the
/// single-agent one. They encode different risk appetites and are selected per
/// deployment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPreset {
    #[default]
    Strict,
    Permissive,
}

/// Configuration for per-product agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    pub policy: PolicyPreset,
    /// Maximum number of per-product agents kept alive; least recently used
    /// agents are evicted beyond this.
    pub cache_capacity: u64,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            policy: PolicyPreset::Strict,
            cache_capacity: 1_000,
        }
    }
}
