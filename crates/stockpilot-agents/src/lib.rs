pub mod agent;
pub mod agent_cache;
pub mod backend;
pub mod claude_cli;
pub mod context;
pub mod error;
pub mod gate;
pub mod oracle;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod scheduler;

pub mod test_support;

pub use agent::ProductAgent;
pub use agent_cache::AgentCache;
pub use backend::{HttpTradingBackend, TradingBackend};
pub use error::AgentError;
pub use gate::{ExecutionGate, GatePolicy, Verdict};
pub use oracle::{ClaudeOracle, Oracle};
pub use orchestrator::Orchestrator;
pub use scheduler::{run_cycle, CycleReport, ProductAnalyzer, Scheduler};
