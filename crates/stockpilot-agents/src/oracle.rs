use async_trait::async_trait;

use crate::claude_cli::{check_cli_available, invoke_claude, ClaudeCliConfig};
use crate::error::AgentError;

/// Black-box text completion service. Mockable for testing.
///
/// One call per product per cycle; no conversation state is kept between calls.
#[async_trait]
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AgentError>;

    /// Whether the oracle can currently be reached. Used by health checks.
    async fn available(&self) -> bool {
        true
    }
}

/// An oracle backed by the `claude` CLI.
pub struct ClaudeOracle {
    pub cli_config: ClaudeCliConfig,
}

impl ClaudeOracle {
    pub fn new(cli_config: ClaudeCliConfig) -> Self {
        Self { cli_config }
    }
}

#[async_trait]
impl Oracle for ClaudeOracle {
    fn name(&self) -> &str {
        &self.cli_config.model
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AgentError> {
        invoke_claude(system_prompt, user_prompt, &self.cli_config).await
    }

    async fn available(&self) -> bool {
        check_cli_available().await
    }
}
