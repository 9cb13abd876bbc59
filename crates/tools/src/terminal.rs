//! Terminal command tool — gated shell execution for the model.
//!
//! Commands route through the shared [`CommandRunner`], so the dangerous-
//! pattern gate applies no matter what the model asked for. Outcomes are
//! rendered as plain text the model can read; nothing here raises.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use vigil_core::error::ToolError;
use vigil_core::tool::{Params, Tool, ToolName, ToolOutput};
use vigil_exec::{CommandRequest, CommandResult, CommandRunner};

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TerminalCommandTool {
    runner: Arc<CommandRunner>,
    timeout: Duration,
}

impl TerminalCommandTool {
    pub fn new(runner: Arc<CommandRunner>) -> Self {
        Self {
            runner,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Tool for TerminalCommandTool {
    fn name(&self) -> ToolName {
        ToolName::TerminalCommand
    }

    fn description(&self) -> &str {
        r#"Execute shell commands (params: {"command": "...", "allowed": true})"#
    }

    async fn execute(&self, params: &Params) -> Result<ToolOutput, ToolError> {
        let command = params
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if command.trim().is_empty() {
            return Ok(ToolOutput::Text("Error: Invalid command".into()));
        }

        debug!(command, "model requested terminal command");
        let request = CommandRequest::new(command).with_timeout(self.timeout);
        let result = self.runner.run_with_retry(&request).await;
        Ok(ToolOutput::Text(render_result(&result, self.timeout)))
    }
}

/// Render an execution outcome as conversational text.
///
/// Also used by the health-check probes, which run through the same
/// pipeline.
pub(crate) fn render_result(result: &CommandResult, timeout: Duration) -> String {
    if result.blocked {
        return "Error: Command blocked for security reasons".into();
    }
    if result.cancelled {
        return "Cancelled By User".into();
    }
    if result.timeout {
        return format!("Error: Command timed out after {} seconds", timeout.as_secs());
    }
    if let Some(error) = &result.error {
        return format!("Error: {error}");
    }
    match result.exit_code {
        Some(0) => result.stdout.clone(),
        _ => format!(
            "Error executing command '{}' on {}: {}",
            result.command,
            std::env::consts::OS,
            result.stderr
        ),
    }
}
