//! System health check tool — persistence and activity snapshot.
//!
//! Gathers startup programs, scheduled tasks, network connections, and
//! running processes into a single Markdown report. Probe commands go
//! through the shared [`CommandRunner`] so the safety gate still applies.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use vigil_core::error::ToolError;
use vigil_core::tool::{Params, Tool, ToolName, ToolOutput};
use vigil_exec::request::CommandRequest;
use vigil_exec::runner::CommandRunner;

use crate::terminal::render_result;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SystemHealthCheckTool {
    runner: Arc<CommandRunner>,
    timeout: Duration,
    output_limit: usize,
}

impl SystemHealthCheckTool {
    pub fn new(runner: Arc<CommandRunner>) -> Self {
        Self {
            runner,
            timeout: DEFAULT_PROBE_TIMEOUT,
            output_limit: 4_000,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }

    /// Runs one probe command and caps its output for the report.
    async fn run_probe(&self, command: &str) -> String {
        let request = CommandRequest::new(command).with_timeout(self.timeout);
        let result = self.runner.run_with_retry(&request).await;
        let output = render_result(&result, self.timeout);
        if output.is_empty() {
            return "(no output)".into();
        }
        clip_chars(&output, self.output_limit).to_string()
    }

    async fn fenced_probe(&self, command: &str) -> String {
        format!("```\n{}\n```", self.run_probe(command).await)
    }

    #[cfg(not(target_os = "windows"))]
    async fn build_report(&self) -> String {
        let mut parts = vec!["## System Health Check Report".to_string()];

        parts.push("\n### Startup Programs".into());
        parts.push(
            self.fenced_probe("systemctl list-unit-files --state=enabled --type=service")
                .await,
        );

        parts.push("\n### Scheduled Tasks".into());
        parts.push(self.fenced_probe("crontab -l").await);

        parts.push("\n### Active Network Connections".into());
        parts.push(self.fenced_probe("ss -tlnp").await);

        parts.push("\n### Running Processes".into());
        parts.push(self.fenced_probe("ps aux").await);

        push_footer(&mut parts);
        parts.join("\n")
    }

    #[cfg(target_os = "windows")]
    async fn build_report(&self) -> String {
        let mut parts = vec!["## System Health Check Report".to_string()];

        parts.push("\n### Startup Programs".into());
        parts.push("  (Registry access not available on this platform)".into());

        parts.push("\n### Scheduled Tasks".into());
        parts.push(self.fenced_probe("schtasks /query /fo LIST /v").await);

        parts.push("\n### Active Network Connections".into());
        parts.push(self.fenced_probe("netstat -ano").await);

        parts.push("\n### Running Processes".into());
        parts.push(self.fenced_probe("tasklist").await);

        push_footer(&mut parts);
        parts.join("\n")
    }
}

impl std::fmt::Debug for SystemHealthCheckTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemHealthCheckTool")
            .field("timeout", &self.timeout)
            .field("output_limit", &self.output_limit)
            .finish()
    }
}

#[async_trait]
impl Tool for SystemHealthCheckTool {
    fn name(&self) -> ToolName {
        ToolName::SystemHealthCheck
    }

    fn description(&self) -> &str {
        "Check startup programs, tasks, and network (params: {})"
    }

    async fn execute(&self, _params: &Params) -> Result<ToolOutput, ToolError> {
        debug!("collecting system health report");
        Ok(ToolOutput::Text(self.build_report().await))
    }
}

fn push_footer(parts: &mut Vec<String>) {
    parts.push("\n---".into());
    parts.push("**Analysis Instructions**: Review the system health data above for:".into());
    parts.push("- Unknown or suspicious startup programs".into());
    parts.push("- Unusual scheduled tasks".into());
    parts.push("- Unexpected network connections to unknown IPs".into());
    parts.push("- High resource usage processes".into());
    parts.push("- Processes with unusual names or locations".into());
}

fn clip_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
