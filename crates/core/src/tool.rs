//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act on the host: probe
//! system facts, run terminal commands, build log-scan and health-check
//! reports.
//!
//! Tool identifiers are a closed enum rather than free strings: the
//! registry is fixed, and unrecognized names are rejected at the parse
//! boundary instead of falling through string-comparison chains. The raw
//! string a model produced is still carried in [`ToolCall`] so an unknown
//! name can be echoed back into the conversation verbatim.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::ToolError;

/// Parameter mapping of a tool call — open-ended, model-supplied.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// The closed set of operations a model may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Structured host facts (OS, CPU, memory, connectivity)
    GetSystemInfo,
    /// Gated shell execution
    TerminalCommand,
    /// Markdown report over recent log files
    ScanCommonLogs,
    /// Markdown report over startup/tasks/network/processes
    SystemHealthCheck,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::GetSystemInfo,
        ToolName::TerminalCommand,
        ToolName::ScanCommonLogs,
        ToolName::SystemHealthCheck,
    ];

    /// The wire name models use to request this tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetSystemInfo => "get_system_info",
            ToolName::TerminalCommand => "terminal_command",
            ToolName::ScanCommonLogs => "scan_common_logs",
            ToolName::SystemHealthCheck => "system_health_check",
        }
    }

    /// Parse a wire name. Unknown strings are rejected here, at the
    /// boundary — callers decide how to surface that.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "get_system_info" => Some(ToolName::GetSystemInfo),
            "terminal_command" => Some(ToolName::TerminalCommand),
            "scan_common_logs" => Some(ToolName::ScanCommonLogs),
            "system_health_check" => Some(ToolName::SystemHealthCheck),
            _ => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to execute a tool, as parsed out of model text.
///
/// `name` is the raw string the model produced — it is *not* guaranteed to
/// name a registered tool. Validation happens at dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Raw tool name from the model
    pub name: String,

    /// Parameter mapping (absent params parse as empty)
    #[serde(default)]
    pub params: Params,
}

/// What a tool handler produced: free text or a structured value.
///
/// The distinction matters downstream: structured output is rendered as
/// indented JSON and fenced accordingly when injected back into the
/// conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolOutput {
    Text(String),
    Json(serde_json::Value),
}

/// The outcome of one dispatched tool call, ready for conversation
/// re-injection: the output has been serialized and capped to the
/// conversational truncation limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Raw tool name the call carried
    pub tool: String,

    /// The params it was invoked with
    pub params: Params,

    /// Serialized (and possibly truncated) output text
    pub output: String,

    /// Whether the handler produced a structured value — drives the fence
    /// choice when the output is injected back into the conversation
    pub structured: bool,
}

/// The core Tool trait.
///
/// Each of the four operations implements this trait. Tools are registered
/// in the ToolRegistry and invoked by the dispatcher; handler failures are
/// returned as `ToolError` and surfaced back into the conversation as text,
/// never raised out of a turn.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which registry slot this tool occupies.
    fn name(&self) -> ToolName;

    /// A description of what this tool does (folded into the system prompt).
    fn description(&self) -> &str;

    /// Execute the tool with the given parameter mapping.
    async fn execute(&self, params: &Params) -> std::result::Result<ToolOutput, ToolError>;
}

/// The fixed registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<ToolName, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool in the same slot.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: ToolName) -> Option<&dyn Tool> {
        self.tools.get(&name).map(|t| t.as_ref())
    }

    /// List registered tools in declaration order.
    pub fn names(&self) -> Vec<ToolName> {
        ToolName::ALL
            .into_iter()
            .filter(|n| self.tools.contains_key(n))
            .collect()
    }

    /// One `name: description` line per registered tool, for prompt building.
    pub fn describe(&self) -> Vec<String> {
        self.names()
            .into_iter()
            .filter_map(|n| self.get(n).map(|t| format!("{n}: {}", t.description())))
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
