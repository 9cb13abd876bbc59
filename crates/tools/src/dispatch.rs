//! Tool dispatch — extracts tool calls from model output and runs them.
//!
//! The model requests a tool by emitting a fenced JSON block with a
//! `"tool"` key. Only the first block in a response is honored. Terminal
//! commands carry an extra `"allowed": true` flag the model must set
//! explicitly before anything is executed.

use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use vigil_core::tool::{ToolCall, ToolName, ToolOutput, ToolRegistry, ToolResult};

/// Longest tool output fed back into the conversation, in characters.
pub const MAX_OUTPUT_CHARS: usize = 4_000;

static ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

/// Pulls the first fenced JSON tool call out of a model response.
///
/// Returns `None` when there is no fenced block, the block is not valid
/// JSON, or the object has no `"tool"` key.
pub fn extract_tool_call(text: &str) -> Option<ToolCall> {
    let captures = ACTION_RE.captures(text)?;
    let raw = captures.get(1)?.as_str().trim();

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "fenced block is not valid JSON");
            return None;
        }
    };
    let object = parsed.as_object()?;
    let Some(tool) = object.get("tool") else {
        warn!("fenced JSON block has no tool key");
        return None;
    };

    let name = match tool.as_str() {
        Some(s) => s.to_string(),
        None => tool.to_string(),
    };
    let params = object
        .get("params")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Some(ToolCall { name, params })
}

/// Runs extracted tool calls against a fixed registry.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    max_output_chars: usize,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("tools", &self.registry.names())
            .field("max_output_chars", &self.max_output_chars)
            .finish()
    }
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            max_output_chars: MAX_OUTPUT_CHARS,
        }
    }

    pub fn with_max_output_chars(mut self, limit: usize) -> Self {
        self.max_output_chars = limit;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Executes one tool call and captures its conversational output.
    ///
    /// Failures never propagate: unknown tools, gate refusals, and tool
    /// errors all come back as plain text for the model to read.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        info!(tool = %call.name, "dispatching tool call");

        let (output, structured) = match ToolName::parse(&call.name) {
            None => (format!("Unknown tool: {}", call.name), false),
            Some(name) if name == ToolName::TerminalCommand && !explicitly_allowed(call) => {
                warn!(command = ?call.params.get("command"), "terminal command missing allowed flag");
                ("Blocked: allowed flag not set to true.".to_string(), false)
            }
            Some(name) => match self.registry.get(name) {
                None => (format!("Unknown tool: {}", call.name), false),
                Some(tool) => match tool.execute(&call.params).await {
                    Ok(ToolOutput::Text(text)) => (text, false),
                    Ok(ToolOutput::Json(value)) => {
                        let rendered = serde_json::to_string_pretty(&value)
                            .unwrap_or_else(|_| value.to_string());
                        (rendered, true)
                    }
                    Err(e) => (format!("Error running {}: {e}", call.name), false),
                },
            },
        };

        ToolResult {
            tool: call.name.clone(),
            params: call.params.clone(),
            output: truncate_output(output, self.max_output_chars),
            structured,
        }
    }
}

/// The terminal gate only accepts a literal JSON `true`.
fn explicitly_allowed(call: &ToolCall) -> bool {
    call.params.get("allowed") == Some(&Value::Bool(true))
}

fn truncate_output(output: String, limit: usize) -> String {
    match output.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}... (truncated)", &output[..idx]),
        None => output,
    }
}
