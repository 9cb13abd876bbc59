//! The two-pass conversation loop implementation.

use std::sync::Arc;
use tracing::{debug, info};

use vigil_core::error::Error;
use vigil_core::message::{Message, Session};
use vigil_core::provider::{ChatRequest, Provider};
use vigil_core::tool::ToolResult;
use vigil_tools::{ToolDispatcher, extract_tool_call};

/// The conversation loop that orchestrates model calls and tool execution.
pub struct ConversationLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// Dispatches tool calls found in model output
    dispatcher: ToolDispatcher,

    /// Temperature setting
    temperature: f32,
}

impl ConversationLoop {
    /// Create a new conversation loop.
    pub fn new(provider: Arc<dyn Provider>, dispatcher: ToolDispatcher) -> Self {
        Self {
            provider,
            dispatcher,
            temperature: 0.1,
        }
    }

    /// Set the sampling temperature for both passes.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Process the session's latest user message and generate a reply.
    ///
    /// This is the main entry point. The caller pushes the user message
    /// first, then this:
    /// 1. Sends the conversation to the model
    /// 2. If the reply carries a fenced tool request, runs that one tool
    /// 3. Injects the formatted results as a user message and asks the
    ///    model to analyze them
    /// 4. Returns the reply, with results and analysis folded in
    ///
    /// At most one tool call runs per turn. A reply with no fenced request
    /// is returned as-is.
    pub async fn process(&self, session: &mut Session) -> Result<String, Error> {
        let Some(model) = session.model.clone() else {
            return Err(Error::Config {
                message: "No model selected".into(),
            });
        };

        info!(
            session_id = %session.id,
            messages = session.messages.len(),
            "Processing turn"
        );

        let response_text = self.chat(&model, session).await?;

        let Some(call) = extract_tool_call(&response_text) else {
            session.push(Message::assistant(&response_text));
            return Ok(response_text);
        };

        info!(tool = %call.name, params = ?call.params, "Detected tool request");
        session.push(Message::assistant(&response_text));

        let result = self.dispatcher.dispatch(&call).await;
        let results_text = format_tool_result(&result);

        // The transport has no tool role, so results go back in as a user
        // message the model is asked to analyze.
        let analysis_prompt = format!(
            "Tool execution completed. Here are the results:\n\n\
             {results_text}\n\n\
             Please analyze these results and provide a detailed summary with \
             security assessment and recommendations."
        );
        session.push(Message::user(analysis_prompt));

        let analysis = self.chat(&model, session).await?;
        session.push(Message::assistant(&analysis));

        Ok(format!("{response_text}\n\n{results_text}\n\n{analysis}"))
    }

    async fn chat(&self, model: &str, session: &Session) -> Result<String, Error> {
        debug!(model, temperature = self.temperature, "Calling provider");
        let request =
            ChatRequest::new(model, session.messages.clone()).with_temperature(self.temperature);
        Ok(self.provider.chat(request).await?)
    }
}

impl std::fmt::Debug for ConversationLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationLoop")
            .field("provider", &self.provider.name())
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Render a dispatched tool result as the Markdown block injected back
/// into the conversation.
///
/// Structured output gets a `json` fence; text that already contains a
/// fence passes through untouched so nested reports stay readable.
pub fn format_tool_result(result: &ToolResult) -> String {
    let mut lines = vec!["## Tool Execution Results\n".to_string()];
    lines.push(format!("### ✓ Executed: {}", result.tool));

    if !result.params.is_empty() {
        let params = serde_json::to_string(&result.params).unwrap_or_else(|_| "{}".into());
        lines.push(format!("**Parameters**: {params}"));
    }

    lines.push("\n**Output**:".to_string());
    if result.structured {
        lines.push("```json".to_string());
        lines.push(result.output.clone());
        lines.push("```".to_string());
    } else if result.output.contains("```") {
        lines.push(result.output.clone());
    } else {
        lines.push("```".to_string());
        lines.push(result.output.clone());
        lines.push("```".to_string());
    }
    lines.push(String::new());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use vigil_core::error::{ProviderError, ToolError};
    use vigil_core::message::Role;
    use vigil_core::tool::{Params, Tool, ToolName, ToolOutput, ToolRegistry};

    /// A mock provider that plays back scripted replies in order.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            })
        }
    }

    #[async_trait::async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<String, ProviderError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::InvalidResponse("script exhausted".into()))
        }
    }

    struct StaticTool {
        name: ToolName,
        output: ToolOutput,
    }

    #[async_trait::async_trait]
    impl Tool for StaticTool {
        fn name(&self) -> ToolName {
            self.name
        }
        fn description(&self) -> &str {
            "static output"
        }
        async fn execute(&self, _params: &Params) -> Result<ToolOutput, ToolError> {
            Ok(self.output.clone())
        }
    }

    fn dispatcher_with(name: ToolName, output: ToolOutput) -> ToolDispatcher {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(StaticTool { name, output }));
        ToolDispatcher::new(Arc::new(registry))
    }

    fn session() -> Session {
        let mut session = Session::with_system_prompt("You analyze systems.");
        session.set_model("test-model");
        session
    }

    #[tokio::test]
    async fn plain_reply_passes_through() {
        let provider = ScriptedProvider::new(&["Everything looks fine."]);
        let agent = ConversationLoop::new(provider, ToolDispatcher::new(Arc::new(ToolRegistry::new())));

        let mut session = session();
        session.push(Message::user("how is the system?"));

        let reply = agent.process(&mut session).await.unwrap();
        assert_eq!(reply, "Everything looks fine.");
        // system + user + assistant
        assert_eq!(session.messages.len(), 3);
        assert_eq!(session.messages[2].role, Role::Assistant);
    }

    #[tokio::test]
    async fn tool_turn_runs_two_passes() {
        let tool_request = "```json\n{\"tool\": \"get_system_info\", \"params\": {}}\n```";
        let provider = ScriptedProvider::new(&[tool_request, "## Summary\nAll good."]);
        let dispatcher = dispatcher_with(
            ToolName::GetSystemInfo,
            ToolOutput::Json(serde_json::json!({"os": "linux"})),
        );
        let agent = ConversationLoop::new(provider, dispatcher);

        let mut session = session();
        session.push(Message::user("system info please"));

        let reply = agent.process(&mut session).await.unwrap();

        assert!(reply.starts_with(tool_request));
        assert!(reply.contains("## Tool Execution Results"));
        assert!(reply.contains("### ✓ Executed: get_system_info"));
        assert!(reply.contains("\"os\": \"linux\""));
        assert!(reply.ends_with("## Summary\nAll good."));

        // system + user + assistant(request) + user(results) + assistant(analysis)
        assert_eq!(session.messages.len(), 5);
        assert_eq!(session.messages[3].role, Role::User);
        assert!(
            session.messages[3]
                .content
                .starts_with("Tool execution completed. Here are the results:")
        );
        assert!(session.messages[4].content.ends_with("All good."));
    }

    #[tokio::test]
    async fn unknown_tool_still_gets_analysis_pass() {
        let provider = ScriptedProvider::new(&[
            "```json\n{\"tool\": \"port_scan\", \"params\": {}}\n```",
            "That tool does not exist; here is what I can do instead.",
        ]);
        let agent = ConversationLoop::new(provider, ToolDispatcher::new(Arc::new(ToolRegistry::new())));

        let mut session = session();
        session.push(Message::user("scan my ports"));

        let reply = agent.process(&mut session).await.unwrap();
        assert!(reply.contains("Unknown tool: port_scan"));
        assert!(reply.ends_with("instead."));
        assert_eq!(session.messages.len(), 5);
    }

    #[tokio::test]
    async fn missing_model_is_an_error() {
        let provider = ScriptedProvider::new(&["unused"]);
        let agent = ConversationLoop::new(provider, ToolDispatcher::new(Arc::new(ToolRegistry::new())));

        let mut session = Session::with_system_prompt("persona");
        session.push(Message::user("hello"));

        let err = agent.process(&mut session).await.unwrap_err();
        match err {
            Error::Config { message } => assert_eq!(message, "No model selected"),
            other => panic!("unexpected error: {other}"),
        }
        // Nothing was added by the failed turn.
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let provider = ScriptedProvider::new(&[]);
        let agent = ConversationLoop::new(provider, ToolDispatcher::new(Arc::new(ToolRegistry::new())));

        let mut session = session();
        session.push(Message::user("hello"));

        let err = agent.process(&mut session).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        // The user message stays even though the turn failed.
        assert_eq!(session.messages.len(), 2);
    }

    #[test]
    fn format_text_result_wraps_in_fence() {
        let result = ToolResult {
            tool: "scan_common_logs".into(),
            params: Params::new(),
            output: "report body".into(),
            structured: false,
        };
        assert_eq!(
            format_tool_result(&result),
            "## Tool Execution Results\n\n### ✓ Executed: scan_common_logs\n\n**Output**:\n```\nreport body\n```\n"
        );
    }

    #[test]
    fn format_structured_result_uses_json_fence() {
        let result = ToolResult {
            tool: "get_system_info".into(),
            params: Params::new(),
            output: "{\n  \"os\": \"linux\"\n}".into(),
            structured: true,
        };
        let text = format_tool_result(&result);
        assert!(text.contains("```json\n{\n  \"os\": \"linux\"\n}\n```"));
    }

    #[test]
    fn format_prefenced_result_passes_through() {
        let result = ToolResult {
            tool: "system_health_check".into(),
            params: Params::new(),
            output: "## Report\n```\nps aux\n```".into(),
            structured: false,
        };
        let text = format_tool_result(&result);
        // No double wrapping.
        assert!(text.contains("**Output**:\n## Report\n```\nps aux\n```"));
    }

    #[test]
    fn format_includes_params_when_present() {
        let mut params = Params::new();
        params.insert("command".into(), serde_json::json!("uptime"));
        params.insert("allowed".into(), serde_json::json!(true));
        let result = ToolResult {
            tool: "terminal_command".into(),
            params,
            output: "up 3 days".into(),
            structured: false,
        };
        let text = format_tool_result(&result);
        assert!(text.contains("**Parameters**: "));
        assert!(text.contains("\"command\":\"uptime\""));
        assert!(text.contains("\"allowed\":true"));
    }
}
