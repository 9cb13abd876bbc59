//! End-to-end integration tests for the Vigil security agent.
//!
//! These tests exercise the full pipeline from user input to agent output,
//! including tool-call extraction, safety-gated execution, and the
//! two-pass analysis cycle.

use std::collections::VecDeque;
use std::sync::Arc;

use vigil_agent::{ConversationLoop, DEFAULT_SYSTEM_PROMPT};
use vigil_config::{AppConfig, ToolsConfig};
use vigil_core::error::ProviderError;
use vigil_core::message::{Message, Role, Session};
use vigil_core::provider::{ChatRequest, Provider};
use vigil_core::tool::ToolName;
use vigil_exec::{CommandRunner, Executor};
use vigil_security::SafetyGate;
use vigil_tools::{default_registry, ToolDispatcher};

// ── Mock Provider ────────────────────────────────────────────────────────

/// Plays back scripted replies in sequence.
struct ScriptedProvider {
    replies: std::sync::Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        }
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn chat(&self, _request: ChatRequest) -> Result<String, ProviderError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::InvalidResponse("script exhausted".into()))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["llama3.1".into()])
    }
}

fn build_agent(replies: &[&str], runner: Arc<CommandRunner>) -> ConversationLoop {
    let provider: Arc<dyn Provider> = Arc::new(ScriptedProvider::new(replies));
    let registry = Arc::new(default_registry(runner, &ToolsConfig::default()));
    ConversationLoop::new(provider, ToolDispatcher::new(registry))
}

fn session() -> Session {
    let mut session = Session::with_system_prompt(DEFAULT_SYSTEM_PROMPT);
    session.set_model("llama3.1");
    session
}

// ── E2E: Plain conversation ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_plain_reply_passes_through() {
    let agent = build_agent(
        &["Hello! Ask me to scan logs whenever you are ready."],
        Arc::new(CommandRunner::new()),
    );
    let mut session = session();

    session.push(Message::user("Hi there!"));
    let response = agent.process(&mut session).await.expect("turn should succeed");

    assert_eq!(response, "Hello! Ask me to scan logs whenever you are ready.");
    // system + user + assistant
    assert_eq!(session.messages.len(), 3);
    assert_eq!(session.messages[2].role, Role::Assistant);
}

// ── E2E: Tool round trip ─────────────────────────────────────────────────

#[cfg(unix)]
#[tokio::test]
async fn e2e_terminal_tool_round_trip() {
    let agent = build_agent(
        &[
            "Let me check.\n```json\n{\"tool\": \"terminal_command\", \"params\": {\"command\": \"echo vigil-e2e\", \"allowed\": true}}\n```",
            "## Summary\nNothing suspicious in the output.",
        ],
        Arc::new(CommandRunner::new()),
    );
    let mut session = session();

    session.push(Message::user("Run a quick echo test"));
    let response = agent.process(&mut session).await.expect("turn should succeed");

    // Final text = model reply + results block + analysis.
    assert!(response.starts_with("Let me check."));
    assert!(response.contains("## Tool Execution Results"));
    assert!(response.contains("### ✓ Executed: terminal_command"));
    assert!(response.contains("vigil-e2e"));
    assert!(response.ends_with("## Summary\nNothing suspicious in the output."));

    // system, user, assistant (tool call), injected results, assistant (analysis)
    assert_eq!(session.messages.len(), 5);
    assert_eq!(session.messages[3].role, Role::User);
    assert!(session.messages[3]
        .content
        .starts_with("Tool execution completed. Here are the results:"));
}

#[tokio::test]
async fn e2e_dangerous_command_blocked_before_spawning() {
    let runner = Arc::new(CommandRunner::new());
    let agent = build_agent(
        &[
            "```json\n{\"tool\": \"terminal_command\", \"params\": {\"command\": \"rm -rf /\", \"allowed\": true}}\n```",
            "That command is not permitted.",
        ],
        runner.clone(),
    );
    let mut session = session();

    session.push(Message::user("Wipe the disk"));
    let response = agent.process(&mut session).await.expect("turn should succeed");

    assert!(response.contains("Error: Command blocked for security reasons"));

    // The gate fired before any process existed.
    let entries = runner.history().entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].blocked);
    assert_eq!(entries[0].exit_code, None);
}

#[tokio::test]
async fn e2e_terminal_command_without_allowed_flag_is_refused() {
    let runner = Arc::new(CommandRunner::new());
    let agent = build_agent(
        &[
            "```json\n{\"tool\": \"terminal_command\", \"params\": {\"command\": \"echo hi\"}}\n```",
            "I could not run that.",
        ],
        runner.clone(),
    );
    let mut session = session();

    session.push(Message::user("echo please"));
    let response = agent.process(&mut session).await.expect("turn should succeed");

    assert!(response.contains("Blocked: allowed flag not set to true."));
    // Refused at the dispatcher, so nothing reached the runner.
    assert_eq!(runner.history().len(), 0);
}

// ── E2E: Config-driven wiring ────────────────────────────────────────────

#[tokio::test]
async fn e2e_default_config_wires_the_full_stack() {
    // Mirror the gateway's construction path from a default config.
    let config = AppConfig::default();

    let gate = SafetyGate::with_extra_patterns(&config.safety.additional_patterns)
        .expect("default patterns are valid");
    let executor = Executor::new().with_max_stream_bytes(config.executor.max_output_bytes);
    let runner = Arc::new(
        CommandRunner::new()
            .with_gate(gate)
            .with_executor(executor)
            .with_allow_destructive(config.safety.allow_destructive),
    );

    let registry = Arc::new(default_registry(runner, &config.tools));
    assert_eq!(registry.names(), ToolName::ALL.to_vec());

    let provider: Arc<dyn Provider> = Arc::new(ScriptedProvider::new(&["Standing by."]));
    let agent = ConversationLoop::new(
        provider,
        ToolDispatcher::new(registry).with_max_output_chars(config.tools.max_tool_output_chars),
    )
    .with_temperature(config.temperature);

    let mut session = session();
    session.push(Message::user("status?"));
    let response = agent.process(&mut session).await.expect("turn should succeed");
    assert_eq!(response, "Standing by.");
}

// ── E2E: Gateway over HTTP ───────────────────────────────────────────────

#[tokio::test]
async fn e2e_gateway_chat_round_trip() {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use vigil_gateway::GatewayState;

    let provider: Arc<dyn Provider> = Arc::new(ScriptedProvider::new(&["All quiet."]));
    let registry = Arc::new(default_registry(
        Arc::new(CommandRunner::new()),
        &ToolsConfig::default(),
    ));
    let agent = ConversationLoop::new(provider.clone(), ToolDispatcher::new(registry));

    let state = Arc::new(GatewayState {
        session: tokio::sync::Mutex::new(Session::with_system_prompt(DEFAULT_SYSTEM_PROMPT)),
        agent,
        provider,
        default_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
    });
    let app = vigil_gateway::build_router(state);

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), 200);

    let set_model = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/set-model")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"model": "llama3.1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(set_model.status(), 200);

    let chat = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"message": "anything going on?"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(chat.status(), 200);

    let bytes = chat.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "All quiet.");
}
