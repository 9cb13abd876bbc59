//! HTTP API gateway for Vigil.
//!
//! Exposes the chat surface a frontend talks to: provider status, model
//! selection, system-prompt management, history clearing, and the chat
//! endpoint that drives the conversation loop.
//!
//! Built on Axum. The whole gateway serves one session: turns are
//! serialized behind a single lock, so later turns always see earlier
//! tool output.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use vigil_agent::{ConversationLoop, DEFAULT_SYSTEM_PROMPT};
use vigil_config::AppConfig;
use vigil_core::message::{Message, Session};
use vigil_core::provider::Provider;
use vigil_exec::executor::Executor;
use vigil_exec::runner::CommandRunner;
use vigil_providers::OllamaProvider;
use vigil_security::{PresetConfirmation, SafetyGate};
use vigil_tools::ToolDispatcher;

/// Shared application state for the gateway.
pub struct GatewayState {
    /// The one conversation this gateway serves
    pub session: Mutex<Session>,
    pub agent: ConversationLoop,
    pub provider: Arc<dyn Provider>,
    pub default_system_prompt: String,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/set-model", post(set_model_handler))
        .route("/api/set-system", post(set_system_handler))
        .route("/api/get-default-system", get(get_default_system_handler))
        .route("/api/clear", post(clear_handler))
        .route("/api/chat", post(chat_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Builds the provider, safety gate, tool registry, and conversation loop
/// from config, then serves until the process exits.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let host = config.gateway.host.clone();
    let port = config.gateway.port;
    let addr = format!("{host}:{port}");

    let provider: Arc<dyn Provider> = Arc::new(OllamaProvider::new(&config.provider.base_url));

    let gate = SafetyGate::with_extra_patterns(&config.safety.additional_patterns)?;
    let executor = Executor::new().with_max_stream_bytes(config.executor.max_output_bytes);
    // Headless server: nobody can answer an interactive prompt, so the
    // preset either auto-approves (when config waives confirmation) or
    // declines.
    let confirmer = PresetConfirmation(!config.safety.require_confirmation);
    let runner = Arc::new(
        CommandRunner::new()
            .with_gate(gate)
            .with_executor(executor)
            .with_confirmation(Arc::new(confirmer))
            .with_allow_destructive(config.safety.allow_destructive),
    );

    let registry = vigil_tools::default_registry(runner, &config.tools);
    let dispatcher = ToolDispatcher::new(Arc::new(registry))
        .with_max_output_chars(config.tools.max_tool_output_chars);
    let agent =
        ConversationLoop::new(provider.clone(), dispatcher).with_temperature(config.temperature);

    let mut session = Session::with_system_prompt(DEFAULT_SYSTEM_PROMPT);
    if let Some(model) = &config.default_model {
        session.set_model(model);
    }

    let state = Arc::new(GatewayState {
        session: Mutex::new(session),
        agent,
        provider,
        default_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct StatusResponse {
    available: bool,
    models: Vec<String>,
}

/// Check provider availability and list its models.
async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    let available = state.provider.health_check().await.unwrap_or(false);
    let models = if available {
        state.provider.list_models().await.unwrap_or_default()
    } else {
        Vec::new()
    };
    Json(StatusResponse { available, models })
}

#[derive(Deserialize)]
struct SetModelRequest {
    model: Option<String>,
}

#[derive(Serialize)]
struct SetModelResponse {
    success: bool,
    model: Option<String>,
}

async fn set_model_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SetModelRequest>,
) -> Json<SetModelResponse> {
    let mut session = state.session.lock().await;
    session.model = payload.model.clone();
    info!(model = ?payload.model, "Model selected");
    Json(SetModelResponse {
        success: true,
        model: payload.model,
    })
}

#[derive(Deserialize)]
struct SetSystemRequest {
    prompt: Option<String>,
}

#[derive(Serialize)]
struct SetSystemResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Install a new system prompt and reset the conversation around it.
/// The model selection survives the reset.
async fn set_system_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SetSystemRequest>,
) -> Json<SetSystemResponse> {
    let prompt = payload.prompt.unwrap_or_default();
    if prompt.is_empty() {
        return Json(SetSystemResponse {
            success: false,
            error: Some("Empty prompt".into()),
        });
    }

    let mut session = state.session.lock().await;
    let model = session.model.take();
    let mut fresh = Session::with_system_prompt(prompt);
    fresh.model = model;
    *session = fresh;

    Json(SetSystemResponse {
        success: true,
        error: None,
    })
}

#[derive(Serialize)]
struct DefaultSystemResponse {
    prompt: String,
}

async fn get_default_system_handler(
    State(state): State<SharedState>,
) -> Json<DefaultSystemResponse> {
    Json(DefaultSystemResponse {
        prompt: state.default_system_prompt.clone(),
    })
}

#[derive(Serialize)]
struct AckResponse {
    success: bool,
}

/// Clear chat history but keep the system prompt.
async fn clear_handler(State(state): State<SharedState>) -> Json<AckResponse> {
    let mut session = state.session.lock().await;
    session.clear();
    Json(AckResponse { success: true })
}

#[derive(Deserialize)]
struct ChatRequestBody {
    message: Option<String>,
}

#[derive(Serialize)]
struct ChatSuccessResponse {
    success: bool,
    response: String,
}

#[derive(Serialize)]
struct ChatErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct ChatFailureResponse {
    success: bool,
    error: String,
}

/// Send a message and get the agent's reply.
///
/// The session lock is held across the whole turn, so concurrent chat
/// requests queue up rather than interleave. The user message stays in
/// history even when the turn fails.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequestBody>,
) -> Response {
    let message = payload.message.unwrap_or_default();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatErrorResponse {
                error: "Empty message".into(),
            }),
        )
            .into_response();
    }

    let mut session = state.session.lock().await;
    if session.model.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatErrorResponse {
                error: "No model selected".into(),
            }),
        )
            .into_response();
    }

    session.push(Message::user(&message));

    match state.agent.process(&mut session).await {
        Ok(response) => Json(ChatSuccessResponse {
            success: true,
            response,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Chat turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatFailureResponse {
                    success: false,
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
