//! HTTP surface
//!
//! Thin axum layer over the library: one-shot chat completions, simulated
//! conversations, batch runs, and transcript judging. Handlers translate
//! domain errors into a JSON `{error}` envelope; raw error chains never
//! reach the wire.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::agent::Agent;
use crate::batch::{BatchReport, BatchRunner};
use crate::config::SimchatConfig;
use crate::conversation::{Conversation, Orchestrator, OrchestratorConfig, TerminatedReason};
use crate::error::{Error, Result};
use crate::judge::{Judge, JudgeVerdict};
use crate::llm::{ChatMessage, CompletionRequest, SharedClient};
use crate::profile::{AgentRole, ProfileRegistry};
use crate::store::TranscriptStore;

const INDEX_HTML: &str = include_str!("../assets/index.html");

// ─────────────────────────────────────────────────────────────────
// Application State
// ─────────────────────────────────────────────────────────────────

pub struct AppState {
    pub client: SharedClient,
    pub registry: ProfileRegistry,
    pub config: SimchatConfig,
    pub store: TranscriptStore,
}

type SharedState = Arc<AppState>;

// ─────────────────────────────────────────────────────────────────
// Error Envelope
// ─────────────────────────────────────────────────────────────────

/// JSON error envelope returned by every handler.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::UnknownProfile { .. }
            | Error::ProfileInvalid { .. }
            | Error::InvalidRequest { .. }
            | Error::ConversationState(_) => StatusCode::BAD_REQUEST,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Unavailable { .. } | Error::CompletionTimeout { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error!(status = %status, error = %self.0, "Request failed");
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct SimulateRequest {
    user_agent_type: String,
    chat_agent_type: String,
    max_turns: Option<usize>,
}

#[derive(Debug, Serialize)]
struct TurnView {
    speaker: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct SimulateResponse {
    /// False when an agent call failed mid-run; the partial transcript
    /// is still persisted and returned.
    success: bool,
    conversation: Vec<TurnView>,
    turn_count: usize,
    terminated_reason: TerminatedReason,
    saved_filepath: String,
}

#[derive(Debug, Deserialize)]
struct BatchRunRequest {
    chat_agent_type: Option<String>,
    max_turns: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct JudgeRequest {
    conversation_data: Conversation,
    #[serde(default)]
    mixture_of_agents: bool,
}

// ─────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/chat", post(chat))
        .route("/simulate", post(simulate))
        .route("/batch-run", post(batch_run))
        .route("/judge", post(judge))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, port_override: Option<u16>) -> Result<()> {
    let host = state.config.server.host.clone();
    let port = port_override.unwrap_or(state.config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("failed to bind {}: {}", addr, e)))?;

    info!(addr = %addr, "Listening");
    axum::serve(listener, router(Arc::new(state)))
        .await
        .map_err(|e| Error::Internal(format!("server error: {}", e)))
}

// ─────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// One-shot completion: the message goes straight to the model.
async fn chat(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(Error::invalid_request("message must not be empty").into());
    }

    let completion = CompletionRequest::new(vec![ChatMessage::user(request.message)]);
    let reply = state.client.complete(completion).await?;

    Ok(Json(ChatResponse {
        response: reply.text,
    }))
}

/// Run one simulated conversation and persist the transcript.
async fn simulate(
    State(state): State<SharedState>,
    Json(request): Json<SimulateRequest>,
) -> std::result::Result<Json<SimulateResponse>, ApiError> {
    let persona = state
        .registry
        .resolve_role(&request.user_agent_type, AgentRole::UserPersona)?;
    let service = state
        .registry
        .resolve_role(&request.chat_agent_type, AgentRole::Service)?;

    let persona_agent = Agent::new(persona.clone(), state.client.clone());
    let service_agent = Agent::new(service.clone(), state.client.clone());

    let config = OrchestratorConfig::from_settings(&state.config.conversation, request.max_turns);
    let mut orchestrator = Orchestrator::new(persona_agent, service_agent, config)?;
    let conversation = orchestrator.run().await?;

    let path = state.store.save(&conversation)?;

    let turns = conversation
        .turns
        .iter()
        .map(|t| TurnView {
            speaker: t.speaker.to_string(),
            message: t.text.clone(),
        })
        .collect();

    Ok(Json(SimulateResponse {
        success: !conversation.terminated_reason.is_error(),
        conversation: turns,
        turn_count: conversation.turn_count(),
        terminated_reason: conversation.terminated_reason,
        saved_filepath: path.display().to_string(),
    }))
}

/// Run the persona catalog; per-pair failures come back as flags, not 5xx.
async fn batch_run(
    State(state): State<SharedState>,
    Json(request): Json<BatchRunRequest>,
) -> std::result::Result<Json<BatchReport>, ApiError> {
    let service = match request.chat_agent_type.as_deref() {
        Some(name) => Some(
            state
                .registry
                .resolve_role(name, AgentRole::Service)?
                .name,
        ),
        None => None,
    };

    let runner = BatchRunner::new(
        &state.registry,
        state.client.clone(),
        state.config.conversation.clone(),
        state.store.clone(),
    );
    let report = runner.run(service, request.max_turns).await?;

    Ok(Json(report))
}

/// Judge an already-finished conversation supplied in the request body.
async fn judge(
    State(state): State<SharedState>,
    Json(request): Json<JudgeRequest>,
) -> std::result::Result<Json<JudgeVerdict>, ApiError> {
    let judge = Judge::new(
        state.client.clone(),
        judge_model_override(&state.config),
        state.config.judge.max_concurrency,
    );
    let verdict = judge
        .analyze(&request.conversation_data, request.mixture_of_agents)
        .await?;

    Ok(Json(verdict))
}

/// Judge model override, when configured differently from the chat model.
fn judge_model_override(config: &SimchatConfig) -> Option<String> {
    let model = config.judge_model();
    if model.is_empty() || model == config.llm.model {
        None
    } else {
        Some(model.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
