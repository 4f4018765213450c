use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use vendorlink_agent::concierge::{Concierge, ConciergeAnswer, ContextRetriever};
use vendorlink_agent::llm::LlmClient;
use vendorlink_agent::AgentGraph;
use vendorlink_core::domain::chat::Message;
use vendorlink_db::{DbPool, VendorRepository};

pub struct ApiState<L, R, C> {
    pub graph: Arc<AgentGraph<L, R>>,
    pub concierge: Arc<Concierge<L, C>>,
    pub db_pool: DbPool,
}

impl<L, R, C> Clone for ApiState<L, R, C> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            concierge: self.concierge.clone(),
            db_pool: self.db_pool.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    pub history: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub checked_at: String,
}

pub fn router<L, R, C>(state: ApiState<L, R, C>) -> Router
where
    L: LlmClient + 'static,
    R: VendorRepository + 'static,
    C: ContextRetriever + 'static,
{
    Router::new()
        .route("/chat", post(chat::<L, R, C>))
        .route("/ask", post(ask::<L, R, C>))
        .route("/health", get(health::<L, R, C>))
        .with_state(state)
}

pub async fn serve<L, R, C>(
    bind_address: &str,
    port: u16,
    state: ApiState<L, R, C>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()>
where
    L: LlmClient + 'static,
    R: VendorRepository + 'static,
    C: ContextRetriever + 'static,
{
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.routes.listening",
        bind_address = %address,
        "api endpoints started"
    );

    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await
}

async fn chat<L, R, C>(
    State(state): State<ApiState<L, R, C>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse>
where
    L: LlmClient + 'static,
    R: VendorRepository + 'static,
    C: ContextRetriever + 'static,
{
    let turn = state.graph.handle_turn(&request.session_id, &request.message).await;
    Json(ChatResponse {
        session_id: request.session_id,
        response: turn.response,
        history: turn.history,
    })
}

async fn ask<L, R, C>(
    State(state): State<ApiState<L, R, C>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<ConciergeAnswer>, StatusCode>
where
    L: LlmClient + 'static,
    R: VendorRepository + 'static,
    C: ContextRetriever + 'static,
{
    match state.concierge.answer(&request.question, &[]).await {
        Ok(answer) => Ok(Json(answer)),
        Err(llm_error) => {
            error!(
                event_name = "system.routes.ask_failure",
                error = %llm_error,
                "concierge answer failed"
            );
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

async fn health<L, R, C>(
    State(state): State<ApiState<L, R, C>>,
) -> (StatusCode, Json<HealthResponse>)
where
    L: LlmClient + 'static,
    R: VendorRepository + 'static,
    C: ContextRetriever + 'static,
{
    let database = match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => HealthCheck { status: "ok", detail: "reachable".to_string() },
        Err(db_error) => HealthCheck { status: "failing", detail: db_error.to_string() },
    };

    let healthy = database.status == "ok";
    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    (if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE }, Json(response))
}
