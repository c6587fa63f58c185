//! HTTP front for the environments in an [`EnvRegistry`].
//!
//! Each live environment sits behind its own async mutex; the id map is only
//! locked long enough to clone a handle out, so episodes never wait on each other.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use maze_core::{EngineError, EnvDescriptor, EnvRegistry, Environment, Observation, Snapshot, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, RwLock};

type LiveEnv = Arc<Mutex<Box<dyn Environment>>>;

#[derive(Clone)]
pub struct AppState {
    registry: Arc<EnvRegistry>,
    live: Arc<RwLock<HashMap<String, LiveEnv>>>,
    minted: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(registry: EnvRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            live: Arc::default(),
            minted: Arc::new(AtomicU64::new(1)),
        }
    }

    fn mint_id(&self) -> String {
        format!("env-{}", self.minted.fetch_add(1, Ordering::Relaxed))
    }

    async fn lookup(&self, env_id: &str) -> Result<LiveEnv, ApiError> {
        self.live.read().await.get(env_id).cloned().ok_or_else(|| ApiError::unknown_env(env_id))
    }
}

#[derive(Deserialize)]
pub struct InitRequest {
    pub env_type: String,
    #[serde(default)]
    pub config: Option<JsonValue>,
}

#[derive(Serialize)]
pub struct InitResponse {
    pub env_id: String,
    pub env_type: String,
    pub observation: Observation,
}

#[derive(Deserialize)]
pub struct StepRequest {
    pub env_id: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
pub struct IdRequest {
    pub env_id: String,
}

/// JSON error body: `{"error": "<kind>", "message": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl ApiError {
    fn unknown_env(env_id: &str) -> Self {
        Self { status: StatusCode::NOT_FOUND, error: "not_found", message: format!("env {env_id} not found") }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let (status, error, message) = match err {
            EngineError::Validation(m) => (StatusCode::BAD_REQUEST, "validation", m),
            EngineError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            EngineError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m),
            EngineError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m),
        };
        Self { status, error, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self { status: rejection.status(), error: "bad_request", message: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = self.error, message = %self.message, "request failed");
        }
        (self.status, Json(self)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn list_envs(State(state): State<AppState>) -> Json<Vec<EnvDescriptor>> {
    Json(state.registry.describe())
}

async fn initialize(
    State(state): State<AppState>,
    payload: Result<Json<InitRequest>, JsonRejection>,
) -> ApiResult<InitResponse> {
    let Json(req) = payload?;
    let mut env = state.registry.create(&req.env_type, req.config)?;
    let observation = env.initialize().await?;
    let env_id = state.mint_id();
    state.live.write().await.insert(env_id.clone(), Arc::new(Mutex::new(env)));
    tracing::info!(%env_id, env_type = %req.env_type, "environment initialized");
    Ok(Json(InitResponse { env_id, env_type: req.env_type, observation }))
}

async fn step(State(state): State<AppState>, payload: Result<Json<StepRequest>, JsonRejection>) -> ApiResult<Observation> {
    let Json(req) = payload?;
    let env = state.lookup(&req.env_id).await?;
    let obs = env.lock().await.step(req.tool_calls).await?;
    if obs.terminated {
        tracing::info!(env_id = %req.env_id, "episode terminated");
    }
    Ok(Json(obs))
}

async fn checkpoint(State(state): State<AppState>, payload: Result<Json<IdRequest>, JsonRejection>) -> ApiResult<Snapshot> {
    let Json(req) = payload?;
    let env = state.lookup(&req.env_id).await?;
    let snap = env.lock().await.checkpoint().await?;
    Ok(Json(snap))
}

async fn terminate(State(state): State<AppState>, payload: Result<Json<IdRequest>, JsonRejection>) -> ApiResult<Observation> {
    let Json(req) = payload?;
    let env = state.live.write().await.remove(&req.env_id).ok_or_else(|| ApiError::unknown_env(&req.env_id))?;
    let obs = env.lock().await.terminate().await?;
    tracing::info!(env_id = %req.env_id, "environment terminated");
    Ok(Json(obs))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/envs", get(list_envs))
        .route("/initialize", post(initialize))
        .route("/step", post(step))
        .route("/checkpoint", post(checkpoint))
        .route("/terminate", post(terminate))
        .with_state(state)
}

pub fn make_app(registry: EnvRegistry) -> Router {
    router(AppState::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    fn maze_state() -> AppState {
        let mut registry = EnvRegistry::new();
        blocking_maze_env::register_default_env(&mut registry).unwrap();
        AppState::new(registry)
    }

    fn post(uri: &str, body: JsonValue) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn init(app: &Router) -> String {
        let res = app.clone().oneshot(post("/initialize", json!({"env_type": "BlockingMaze"}))).await.unwrap();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v: JsonValue = serde_json::from_slice(&body).unwrap();
        v["env_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn busy_env_does_not_block_its_neighbours() {
        let state = maze_state();
        let app = router(state.clone());
        let busy = init(&app).await;
        let idle = init(&app).await;

        let handle = state.lookup(&busy).await.unwrap();
        let _held = handle.lock().await;

        let req = post("/step", json!({"env_id": idle, "tool_calls": [{"tool": "interact", "args": {"action": "up"}}]}));
        let res = tokio::time::timeout(Duration::from_secs(5), app.clone().oneshot(req))
            .await
            .expect("step on an unrelated env waited on a held env")
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn engine_errors_keep_their_kind() {
        let err = ApiError::from(EngineError::Conflict("session not active".into()));
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(serde_json::to_value(&err).unwrap(), json!({"error": "conflict", "message": "session not active"}));
        assert_eq!(ApiError::from(EngineError::Internal("x".into())).status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::unknown_env("env-7").error, "not_found");
    }
}
