//! ptp-backend
//!
//! HTTP API over the pump collection: list, create, fetch and
//! append-participant. Pumps live in a [`PumpStore`] backed by sled or by an
//! in-memory map.

pub mod config;
pub mod store;

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ptp_common::{parse_address, EthAmount, NewPump, Pump, PumpError};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

pub use config::{BackendConfig, ConfigError, StoreConfig, DEFAULT_PORT};
pub use store::{PumpStore, StoreError};

const CODE_VALIDATION: &str = "VALIDATION_ERROR";
const CODE_PUMP_NOT_FOUND: &str = "PUMP_NOT_FOUND";
const CODE_STORE_ERROR: &str = "STORE_ERROR";
const CODE_INVALID_JSON: &str = "INVALID_JSON";

const LIVENESS_MESSAGE: &str = "Hello World";

#[derive(Clone)]
pub struct AppState {
    store: PumpStore,
}

impl AppState {
    pub fn new(store: PumpStore) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(PumpStore::in_memory())
    }

    pub fn from_store_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let store = match config {
            StoreConfig::Memory => PumpStore::in_memory(),
            StoreConfig::Sled { path } => PumpStore::persistent(path)?,
        };
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &PumpStore {
        &self.store
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, CODE_VALIDATION, message)
    }

    fn pump_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, CODE_PUMP_NOT_FOUND, "Pump not found")
    }

    fn invalid_json(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, CODE_INVALID_JSON, rejection.body_text())
    }
}

impl From<PumpError> for ApiError {
    fn from(err: PumpError) -> Self {
        match err {
            PumpError::Validation(message) => Self::validation(message),
            PumpError::NotFound(_) => Self::pump_not_found(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Pump(err) => err.into(),
            other => {
                warn!(error = %other, "pump store failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, CODE_STORE_ERROR, other.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            message: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Body of `POST /api/pumps`. Fields are optional here so that a missing
/// field reports as a validation error rather than a JSON error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePumpRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    creator: Option<String>,
    #[serde(default, alias = "threshold")]
    required_eth: Option<JsonValue>,
}

impl CreatePumpRequest {
    fn validate(self) -> Result<NewPump, ApiError> {
        let name = self
            .name
            .ok_or_else(|| ApiError::validation("name is required"))?;
        let creator = self
            .creator
            .ok_or_else(|| ApiError::validation("creator is required"))?;
        let creator = parse_address(&creator)?;
        let required_eth = match self.required_eth {
            Some(JsonValue::Null) | None => {
                return Err(ApiError::validation("requiredEth is required"))
            }
            Some(value) => EthAmount::from_json(&value)?,
        };

        Ok(NewPump::new(
            &name,
            self.description.as_deref(),
            creator,
            required_eth,
        )?)
    }
}

/// Body of `POST /api/pumps/:id/participants`. Browser clients have sent the
/// address under both keys.
#[derive(Debug, Deserialize)]
struct AddParticipantRequest {
    #[serde(default, alias = "address")]
    participant: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health))
        .route("/api/pumps", get(list_pumps).post(create_pump))
        .route("/api/pumps/:id", get(get_pump))
        .route("/api/pumps/:id/participants", post(add_participant))
        .layer(cors)
        .with_state(state)
}

/// Bind according to `config` and serve until ctrl-c.
pub async fn serve(config: BackendConfig) -> anyhow::Result<()> {
    let state = AppState::from_store_config(&config.store).context("failed to open pump store")?;
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    serve_with_listener(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener; used by tests to run on an ephemeral
/// port.
pub async fn serve_with_listener(
    listener: TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    info!(%addr, store = state.store().kind(), "pump API listening");

    axum::serve(listener, app_router(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .context("pump API server failed")?;

    info!("pump API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; shutting down");
        return;
    }
    info!("shutdown signal received");
}

async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn list_pumps(State(state): State<AppState>) -> Result<Json<Vec<Pump>>, ApiError> {
    Ok(Json(state.store.list()?))
}

async fn get_pump(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Pump>, ApiError> {
    let id = parse_pump_id(&id)?;
    Ok(Json(state.store.get(id)?))
}

async fn create_pump(
    State(state): State<AppState>,
    payload: Result<Json<CreatePumpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Pump>), ApiError> {
    let Json(request) = payload.map_err(ApiError::invalid_json)?;
    let new = request.validate().map_err(|err| {
        warn!(reason = %err.message, "rejected pump creation");
        err
    })?;

    let pump = state.store.create(new)?;
    Ok((StatusCode::CREATED, Json(pump)))
}

async fn add_participant(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<AddParticipantRequest>, JsonRejection>,
) -> Result<Json<Pump>, ApiError> {
    let id = parse_pump_id(&id)?;
    let Json(request) = payload.map_err(ApiError::invalid_json)?;
    let participant = request
        .participant
        .ok_or_else(|| ApiError::validation("participant is required"))?;
    let address = parse_address(&participant)?;

    Ok(Json(state.store.add_participant(id, address)?))
}

fn parse_pump_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("invalid pump id '{raw}'")))
}
