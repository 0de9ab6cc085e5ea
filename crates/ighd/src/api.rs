use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::entity::DeviceInfo;
use crate::entity::Entity;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
}

/// One entity in the /v1/entities listing
#[derive(Serialize)]
struct EntityResponse {
    unique_id: String,
    name: String,
    platform: &'static str,
    available: bool,
    state: serde_json::Value,
    device: DeviceInfo,
}

impl EntityResponse {
    fn from_entity(entity: &dyn Entity) -> Self {
        Self {
            unique_id: entity.unique_id().to_string(),
            name: entity.name().to_string(),
            platform: entity.platform(),
            available: entity.available(),
            state: entity.state_json(),
            device: entity.device().info(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    version: &'static str,
    entities: Arc<Vec<Arc<dyn Entity>>>,
}

impl AppState {
    fn find(&self, unique_id: &str) -> Option<&Arc<dyn Entity>> {
        self.entities.iter().find(|e| e.unique_id() == unique_id)
    }
}

/// Handler for GET /v1/ping
#[tracing::instrument(skip_all)]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip_all)]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
        }),
    )
}

/// Handler for GET /v1/entities
#[tracing::instrument(skip_all)]
async fn list_entities(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let entities: Vec<EntityResponse> = state
        .entities
        .iter()
        .map(|e| EntityResponse::from_entity(e.as_ref()))
        .collect();

    (StatusCode::OK, Json(entities))
}

/// Handler for GET /v1/entities/{unique_id}
#[tracing::instrument(skip_all)]
async fn get_entity(
    State(state): State<Arc<AppState>>,
    Path(unique_id): Path<String>,
) -> impl IntoResponse {
    match state.find(&unique_id) {
        Some(entity) => (
            StatusCode::OK,
            Json(serde_json::to_value(EntityResponse::from_entity(entity.as_ref())).unwrap_or_default()),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("no entity with id {}", unique_id) })),
        ),
    }
}

/// Handler for POST /v1/entities/{unique_id}/turn_on
#[tracing::instrument(skip_all)]
async fn turn_on(
    State(state): State<Arc<AppState>>,
    Path(unique_id): Path<String>,
) -> impl IntoResponse {
    control(&state, &unique_id, true).await
}

/// Handler for POST /v1/entities/{unique_id}/turn_off
#[tracing::instrument(skip_all)]
async fn turn_off(
    State(state): State<Arc<AppState>>,
    Path(unique_id): Path<String>,
) -> impl IntoResponse {
    control(&state, &unique_id, false).await
}

async fn control(state: &AppState, unique_id: &str, on: bool) -> impl IntoResponse {
    let Some(entity) = state.find(unique_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("no entity with id {}", unique_id) })),
        );
    };

    let result = if on {
        entity.turn_on().await
    } else {
        entity.turn_off().await
    };

    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!("command for {} failed: {}", unique_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

/// Create the API router with all endpoints
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/entities", get(list_entities))
        .route("/v1/entities/:unique_id", get(get_entity))
        .route("/v1/entities/:unique_id/turn_on", post(turn_on))
        .route("/v1/entities/:unique_id/turn_off", post(turn_off))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the daemon's HTTP API server
///
/// Binds to the configured address and serves entity states until the
/// provided shutdown signal is triggered.
pub async fn serve(
    bind: String,
    entities: Arc<Vec<Arc<dyn Entity>>>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    let state = Arc::new(AppState { version, entities });
    let app = create_router(state);

    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}
