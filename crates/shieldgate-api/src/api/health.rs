// Health endpoint, outside the API key gate

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shieldgate_storage::StorageBackend;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct HealthState {
    pub db: StorageBackend,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Mirrors `db.ok`
    pub ok: bool,
    pub time: DateTime<Utc>,
    pub version: &'static str,
    pub db: DbHealth,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DbHealth {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn routes(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health - Liveness plus storage ping
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    let db = match state.db.ping().await {
        Ok(()) => DbHealth {
            ok: true,
            error: None,
        },
        Err(e) => {
            tracing::warn!("Health check database ping failed: {:#}", e);
            DbHealth {
                ok: false,
                error: Some(e.to_string()),
            }
        }
    };

    Json(HealthResponse {
        ok: db.ok,
        time: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        db,
    })
}
