// Shieldgate API library
// Decision: Shared library for binaries (API server, OpenAPI export) and integration tests
// Decision: The router is assembled from explicit parts so tests can inject stub collaborators

pub mod api;
pub mod auth;
pub mod openapi;
pub mod providers;
pub mod services;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{middleware, Router};
use shieldgate_core::{ActionSource, Shield, Signer};
use shieldgate_storage::StorageBackend;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::extract::IDEMPOTENCY_KEY_HEADER;
use crate::api::trace::{trace_id_middleware, REQUEST_ID_HEADER};
use crate::auth::api_key::API_KEY_HEADER;
use crate::auth::{require_api_key, ApiKeyState};
use crate::openapi::ApiDoc;
use crate::services::{IdempotencyService, WorkflowService};

/// Everything the router needs, resolved at startup
pub struct AppContext {
    pub db: StorageBackend,
    pub action_source: Arc<dyn ActionSource>,
    pub shield: Arc<dyn Shield>,
    pub signer: Arc<dyn Signer>,
    pub api_key: String,
    /// Example: "/api" results in routes like /api/v1/workflows
    pub api_prefix: String,
    pub cors_allowed_origins: Vec<String>,
}

/// Build the full application router
pub fn build_app(ctx: AppContext) -> Router {
    let workflows = Arc::new(WorkflowService::new(
        ctx.db.clone(),
        ctx.action_source,
        ctx.shield,
        ctx.signer,
    ));
    let idempotency = Arc::new(IdempotencyService::new(ctx.db.clone()));

    let api_routes = api::workflows::routes(api::workflows::AppState::new(workflows, idempotency))
        .route_layer(middleware::from_fn_with_state(
            ApiKeyState::new(&ctx.api_key),
            require_api_key,
        ));

    // Health is neither prefixed nor gated
    let app = api::health::routes(api::health::HealthState { db: ctx.db })
        .merge(build_router_with_prefix(api_routes, &ctx.api_prefix))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let cors_origins: Vec<HeaderValue> = ctx
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Add CORS layer only if origins are configured
    let app = if cors_origins.is_empty() {
        app
    } else {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    header::ORIGIN,
                    HeaderName::from_static(API_KEY_HEADER),
                    HeaderName::from_static(IDEMPOTENCY_KEY_HEADER),
                    HeaderName::from_static(REQUEST_ID_HEADER),
                ])
                .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]),
        )
    };

    app.layer(middleware::from_fn(trace_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Build router with optional API prefix (extracted for testing)
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
