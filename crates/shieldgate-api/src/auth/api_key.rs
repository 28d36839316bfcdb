// API key gate for programmatic access
// Decision: Only the SHA-256 of the configured key is kept in memory
// Decision: Presented keys are hashed and compared as digests, never as raw strings

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use shieldgate_core::ShieldgateError;

use crate::api::{ApiError, TraceId};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Hash an API key for comparison
pub fn hash_api_key(key: &str) -> String {
    let hash = Sha256::digest(key.as_bytes());
    hex::encode(hash)
}

#[derive(Clone)]
pub struct ApiKeyState {
    expected_hash: String,
}

impl ApiKeyState {
    pub fn new(api_key: &str) -> Self {
        Self {
            expected_hash: hash_api_key(api_key),
        }
    }

    pub fn matches(&self, presented: &str) -> bool {
        hash_api_key(presented) == self.expected_hash
    }
}

/// Reject requests without a matching `x-api-key` header
pub async fn require_api_key(
    State(state): State<ApiKeyState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(key) if state.matches(key) => next.run(request).await,
        _ => {
            let trace_id = request
                .extensions()
                .get::<TraceId>()
                .cloned()
                .unwrap_or_else(TraceId::generate);
            tracing::debug!(
                trace_id = %trace_id,
                path = %request.uri().path(),
                "Rejected request without valid API key"
            );
            ApiError::new(ShieldgateError::Unauthorized, &trace_id).into_response()
        }
    }
}
