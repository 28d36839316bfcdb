// Uniform error rendering
//
// Every failure leaves the API as {"error": {code, message, details?, traceId}}.
// Internal faults are logged in full and surfaced with a generic message only.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use shieldgate_core::{ShieldgateError, SignerError, UpstreamError};

use super::common::ErrorResponse;
use super::trace::TraceId;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// A ShieldgateError bound to the request's trace id
#[derive(Debug)]
pub struct ApiError {
    pub error: ShieldgateError,
    pub trace_id: TraceId,
}

impl ApiError {
    pub fn new(error: impl Into<ShieldgateError>, trace_id: &TraceId) -> Self {
        Self {
            error: error.into(),
            trace_id: trace_id.clone(),
        }
    }

    /// HTTP status and stable error code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        status_and_code(&self.error)
    }
}

/// Attach a trace id to any result whose error converts into ShieldgateError
pub trait WithTrace<T> {
    fn with_trace(self, trace_id: &TraceId) -> Result<T, ApiError>;
}

impl<T, E: Into<ShieldgateError>> WithTrace<T> for Result<T, E> {
    fn with_trace(self, trace_id: &TraceId) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(e, trace_id))
    }
}

fn status_and_code(error: &ShieldgateError) -> (StatusCode, &'static str) {
    match error {
        ShieldgateError::MissingKey => (StatusCode::BAD_REQUEST, "MISSING_IDEMPOTENCY_KEY"),
        ShieldgateError::IdempotencyConflict => (StatusCode::CONFLICT, "IDEMPOTENCY_CONFLICT"),
        ShieldgateError::WorkflowNotFound(_) | ShieldgateError::StepNotFound { .. } => {
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        }
        ShieldgateError::WorkflowFailed(_) => (StatusCode::CONFLICT, "WORKFLOW_FAILED"),
        ShieldgateError::StepNotReady { .. } => (StatusCode::CONFLICT, "STEP_NOT_READY"),
        ShieldgateError::ShieldRequired => (StatusCode::BAD_REQUEST, "SHIELD_REQUIRED"),
        ShieldgateError::MessageNotSupported => (StatusCode::BAD_REQUEST, "MESSAGE_NOT_SUPPORTED"),
        ShieldgateError::ShieldValidationFailed { .. } => (StatusCode::BAD_REQUEST, "SHIELD_INVALID"),
        ShieldgateError::Upstream(e) => match e {
            UpstreamError::Timeout => (StatusCode::BAD_GATEWAY, "UPSTREAM_TIMEOUT"),
            UpstreamError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "UPSTREAM_RATE_LIMITED")
            }
            UpstreamError::Unauthorized { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAUTHORIZED"),
            UpstreamError::Forbidden { .. } => (StatusCode::FORBIDDEN, "UPSTREAM_FORBIDDEN"),
            UpstreamError::NotFound { .. } => (StatusCode::NOT_FOUND, "UPSTREAM_NOT_FOUND"),
            UpstreamError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "UPSTREAM_BAD_REQUEST"),
            UpstreamError::Other { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        },
        ShieldgateError::Signer(e) => match e {
            SignerError::NotConfigured => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SIGNER_NOT_CONFIGURED")
            }
            SignerError::AddressMismatch { .. } => (StatusCode::BAD_REQUEST, "ADDRESS_MISMATCH"),
            SignerError::MalformedTransaction(_) => {
                (StatusCode::BAD_REQUEST, "NETWORK_NOT_SUPPORTED")
            }
            SignerError::SigningFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        },
        ShieldgateError::Validation(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        ShieldgateError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        ShieldgateError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

fn message_and_details(error: &ShieldgateError) -> (String, Option<Value>) {
    match error {
        ShieldgateError::WorkflowNotFound(_) => ("Workflow not found".to_string(), None),
        ShieldgateError::StepNotFound { .. } => ("Step not found".to_string(), None),
        ShieldgateError::StepNotReady { status } => {
            (error.to_string(), Some(json!({ "status": status })))
        }
        ShieldgateError::ShieldValidationFailed {
            workflow_id,
            failures,
        } => (
            error.to_string(),
            Some(json!({ "workflowId": workflow_id, "failures": failures })),
        ),
        ShieldgateError::Upstream(UpstreamError::RateLimited {
            retry_after,
            rate_limit,
            message,
            ..
        }) => (
            error.to_string(),
            Some(json!({
                "retryAfter": retry_after,
                "rateLimit": rate_limit,
                "upstreamMessage": message,
            })),
        ),
        ShieldgateError::Signer(SignerError::SigningFailed(_)) => {
            ("Transaction signing failed".to_string(), None)
        }
        ShieldgateError::Internal(_) => (INTERNAL_MESSAGE.to_string(), None),
        other => (other.to_string(), None),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let (message, details) = message_and_details(&self.error);

        if status.is_server_error() {
            tracing::error!(trace_id = %self.trace_id, code, "Request failed: {:#}", self.error);
        } else {
            tracing::debug!(trace_id = %self.trace_id, code, "Request rejected: {}", self.error);
        }

        let retry_after = match &self.error {
            ShieldgateError::Upstream(UpstreamError::RateLimited {
                retry_after_header: Some(value),
                ..
            }) => HeaderValue::from_str(value).ok(),
            _ => None,
        };

        let body = ErrorResponse::new(code, message, details, self.trace_id.0);
        let mut response = (status, Json(body)).into_response();
        if let Some(value) = retry_after {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}
