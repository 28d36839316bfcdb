// Error types for workflow execution

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::workflow::StepStatus;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, ShieldgateError>;

/// One step that did not pass the shield
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ShieldFailure {
    pub step_index: i32,
    pub reason: String,
}

/// Rate limit headers forwarded from the upstream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RateLimitInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<String>,
}

/// Failures from the action source gateway
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("Upstream request timed out")]
    Timeout,

    #[error("Upstream rate limited")]
    RateLimited {
        /// Parsed `retry-after` in seconds
        retry_after: Option<u64>,
        /// Raw `retry-after` header, forwarded verbatim
        retry_after_header: Option<String>,
        rate_limit: RateLimitInfo,
        message: Option<String>,
    },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Other { message: String },
}

impl UpstreamError {
    /// Create a generic upstream error
    pub fn other(message: impl Into<String>) -> Self {
        UpstreamError::Other {
            message: message.into(),
        }
    }

    /// Map a non-success upstream status to its error kind
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| format!("Upstream returned {}", status));
        match status {
            400 => UpstreamError::BadRequest { message },
            401 => UpstreamError::Unauthorized { message },
            403 => UpstreamError::Forbidden { message },
            404 => UpstreamError::NotFound { message },
            _ => UpstreamError::Other { message },
        }
    }
}

/// Failures from the signer capability
#[derive(Debug, Clone, Error)]
pub enum SignerError {
    #[error("Signer is not configured")]
    NotConfigured,

    #[error("Address {expected} does not match signer address {actual}")]
    AddressMismatch { expected: String, actual: String },

    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("Transaction signing failed: {0}")]
    SigningFailed(String),
}

/// Errors surfaced by the idempotency guard and the workflow state machine
#[derive(Debug, Error)]
pub enum ShieldgateError {
    /// Mutating call without an idempotency key
    #[error("Idempotency-Key header is required")]
    MissingKey,

    /// Key reused for a different request body
    #[error("Idempotency key was already used with a different request body")]
    IdempotencyConflict,

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error("Step {step_id} not found in workflow {workflow_id}")]
    StepNotFound { workflow_id: Uuid, step_id: Uuid },

    /// Signing attempted on a workflow that failed validation
    #[error("Workflow {0} failed shield validation and cannot be signed")]
    WorkflowFailed(Uuid),

    #[error("Step is not ready for signing (status: {status})")]
    StepNotReady { status: StepStatus },

    #[error("Step did not pass the shield")]
    ShieldRequired,

    #[error("Message steps cannot be signed")]
    MessageNotSupported,

    /// Raised after the failed workflow has been persisted
    #[error("Shield validation failed for {} step(s)", failures.len())]
    ShieldValidationFailed {
        workflow_id: Uuid,
        failures: Vec<ShieldFailure>,
    },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    /// Request body or parameters failed validation
    #[error("{0}")]
    Validation(String),

    #[error("Missing or invalid API key")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ShieldgateError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        ShieldgateError::Validation(msg.into())
    }

    /// Create an internal error from a message
    pub fn internal(msg: impl Into<String>) -> Self {
        ShieldgateError::Internal(anyhow::anyhow!(msg.into()))
    }

    /// Whether this is one of the not-found kinds
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ShieldgateError::WorkflowNotFound(_) | ShieldgateError::StepNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_mapping() {
        assert!(matches!(
            UpstreamError::from_status(400, None),
            UpstreamError::BadRequest { .. }
        ));
        assert!(matches!(
            UpstreamError::from_status(401, None),
            UpstreamError::Unauthorized { .. }
        ));
        assert!(matches!(
            UpstreamError::from_status(403, None),
            UpstreamError::Forbidden { .. }
        ));
        assert!(matches!(
            UpstreamError::from_status(404, None),
            UpstreamError::NotFound { .. }
        ));
        assert!(matches!(
            UpstreamError::from_status(503, None),
            UpstreamError::Other { .. }
        ));
    }

    #[test]
    fn test_upstream_default_message() {
        let err = UpstreamError::from_status(500, None);
        assert_eq!(err.to_string(), "Upstream returned 500");

        let err = UpstreamError::from_status(404, Some("yield not found".into()));
        assert_eq!(err.to_string(), "yield not found");
    }

    #[test]
    fn test_shield_failure_serializes_camel_case() {
        let failure = ShieldFailure {
            step_index: 1,
            reason: "bad target".into(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["stepIndex"], 1);
        assert_eq!(json["reason"], "bad target");
    }
}
