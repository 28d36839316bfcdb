// Collaborator contracts consumed by the workflow state machine
//
// Each capability is chosen once at startup:
// - ActionSource: fixture plan or live upstream call
// - Shield: no-op (skip mode) or policy checks (enforce mode)
// - Signer: local key or a test double

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SignerError, UpstreamError};
use crate::workflow::Intent;

// ============================================================================
// ActionSource - turns an intent into candidate transactions
// ============================================================================

/// Input to an action source, also the body fingerprinted on workflow creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub intent: Intent,
    pub yield_id: String,
    pub address: String,
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough: Option<Value>,
}

/// One unsigned transaction proposed by an action source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub step_index: i32,
    pub network: String,
    pub title: String,
    pub unsigned_transaction: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_transaction: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated_transaction: Option<Value>,
    #[serde(default)]
    pub is_message: bool,
}

/// Ordered plan returned by an action source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    pub yield_id: String,
    pub transactions: Vec<CandidateTransaction>,
}

/// Trait for generating the transactions that realise an intent
///
/// Failures are upstream errors; the caller persists nothing when this fails.
#[async_trait]
pub trait ActionSource: Send + Sync {
    async fn create_action(&self, request: &ActionRequest) -> Result<ActionPlan, UpstreamError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

// ============================================================================
// Shield - per-transaction risk validation
// ============================================================================

/// Input to a single shield check
#[derive(Debug, Clone, Copy)]
pub struct ShieldInput<'a> {
    pub unsigned_transaction: &'a Value,
    pub yield_id: &'a str,
    pub user_address: &'a str,
    pub args: &'a Value,
}

/// Outcome of a shield check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldVerdict {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ShieldVerdict {
    pub fn pass() -> Self {
        Self {
            ok: true,
            reason: None,
            details: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
            details: None,
        }
    }
}

/// Trait for validating one unsigned transaction
///
/// Implementations must not fail: internal faults are reported as a failed
/// verdict so workflow creation always completes.
#[async_trait]
pub trait Shield: Send + Sync {
    async fn validate(&self, input: ShieldInput<'_>) -> ShieldVerdict;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

// ============================================================================
// Signer - produces a signed payload for one step
// ============================================================================

/// Trait for signing an unsigned transaction on behalf of an address
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(
        &self,
        unsigned_transaction: &Value,
        expected_address: &str,
    ) -> Result<String, SignerError>;
}
