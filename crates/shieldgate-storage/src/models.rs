// Database models (internal, may differ from public DTOs)

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================
// Workflows
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct WorkflowRow {
    pub id: Uuid,
    pub intent: String,
    pub yield_id: String,
    pub address: String,
    pub status: String,
    pub request_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateWorkflowRow {
    pub intent: String,
    pub yield_id: String,
    pub address: String,
    pub status: String,
    pub request_hash: String,
}

// ============================================
// Steps
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct StepRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub step_index: i32,
    pub network: String,
    pub title: String,
    pub status: String,
    pub tx_id: Option<String>,
    pub is_message: bool,
    pub unsigned_tx: sqlx::types::JsonValue,
    pub structured_tx: Option<sqlx::types::JsonValue>,
    pub annotated_tx: Option<sqlx::types::JsonValue>,
    pub shield_ok: bool,
    pub shield_reason: Option<String>,
    pub signed_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateStepRow {
    pub step_index: i32,
    pub network: String,
    pub title: String,
    pub status: String,
    pub tx_id: Option<String>,
    pub is_message: bool,
    pub unsigned_tx: serde_json::Value,
    pub structured_tx: Option<serde_json::Value>,
    pub annotated_tx: Option<serde_json::Value>,
    pub shield_ok: bool,
    pub shield_reason: Option<String>,
}

// ============================================
// Audit events (append-only)
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct AuditEventRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub event_type: String,
    pub data: sqlx::types::JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAuditEventRow {
    pub event_type: String,
    pub data: serde_json::Value,
}

// ============================================
// Composite writes
// ============================================

/// Everything written when a workflow is created, in one transaction
#[derive(Debug, Clone)]
pub struct CreateWorkflowGraph {
    pub workflow: CreateWorkflowRow,
    /// In submitted order
    pub steps: Vec<CreateStepRow>,
    /// In append order
    pub events: Vec<CreateAuditEventRow>,
}

#[derive(Debug, Clone)]
pub struct WorkflowGraphRow {
    pub workflow: WorkflowRow,
    pub steps: Vec<StepRow>,
}

/// Step signing: payload attach plus its audit event, in one transaction
#[derive(Debug, Clone)]
pub struct SignStepRow {
    pub workflow_id: Uuid,
    pub step_id: Uuid,
    pub signed_payload: String,
    pub event: CreateAuditEventRow,
}

// ============================================
// Idempotency
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct IdempotencyRecordRow {
    pub id: Uuid,
    pub scope: String,
    pub idempotency_key: String,
    pub request_hash: String,
    pub response_body: sqlx::types::JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateIdempotencyRecordRow {
    pub scope: String,
    pub idempotency_key: String,
    pub request_hash: String,
    pub response_body: serde_json::Value,
}
