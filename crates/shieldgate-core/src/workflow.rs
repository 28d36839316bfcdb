// Workflow domain types
//
// A workflow is one requested intent broken into ordered steps. Its status is
// decided once at creation and never revisited; steps move ready -> signed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Requested high-level operation on a yield position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Enter,
    Exit,
    Manage,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Enter => "enter",
            Intent::Exit => "exit",
            Intent::Manage => "manage",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enter" => Ok(Intent::Enter),
            "exit" => Ok(Intent::Exit),
            "manage" => Ok(Intent::Manage),
            other => Err(format!("unknown intent: {}", other)),
        }
    }
}

/// Overall workflow status, fixed at creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Validated,
    Failed,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Validated => write!(f, "validated"),
            WorkflowStatus::Failed => write!(f, "failed"),
        }
    }
}

impl From<&str> for WorkflowStatus {
    fn from(s: &str) -> Self {
        match s {
            "validated" => WorkflowStatus::Validated,
            _ => WorkflowStatus::Failed,
        }
    }
}

/// Step status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Ready,
    Blocked,
    Signed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Ready => write!(f, "ready"),
            StepStatus::Blocked => write!(f, "blocked"),
            StepStatus::Signed => write!(f, "signed"),
        }
    }
}

impl From<&str> for StepStatus {
    fn from(s: &str) -> Self {
        match s {
            "ready" => StepStatus::Ready,
            "signed" => StepStatus::Signed,
            _ => StepStatus::Blocked,
        }
    }
}

/// Audit event kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    WorkflowCreated,
    YieldActionCreated,
    ShieldFailed,
    StepSigned,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::WorkflowCreated => "workflow_created",
            AuditEventType::YieldActionCreated => "yield_action_created",
            AuditEventType::ShieldFailed => "shield_failed",
            AuditEventType::StepSigned => "step_signed",
        }
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workflow_created" => Ok(AuditEventType::WorkflowCreated),
            "yield_action_created" => Ok(AuditEventType::YieldActionCreated),
            "shield_failed" => Ok(AuditEventType::ShieldFailed),
            "step_signed" => Ok(AuditEventType::StepSigned),
            other => Err(format!("unknown audit event type: {}", other)),
        }
    }
}

/// Workflow entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: Uuid,
    pub intent: Intent,
    pub yield_id: String,
    pub address: String,
    pub status: WorkflowStatus,
    /// Fingerprint of the creation input; kept for observability only
    #[serde(skip)]
    pub request_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One transaction (or message) in a workflow's plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub step_index: i32,
    pub network: String,
    pub title: String,
    pub status: StepStatus,
    /// Upstream transaction id, when the action source provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    pub is_message: bool,
    pub unsigned_transaction: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_transaction: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_transaction: Option<Value>,
    pub shield_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shield_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Step {
    /// Drop the signed payload unless the caller asked for it
    pub fn with_signed_payload(mut self, include: bool) -> Self {
        if !include {
            self.signed_payload = None;
        }
        self
    }
}

/// Append-only audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: Uuid,
    pub workflow_id: Uuid,
    #[serde(rename = "type")]
    pub event_type: AuditEventType,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// Cached outcome of a guarded operation, keyed by (scope, key)
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    pub id: Uuid,
    pub scope: String,
    pub key: String,
    pub request_hash: String,
    pub response_body: Value,
    pub created_at: DateTime<Utc>,
}

/// Workflow together with its steps ordered by step index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct WorkflowWithSteps {
    pub workflow: Workflow,
    pub steps: Vec<Step>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_step() -> Step {
        let now = Utc::now();
        Step {
            id: Uuid::now_v7(),
            workflow_id: Uuid::now_v7(),
            step_index: 0,
            network: "eip155:1".into(),
            title: "approve".into(),
            status: StepStatus::Signed,
            tx_id: None,
            is_message: false,
            unsigned_transaction: json!({"to": "0x00"}),
            structured_transaction: None,
            annotated_transaction: None,
            shield_ok: true,
            shield_reason: None,
            signed_payload: Some("0xabc".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [StepStatus::Ready, StepStatus::Blocked, StepStatus::Signed] {
            assert_eq!(StepStatus::from(status.to_string().as_str()), status);
        }
        for status in [WorkflowStatus::Validated, WorkflowStatus::Failed] {
            assert_eq!(WorkflowStatus::from(status.to_string().as_str()), status);
        }
    }

    #[test]
    fn test_intent_parse() {
        assert_eq!("manage".parse::<Intent>().unwrap(), Intent::Manage);
        assert!("stake".parse::<Intent>().is_err());
    }

    #[test]
    fn test_step_omits_signed_payload_when_not_requested() {
        let step = sample_step().with_signed_payload(false);
        let json = serde_json::to_value(&step).unwrap();
        assert!(json.get("signedPayload").is_none());
        assert_eq!(json["status"], "signed");
        assert_eq!(json["stepIndex"], 0);

        let step = sample_step().with_signed_payload(true);
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["signedPayload"], "0xabc");
    }

    #[test]
    fn test_audit_event_type_serializes_snake_case() {
        let json = serde_json::to_value(AuditEventType::YieldActionCreated).unwrap();
        assert_eq!(json, "yield_action_created");
        assert_eq!(
            "step_signed".parse::<AuditEventType>().unwrap(),
            AuditEventType::StepSigned
        );
    }
}
