// In-memory storage implementation for dev mode
// Decision: Use parking_lot for thread-safe access
// Decision: UUIDs generated via uuid v7 (time-ordered)
//
// Mirrors the PostgreSQL repository, including its uniqueness constraints.
// Multi-row writes take every lock they need up front, always in the order
// workflows -> steps -> audit_events, so readers never see a partial graph.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::*;

/// In-memory database for dev mode
/// All data is stored in memory and lost on restart
#[derive(Default)]
pub struct InMemoryDatabase {
    workflows: RwLock<HashMap<Uuid, WorkflowRow>>,
    steps: RwLock<HashMap<Uuid, StepRow>>,
    // Append order is the Vec order
    audit_events: RwLock<Vec<AuditEventRow>>,
    idempotency_records: RwLock<HashMap<(String, String), IdempotencyRecordRow>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    // ============================================
    // Idempotency records
    // ============================================

    pub async fn get_idempotency_record(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<IdempotencyRecordRow>> {
        let records = self.idempotency_records.read();
        Ok(records
            .get(&(scope.to_string(), key.to_string()))
            .cloned())
    }

    pub async fn create_idempotency_record(
        &self,
        input: CreateIdempotencyRecordRow,
    ) -> Result<bool> {
        let mut records = self.idempotency_records.write();
        let id = (input.scope.clone(), input.idempotency_key.clone());
        if records.contains_key(&id) {
            return Ok(false);
        }
        records.insert(
            id,
            IdempotencyRecordRow {
                id: Uuid::now_v7(),
                scope: input.scope,
                idempotency_key: input.idempotency_key,
                request_hash: input.request_hash,
                response_body: input.response_body,
                created_at: Self::now(),
            },
        );
        Ok(true)
    }

    /// Number of stored idempotency records (test helper)
    pub fn idempotency_record_count(&self) -> usize {
        self.idempotency_records.read().len()
    }

    // ============================================
    // Workflows
    // ============================================

    pub async fn create_workflow_graph(&self, input: CreateWorkflowGraph) -> Result<WorkflowGraphRow> {
        let mut seen = HashSet::new();
        for step in &input.steps {
            if !seen.insert(step.step_index) {
                return Err(anyhow!(
                    "duplicate step_index {} violates unique (workflow_id, step_index)",
                    step.step_index
                ));
            }
        }

        let now = Self::now();
        let workflow = WorkflowRow {
            id: Uuid::now_v7(),
            intent: input.workflow.intent,
            yield_id: input.workflow.yield_id,
            address: input.workflow.address,
            status: input.workflow.status,
            request_hash: input.workflow.request_hash,
            created_at: now,
            updated_at: now,
        };

        let steps: Vec<StepRow> = input
            .steps
            .into_iter()
            .map(|step| StepRow {
                id: Uuid::now_v7(),
                workflow_id: workflow.id,
                step_index: step.step_index,
                network: step.network,
                title: step.title,
                status: step.status,
                tx_id: step.tx_id,
                is_message: step.is_message,
                unsigned_tx: step.unsigned_tx,
                structured_tx: step.structured_tx,
                annotated_tx: step.annotated_tx,
                shield_ok: step.shield_ok,
                shield_reason: step.shield_reason,
                signed_payload: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let events = input.events.into_iter().map(|event| AuditEventRow {
            id: Uuid::now_v7(),
            workflow_id: workflow.id,
            event_type: event.event_type,
            data: event.data,
            created_at: now,
        });

        let mut workflows = self.workflows.write();
        let mut step_map = self.steps.write();
        let mut audit_events = self.audit_events.write();

        workflows.insert(workflow.id, workflow.clone());
        for step in &steps {
            step_map.insert(step.id, step.clone());
        }
        audit_events.extend(events);

        Ok(WorkflowGraphRow { workflow, steps })
    }

    pub async fn get_workflow(&self, id: Uuid) -> Result<Option<WorkflowRow>> {
        let workflows = self.workflows.read();
        Ok(workflows.get(&id).cloned())
    }

    /// Number of stored workflows (test helper)
    pub fn workflow_count(&self) -> usize {
        self.workflows.read().len()
    }

    // ============================================
    // Steps
    // ============================================

    pub async fn list_steps(&self, workflow_id: Uuid) -> Result<Vec<StepRow>> {
        let steps = self.steps.read();
        let mut rows: Vec<StepRow> = steps
            .values()
            .filter(|s| s.workflow_id == workflow_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.step_index);
        Ok(rows)
    }

    pub async fn get_step(&self, workflow_id: Uuid, step_id: Uuid) -> Result<Option<StepRow>> {
        let steps = self.steps.read();
        Ok(steps
            .get(&step_id)
            .filter(|s| s.workflow_id == workflow_id)
            .cloned())
    }

    pub async fn mark_step_signed(&self, input: SignStepRow) -> Result<Option<StepRow>> {
        let mut steps = self.steps.write();
        let mut audit_events = self.audit_events.write();

        let Some(step) = steps
            .get_mut(&input.step_id)
            .filter(|s| s.workflow_id == input.workflow_id)
        else {
            return Ok(None);
        };
        if step.status != "ready" {
            return Ok(None);
        }

        let now = Self::now();
        step.status = "signed".to_string();
        step.signed_payload = Some(input.signed_payload);
        step.updated_at = now;

        audit_events.push(AuditEventRow {
            id: Uuid::now_v7(),
            workflow_id: input.workflow_id,
            event_type: input.event.event_type,
            data: input.event.data,
            created_at: now,
        });

        Ok(Some(step.clone()))
    }

    // ============================================
    // Audit events
    // ============================================

    pub async fn list_audit_events(&self, workflow_id: Uuid) -> Result<Vec<AuditEventRow>> {
        let events = self.audit_events.read();
        Ok(events
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect())
    }
}
