// Workflow service: creation, retrieval and step signing
// Decision: Workflow status is decided once at creation and never revisited
// Decision: A workflow that fails the shield is still persisted; the error is raised afterwards
// Decision: Each step's ready/blocked status reflects only its own shield verdict

use futures::future::join_all;
use serde_json::json;
use shieldgate_core::{
    fingerprint, ActionPlan, ActionRequest, ActionSource, AuditEvent, AuditEventType,
    CandidateTransaction, Result, Shield, ShieldFailure, ShieldInput, ShieldVerdict,
    ShieldgateError, Signer, Step, StepStatus, UpstreamError, Workflow, WorkflowStatus,
    WorkflowWithSteps,
};
use shieldgate_storage::{
    AuditEventRow, CreateAuditEventRow, CreateStepRow, CreateWorkflowGraph, CreateWorkflowRow,
    SignStepRow, StepRow, StorageBackend, WorkflowRow,
};
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_SHIELD_REASON: &str = "Shield validation failed";

pub struct WorkflowService {
    db: StorageBackend,
    action_source: Arc<dyn ActionSource>,
    shield: Arc<dyn Shield>,
    signer: Arc<dyn Signer>,
}

impl WorkflowService {
    pub fn new(
        db: StorageBackend,
        action_source: Arc<dyn ActionSource>,
        shield: Arc<dyn Shield>,
        signer: Arc<dyn Signer>,
    ) -> Self {
        Self {
            db,
            action_source,
            shield,
            signer,
        }
    }

    /// Generate, validate and persist a workflow for the requested intent.
    ///
    /// Fails with ShieldValidationFailed *after* persisting when any step is
    /// rejected, so the workflow can still be fetched by id.
    pub async fn create(&self, request: ActionRequest) -> Result<WorkflowWithSteps> {
        let request_value = serde_json::to_value(&request)
            .map_err(|e| ShieldgateError::internal(format!("Failed to encode request: {}", e)))?;
        let request_hash = fingerprint(&request_value);

        let plan = self.action_source.create_action(&request).await?;
        check_step_indices(&plan)?;

        // Verdicts come back in plan order
        let verdicts: Vec<ShieldVerdict> = join_all(plan.transactions.iter().map(|tx| {
            self.shield.validate(ShieldInput {
                unsigned_transaction: &tx.unsigned_transaction,
                yield_id: &request.yield_id,
                user_address: &request.address,
                args: &request.arguments,
            })
        }))
        .await;

        let failures: Vec<ShieldFailure> = plan
            .transactions
            .iter()
            .zip(&verdicts)
            .filter(|(_, verdict)| !verdict.ok)
            .map(|(tx, verdict)| ShieldFailure {
                step_index: tx.step_index,
                reason: verdict
                    .reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SHIELD_REASON.to_string()),
            })
            .collect();
        let validated = failures.is_empty();

        let graph = build_graph(&request, request_hash, &plan, verdicts, &failures);
        let created = self.db.create_workflow_graph(graph).await?;

        let workflow = row_to_workflow(created.workflow)?;
        let mut steps = created
            .steps
            .into_iter()
            .map(row_to_step)
            .collect::<Vec<_>>();
        steps.sort_by_key(|step| step.step_index);

        tracing::info!(
            workflow_id = %workflow.id,
            intent = %workflow.intent,
            yield_id = %workflow.yield_id,
            status = %workflow.status,
            steps = steps.len(),
            source = self.action_source.name(),
            shield = self.shield.name(),
            "Workflow created"
        );

        if !validated {
            return Err(ShieldgateError::ShieldValidationFailed {
                workflow_id: workflow.id,
                failures,
            });
        }

        Ok(WorkflowWithSteps { workflow, steps })
    }

    /// Fetch a workflow and its steps ordered by step index
    pub async fn get(&self, id: Uuid, include_signed: bool) -> Result<WorkflowWithSteps> {
        let workflow = self.load_workflow(id).await?;
        let steps = self
            .db
            .list_steps(id)
            .await?
            .into_iter()
            .map(|row| row_to_step(row).with_signed_payload(include_signed))
            .collect();

        Ok(WorkflowWithSteps { workflow, steps })
    }

    /// Audit trail in append order
    pub async fn list_events(&self, id: Uuid) -> Result<Vec<AuditEvent>> {
        self.load_workflow(id).await?;
        self.db
            .list_audit_events(id)
            .await?
            .into_iter()
            .map(row_to_event)
            .collect()
    }

    /// Sign one step. Signing an already signed step returns it unchanged.
    pub async fn sign_step(&self, workflow_id: Uuid, step_id: Uuid) -> Result<Step> {
        let workflow = self.load_workflow(workflow_id).await?;
        let step = self
            .db
            .get_step(workflow_id, step_id)
            .await?
            .map(row_to_step)
            .ok_or(ShieldgateError::StepNotFound {
                workflow_id,
                step_id,
            })?;

        if workflow.status == WorkflowStatus::Failed {
            return Err(ShieldgateError::WorkflowFailed(workflow_id));
        }
        if step.status == StepStatus::Signed {
            return Ok(step);
        }
        if step.status != StepStatus::Ready {
            return Err(ShieldgateError::StepNotReady {
                status: step.status,
            });
        }
        if !step.shield_ok {
            return Err(ShieldgateError::ShieldRequired);
        }
        if step.is_message {
            return Err(ShieldgateError::MessageNotSupported);
        }

        let signed_payload = self
            .signer
            .sign(&step.unsigned_transaction, &workflow.address)
            .await?;

        let updated = self
            .db
            .mark_step_signed(SignStepRow {
                workflow_id,
                step_id,
                signed_payload,
                event: CreateAuditEventRow {
                    event_type: AuditEventType::StepSigned.to_string(),
                    data: json!({ "stepId": step_id, "stepIndex": step.step_index }),
                },
            })
            .await?;

        match updated {
            Some(row) => {
                tracing::info!(workflow_id = %workflow_id, step_id = %step_id, "Step signed");
                Ok(row_to_step(row))
            }
            // A concurrent call signed it first
            None => {
                let current = self
                    .db
                    .get_step(workflow_id, step_id)
                    .await?
                    .map(row_to_step)
                    .ok_or(ShieldgateError::StepNotFound {
                        workflow_id,
                        step_id,
                    })?;
                match current.status {
                    StepStatus::Signed => Ok(current),
                    status => Err(ShieldgateError::StepNotReady { status }),
                }
            }
        }
    }

    async fn load_workflow(&self, id: Uuid) -> Result<Workflow> {
        self.db
            .get_workflow(id)
            .await?
            .map(row_to_workflow)
            .transpose()?
            .ok_or(ShieldgateError::WorkflowNotFound(id))
    }
}

/// Step indices must be exactly 0..n with no repeats
fn check_step_indices(plan: &ActionPlan) -> Result<()> {
    let mut indices: Vec<i32> = plan.transactions.iter().map(|t| t.step_index).collect();
    indices.sort_unstable();
    let contiguous = indices
        .iter()
        .enumerate()
        .all(|(i, index)| *index == i as i32);
    if contiguous {
        Ok(())
    } else {
        tracing::warn!(indices = ?indices, "Action source returned invalid step indices");
        Err(UpstreamError::other("Upstream returned non-contiguous step indices").into())
    }
}

fn build_graph(
    request: &ActionRequest,
    request_hash: String,
    plan: &ActionPlan,
    verdicts: Vec<ShieldVerdict>,
    failures: &[ShieldFailure],
) -> CreateWorkflowGraph {
    let validated = failures.is_empty();
    let status = if validated {
        WorkflowStatus::Validated
    } else {
        WorkflowStatus::Failed
    };

    let steps = plan
        .transactions
        .iter()
        .zip(verdicts)
        .map(|(tx, verdict)| step_row(tx, verdict))
        .collect();

    let mut events = vec![CreateAuditEventRow {
        event_type: AuditEventType::WorkflowCreated.to_string(),
        data: json!({
            "intent": request.intent,
            "yieldId": request.yield_id,
            "address": request.address,
            "stepCount": plan.transactions.len(),
        }),
    }];
    events.push(if validated {
        let tx_ids: Vec<&str> = plan
            .transactions
            .iter()
            .filter_map(|tx| tx.id.as_deref())
            .collect();
        CreateAuditEventRow {
            event_type: AuditEventType::YieldActionCreated.to_string(),
            data: json!({
                "yieldId": plan.yield_id,
                "stepCount": plan.transactions.len(),
                "txIds": tx_ids,
            }),
        }
    } else {
        CreateAuditEventRow {
            event_type: AuditEventType::ShieldFailed.to_string(),
            data: json!({ "failures": failures }),
        }
    });

    CreateWorkflowGraph {
        workflow: CreateWorkflowRow {
            intent: request.intent.to_string(),
            yield_id: request.yield_id.clone(),
            address: request.address.clone(),
            status: status.to_string(),
            request_hash,
        },
        steps,
        events,
    }
}

fn step_row(tx: &CandidateTransaction, verdict: ShieldVerdict) -> CreateStepRow {
    let status = if verdict.ok {
        StepStatus::Ready
    } else {
        StepStatus::Blocked
    };
    CreateStepRow {
        step_index: tx.step_index,
        network: tx.network.clone(),
        title: tx.title.clone(),
        status: status.to_string(),
        tx_id: tx.id.clone(),
        is_message: tx.is_message,
        unsigned_tx: tx.unsigned_transaction.clone(),
        structured_tx: tx.structured_transaction.clone(),
        annotated_tx: tx.annotated_transaction.clone(),
        shield_ok: verdict.ok,
        shield_reason: if verdict.ok {
            None
        } else {
            Some(
                verdict
                    .reason
                    .unwrap_or_else(|| DEFAULT_SHIELD_REASON.to_string()),
            )
        },
    }
}

fn row_to_workflow(row: WorkflowRow) -> Result<Workflow> {
    let intent = row
        .intent
        .parse()
        .map_err(|e: String| ShieldgateError::internal(e))?;
    Ok(Workflow {
        id: row.id,
        intent,
        yield_id: row.yield_id,
        address: row.address,
        status: WorkflowStatus::from(row.status.as_str()),
        request_hash: row.request_hash,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_step(row: StepRow) -> Step {
    Step {
        id: row.id,
        workflow_id: row.workflow_id,
        step_index: row.step_index,
        network: row.network,
        title: row.title,
        status: StepStatus::from(row.status.as_str()),
        tx_id: row.tx_id,
        is_message: row.is_message,
        unsigned_transaction: row.unsigned_tx,
        structured_transaction: row.structured_tx,
        annotated_transaction: row.annotated_tx,
        shield_ok: row.shield_ok,
        shield_reason: row.shield_reason,
        signed_payload: row.signed_payload,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_event(row: AuditEventRow) -> Result<AuditEvent> {
    let event_type = row
        .event_type
        .parse()
        .map_err(|e: String| ShieldgateError::internal(e))?;
    Ok(AuditEvent {
        id: row.id,
        workflow_id: row.workflow_id,
        event_type,
        data: row.data,
        created_at: row.created_at,
    })
}
