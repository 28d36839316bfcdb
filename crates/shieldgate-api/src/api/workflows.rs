// Workflow HTTP routes
// Decision: Path ids are parsed in the handler so a malformed id is a 404, not a 400
// Decision: Idempotency scope is the concrete request path, prefix included

use axum::{
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shieldgate_core::{ActionRequest, AuditEvent, Intent, ShieldgateError, Step, WorkflowWithSteps};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{ErrorResponse, ListResponse};
use super::error::{ApiError, WithTrace};
use super::extract::{idempotency_key, request_scope, AppJson, AppQuery};
use super::trace::TraceId;
use super::validation::validate_create_workflow;
use crate::services::{IdempotencyService, WorkflowService};

/// App state for workflow routes
#[derive(Clone)]
pub struct AppState {
    pub workflows: Arc<WorkflowService>,
    pub idempotency: Arc<IdempotencyService>,
}

impl AppState {
    pub fn new(workflows: Arc<WorkflowService>, idempotency: Arc<IdempotencyService>) -> Self {
        Self {
            workflows,
            idempotency,
        }
    }
}

/// Request body for creating a workflow
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateWorkflowRequest {
    pub intent: Intent,
    #[schema(example = "ethereum-sepolia-test-yield")]
    pub yield_id: String,
    pub address: String,
    /// Intent-specific arguments, forwarded to the action source
    #[schema(value_type = Object)]
    pub arguments: Value,
    /// Manage action name; ignored for enter and exit
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub passthrough: Option<Value>,
}

impl From<CreateWorkflowRequest> for ActionRequest {
    fn from(req: CreateWorkflowRequest) -> Self {
        ActionRequest {
            intent: req.intent,
            yield_id: req.yield_id,
            address: req.address,
            arguments: req.arguments,
            action: req.action,
            passthrough: req.passthrough,
        }
    }
}

/// Query parameters for fetching a workflow
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct GetWorkflowQuery {
    /// Only the literal "true" includes signed payloads
    #[serde(default)]
    pub include_signed: Option<String>,
}

impl GetWorkflowQuery {
    fn include_signed(&self) -> bool {
        self.include_signed.as_deref() == Some("true")
    }
}

/// Create workflow routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/workflows", post(create_workflow))
        .route("/v1/workflows/:workflow_id", get(get_workflow))
        .route("/v1/workflows/:workflow_id/events", get(list_events))
        .route(
            "/v1/workflows/:workflow_id/steps/:step_id/sign",
            post(sign_step),
        )
        .with_state(state)
}

fn parse_workflow_id(raw: &str) -> Result<Uuid, ShieldgateError> {
    Uuid::parse_str(raw).map_err(|_| ShieldgateError::WorkflowNotFound(Uuid::nil()))
}

fn parse_step_id(workflow_id: Uuid, raw: &str) -> Result<Uuid, ShieldgateError> {
    Uuid::parse_str(raw).map_err(|_| ShieldgateError::StepNotFound {
        workflow_id,
        step_id: Uuid::nil(),
    })
}

/// POST /v1/workflows - Create a workflow for an intent
#[utoipa::path(
    post,
    path = "/v1/workflows",
    request_body = CreateWorkflowRequest,
    params(
        ("Idempotency-Key" = String, Header, description = "Client-chosen key; replays return the first result")
    ),
    responses(
        (status = 201, description = "Workflow created and validated", body = WorkflowWithSteps),
        (status = 400, description = "Invalid body, missing idempotency key, or shield rejected a step", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 409, description = "Idempotency key reused with a different body", body = ErrorResponse),
        (status = 429, description = "Upstream rate limited", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    ),
    tag = "workflows"
)]
pub async fn create_workflow(
    State(state): State<AppState>,
    trace_id: TraceId,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    AppJson(req): AppJson<CreateWorkflowRequest>,
) -> Result<(StatusCode, Json<WorkflowWithSteps>), ApiError> {
    validate_create_workflow(&req).with_trace(&trace_id)?;

    let request = ActionRequest::from(req);
    let body = serde_json::to_value(&request)
        .map_err(|e| ShieldgateError::internal(format!("Failed to encode request: {}", e)))
        .with_trace(&trace_id)?;
    let scope = request_scope(&method, uri.path());
    let key = idempotency_key(&headers);

    let created = state
        .idempotency
        .execute(&scope, key.as_deref(), &body, || {
            state.workflows.create(request)
        })
        .await
        .with_trace(&trace_id)?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /v1/workflows/{workflow_id} - Get a workflow with its steps
#[utoipa::path(
    get,
    path = "/v1/workflows/{workflow_id}",
    params(
        ("workflow_id" = Uuid, Path, description = "Workflow ID"),
        GetWorkflowQuery
    ),
    responses(
        (status = 200, description = "Workflow found", body = WorkflowWithSteps),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "Workflow not found", body = ErrorResponse)
    ),
    tag = "workflows"
)]
pub async fn get_workflow(
    State(state): State<AppState>,
    trace_id: TraceId,
    Path(workflow_id): Path<String>,
    AppQuery(query): AppQuery<GetWorkflowQuery>,
) -> Result<Json<WorkflowWithSteps>, ApiError> {
    let workflow_id = parse_workflow_id(&workflow_id).with_trace(&trace_id)?;
    let workflow = state
        .workflows
        .get(workflow_id, query.include_signed())
        .await
        .with_trace(&trace_id)?;

    Ok(Json(workflow))
}

/// GET /v1/workflows/{workflow_id}/events - Audit trail in append order
#[utoipa::path(
    get,
    path = "/v1/workflows/{workflow_id}/events",
    params(
        ("workflow_id" = Uuid, Path, description = "Workflow ID")
    ),
    responses(
        (status = 200, description = "Audit events", body = ListResponse<AuditEvent>),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "Workflow not found", body = ErrorResponse)
    ),
    tag = "workflows"
)]
pub async fn list_events(
    State(state): State<AppState>,
    trace_id: TraceId,
    Path(workflow_id): Path<String>,
) -> Result<Json<ListResponse<AuditEvent>>, ApiError> {
    let workflow_id = parse_workflow_id(&workflow_id).with_trace(&trace_id)?;
    let events = state
        .workflows
        .list_events(workflow_id)
        .await
        .with_trace(&trace_id)?;

    Ok(Json(ListResponse::new(events)))
}

/// POST /v1/workflows/{workflow_id}/steps/{step_id}/sign - Sign one step
#[utoipa::path(
    post,
    path = "/v1/workflows/{workflow_id}/steps/{step_id}/sign",
    params(
        ("workflow_id" = Uuid, Path, description = "Workflow ID"),
        ("step_id" = Uuid, Path, description = "Step ID"),
        ("Idempotency-Key" = String, Header, description = "Client-chosen key; replays return the first result")
    ),
    responses(
        (status = 201, description = "Step signed; the payload is only returned by GET with includeSigned=true", body = Step),
        (status = 400, description = "Missing idempotency key or step cannot be signed", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "Workflow or step not found", body = ErrorResponse),
        (status = 409, description = "Workflow failed, step not ready, or idempotency conflict", body = ErrorResponse)
    ),
    tag = "workflows"
)]
pub async fn sign_step(
    State(state): State<AppState>,
    trace_id: TraceId,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path((workflow_id, step_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Step>), ApiError> {
    let workflow_id = parse_workflow_id(&workflow_id).with_trace(&trace_id)?;
    let step_id = parse_step_id(workflow_id, &step_id).with_trace(&trace_id)?;

    let body = json!({ "workflowId": workflow_id, "stepId": step_id });
    let scope = request_scope(&method, uri.path());
    let key = idempotency_key(&headers);

    let step = state
        .idempotency
        .execute(&scope, key.as_deref(), &body, || async {
            state
                .workflows
                .sign_step(workflow_id, step_id)
                .await
                .map(|step| step.with_signed_payload(false))
        })
        .await
        .with_trace(&trace_id)?;

    Ok((StatusCode::CREATED, Json(step)))
}
