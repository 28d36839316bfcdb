// OpenAPI specification generation
//
// Shared by the API server (Swagger UI) and the export-openapi binary.

use crate::api;
use crate::api::{ErrorBody, ErrorResponse, ListResponse};
use shieldgate_core::{
    AuditEvent, AuditEventType, Intent, ShieldFailure, Step, StepStatus, Workflow,
    WorkflowStatus, WorkflowWithSteps,
};
use utoipa::OpenApi;

/// OpenAPI documentation for the Shieldgate API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health,
        api::workflows::create_workflow,
        api::workflows::get_workflow,
        api::workflows::list_events,
        api::workflows::sign_step,
    ),
    components(
        schemas(
            Intent, Workflow, WorkflowStatus, Step, StepStatus, WorkflowWithSteps,
            AuditEvent, AuditEventType, ShieldFailure,
            api::workflows::CreateWorkflowRequest,
            api::health::HealthResponse, api::health::DbHealth,
            ErrorResponse, ErrorBody,
            ListResponse<AuditEvent>,
        )
    ),
    tags(
        (name = "workflows", description = "Workflow creation, retrieval and step signing"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Shieldgate API",
        description = "Idempotent yield workflows with per-step shield validation and signing",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty-printed JSON string
    pub fn to_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}
