// Input validation for workflow APIs
//
// Shape is enforced by serde (known fields, intent enum); this adds the
// content rules serde cannot express.

use shieldgate_core::ShieldgateError;

use super::workflows::CreateWorkflowRequest;

// =============================================================================
// Input Size Limits
// =============================================================================

/// Maximum size for identifiers (yield id, address, manage action).
pub const MAX_IDENTIFIER_BYTES: usize = 256;

/// Maximum serialized size for `arguments` and `passthrough`.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024; // 64 KB

// =============================================================================
// Validation Functions
// =============================================================================

fn require_identifier(field: &str, value: &str) -> Result<(), ShieldgateError> {
    if value.trim().is_empty() {
        return Err(ShieldgateError::validation(format!(
            "{} must not be empty",
            field
        )));
    }
    if value.len() > MAX_IDENTIFIER_BYTES {
        return Err(ShieldgateError::validation(format!(
            "{} exceeds {} bytes",
            field, MAX_IDENTIFIER_BYTES
        )));
    }
    Ok(())
}

fn require_object(field: &str, value: &serde_json::Value) -> Result<(), ShieldgateError> {
    if !value.is_object() {
        return Err(ShieldgateError::validation(format!(
            "{} must be an object",
            field
        )));
    }
    if value.to_string().len() > MAX_PAYLOAD_BYTES {
        return Err(ShieldgateError::validation(format!(
            "{} exceeds {} bytes",
            field, MAX_PAYLOAD_BYTES
        )));
    }
    Ok(())
}

/// Validate a create-workflow request body
pub fn validate_create_workflow(req: &CreateWorkflowRequest) -> Result<(), ShieldgateError> {
    require_identifier("yieldId", &req.yield_id)?;
    require_identifier("address", &req.address)?;
    require_object("arguments", &req.arguments)?;
    if let Some(action) = &req.action {
        require_identifier("action", action)?;
    }
    if let Some(passthrough) = &req.passthrough {
        require_object("passthrough", passthrough)?;
    }
    Ok(())
}
