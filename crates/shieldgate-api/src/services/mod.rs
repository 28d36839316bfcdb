// Services layer for business logic
// Services own the workflow rules and call storage directly

pub mod idempotency;
pub mod workflow;

pub use idempotency::IdempotencyService;
pub use workflow::WorkflowService;
