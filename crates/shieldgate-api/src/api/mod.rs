// HTTP API routes
//
// Each resource module exposes `routes(state)` with its own AppState.
// Errors from every route render through ApiError as one uniform JSON shape.

pub mod common;
pub mod error;
pub mod extract;
pub mod health;
pub mod trace;
pub mod validation;
pub mod workflows;

// Re-export common types
pub use common::{ErrorBody, ErrorResponse, ListResponse};
pub use error::ApiError;
pub use trace::TraceId;
