// Authentication module
// Decision: One shared API key for every /v1 route; /health stays open

pub mod api_key;

pub use api_key::{hash_api_key, require_api_key, ApiKeyState};
