// Request extractors and header helpers

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, HeaderMap, Method},
    Json,
};
use serde::de::DeserializeOwned;
use shieldgate_core::ShieldgateError;

use super::error::ApiError;
use super::trace::TraceId;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// JSON body whose rejections render as BAD_REQUEST in the uniform error shape
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let trace_id = req
            .extensions()
            .get::<TraceId>()
            .cloned()
            .unwrap_or_else(TraceId::generate);

        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(ApiError::new(
                ShieldgateError::validation(rejection.body_text()),
                &trace_id,
            )),
        }
    }
}

/// Query string whose rejections render as BAD_REQUEST in the uniform error shape
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(AppQuery(value)),
            Err(rejection) => {
                let trace_id = parts
                    .extensions
                    .get::<TraceId>()
                    .cloned()
                    .unwrap_or_else(TraceId::generate);
                Err(ApiError::new(
                    ShieldgateError::validation(rejection.body_text()),
                    &trace_id,
                ))
            }
        }
    }
}

/// Client-supplied idempotency key; blank values count as missing
pub fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Idempotency scope: "{METHOD}:{path}"
pub fn request_scope(method: &Method, path: &str) -> String {
    format!("{}:{}", method, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(idempotency_key(&headers), None);

        headers.insert(IDEMPOTENCY_KEY_HEADER, "   ".parse().unwrap());
        assert_eq!(idempotency_key(&headers), None);

        headers.insert(IDEMPOTENCY_KEY_HEADER, " abc-123 ".parse().unwrap());
        assert_eq!(idempotency_key(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_request_scope() {
        assert_eq!(
            request_scope(&Method::POST, "/v1/workflows"),
            "POST:/v1/workflows"
        );
    }
}
