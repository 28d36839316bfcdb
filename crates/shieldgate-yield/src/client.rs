// Yield API HTTP client

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shieldgate_core::{Intent, RateLimitInfo, UpstreamError};

use crate::types::{YieldActionBody, YieldActionResponse};

/// Client for the upstream yield API
#[derive(Clone)]
pub struct YieldClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl YieldClient {
    /// Create a client; every request is bounded by `timeout`
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build yield API HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// GET /v1/yields/{id}
    pub async fn get_yield(&self, yield_id: &str) -> Result<Value, UpstreamError> {
        let mut url = self.url("/v1/yields")?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::other("Invalid yield API base URL"))?
            .push(yield_id);

        self.send(self.client.get(url)).await
    }

    /// POST /v1/actions/{intent}
    pub async fn create_action(
        &self,
        intent: Intent,
        body: &YieldActionBody<'_>,
    ) -> Result<YieldActionResponse, UpstreamError> {
        let url = self.url(&format!("/v1/actions/{}", intent))?;
        self.send(self.client.post(url).json(body)).await
    }

    fn url(&self, path: &str) -> Result<Url, UpstreamError> {
        Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            tracing::error!("Invalid yield API URL: {}", e);
            UpstreamError::other("Invalid yield API base URL")
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, UpstreamError> {
        let response = request
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(map_error_response(response).await);
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                return UpstreamError::Timeout;
            }
            tracing::error!("Failed to parse yield API response: {}", e);
            UpstreamError::other("Upstream returned an invalid response")
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        tracing::warn!("Yield API request timed out");
        UpstreamError::Timeout
    } else {
        tracing::error!("Yield API error: {}", e);
        UpstreamError::other("Upstream request failed")
    }
}

async fn map_error_response(response: Response) -> UpstreamError {
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    // Non-JSON bodies carry no message
    let message = response
        .json::<Value>()
        .await
        .ok()
        .map(|json| upstream_message(&json));

    tracing::warn!(status, message = ?message, "Yield API returned an error");

    if status == 429 {
        let retry_after_header = header_str(&headers, "retry-after");
        return UpstreamError::RateLimited {
            retry_after: retry_after_header.as_deref().and_then(parse_retry_after),
            retry_after_header,
            rate_limit: RateLimitInfo {
                limit: header_str(&headers, "x-ratelimit-limit"),
                remaining: header_str(&headers, "x-ratelimit-remaining"),
                reset: header_str(&headers, "x-ratelimit-reset"),
            },
            message,
        };
    }

    UpstreamError::from_status(status, message)
}

/// Leading whole seconds of a Retry-After value ("12.5" reads as 12)
fn parse_retry_after(raw: &str) -> Option<u64> {
    let raw = raw.trim_start();
    let digits = raw
        .find(|c: char| !c.is_ascii_digit())
        .map_or(raw, |end| &raw[..end]);
    digits.parse().ok()
}

/// `message`, then `error.message`, then the raw JSON text
fn upstream_message(json: &Value) -> String {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    non_empty(json.get("message"))
        .or_else(|| non_empty(json.get("error").and_then(|e| e.get("message"))))
        .unwrap_or_else(|| json.to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}
