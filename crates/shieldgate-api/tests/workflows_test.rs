// HTTP-level workflow tests against the in-memory store

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shieldgate_api::{build_app, AppContext};
use shieldgate_core::{
    FixtureActionSource, LocalSigner, NoopShield, Shield, ShieldInput, ShieldVerdict,
};
use shieldgate_storage::StorageBackend;
use std::sync::Arc;
use tower::ServiceExt;

const API_KEY: &str = "test-api-key";

/// Blocks the vault deposit, passes the approval
struct BlockEnterStep;

#[async_trait]
impl Shield for BlockEnterStep {
    async fn validate(&self, input: ShieldInput<'_>) -> ShieldVerdict {
        if input.unsigned_transaction["nonce"] == 1 {
            ShieldVerdict::fail("vault not allow-listed")
        } else {
            ShieldVerdict::pass()
        }
    }

    fn name(&self) -> &'static str {
        "block-enter"
    }
}

struct TestApp {
    router: Router,
    db: StorageBackend,
    address: String,
}

fn test_app_with(shield: Arc<dyn Shield>, api_prefix: &str) -> TestApp {
    let signer = LocalSigner::from_seed([7u8; 32]);
    let address = signer.address().unwrap().to_string();
    let db = StorageBackend::in_memory();
    let router = build_app(AppContext {
        db: db.clone(),
        action_source: Arc::new(FixtureActionSource::new()),
        shield,
        signer: Arc::new(signer),
        api_key: API_KEY.to_string(),
        api_prefix: api_prefix.to_string(),
        cors_allowed_origins: Vec::new(),
    });
    TestApp {
        router,
        db,
        address,
    }
}

fn test_app() -> TestApp {
    test_app_with(Arc::new(NoopShield), "")
}

impl TestApp {
    fn create_body(&self) -> Value {
        json!({
            "intent": "enter",
            "yieldId": "ethereum-sepolia-test-yield",
            "address": self.address,
            "arguments": {"amount": "1"},
        })
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Response<Body>, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, Response::from_parts(parts, Body::empty()), json)
    }

    async fn post(&self, uri: &str, key: Option<&str>, body: Option<&Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("x-api-key", API_KEY)
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("idempotency-key", key);
        }
        let body = body
            .map(|b| Body::from(b.to_string()))
            .unwrap_or_else(Body::empty);
        let (status, _, json) = self.send(builder.body(body).unwrap()).await;
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header("x-api-key", API_KEY)
            .body(Body::empty())
            .unwrap();
        let (status, _, json) = self.send(request).await;
        (status, json)
    }

    fn workflow_count(&self) -> usize {
        match &self.db {
            StorageBackend::InMemory(mem) => mem.workflow_count(),
            StorageBackend::Postgres(_) => unreachable!(),
        }
    }
}

#[tokio::test]
async fn test_requires_api_key() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/workflows")
        .header("content-type", "application/json")
        .header("idempotency-key", "k1")
        .body(Body::from(app.create_body().to_string()))
        .unwrap();
    let (status, _, body) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(app.workflow_count(), 0);
}

#[tokio::test]
async fn test_health_is_open() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["db"]["ok"], true);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_create_workflow_returns_ready_steps() {
    let app = test_app();
    let (status, body) = app
        .post("/v1/workflows", Some("create-1"), Some(&app.create_body()))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["workflow"]["status"], "validated");
    assert_eq!(body["workflow"]["intent"], "enter");
    assert!(body["workflow"].get("requestHash").is_none());
    let steps = body["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert!(steps.iter().all(|s| s["status"] == "ready"));
    assert_eq!(steps[0]["stepIndex"], 0);
    assert_eq!(steps[1]["stepIndex"], 1);
}

#[tokio::test]
async fn test_create_replay_and_conflict() {
    let app = test_app();
    let body = app.create_body();

    let (first_status, first) = app.post("/v1/workflows", Some("k"), Some(&body)).await;
    let (second_status, second) = app.post("/v1/workflows", Some("k"), Some(&body)).await;
    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::CREATED);
    assert_eq!(first["workflow"]["id"], second["workflow"]["id"]);
    assert_eq!(first, second);
    assert_eq!(app.workflow_count(), 1);

    let mut changed = body.clone();
    changed["arguments"]["amount"] = json!("2");
    let (status, error) = app.post("/v1/workflows", Some("k"), Some(&changed)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["code"], "IDEMPOTENCY_CONFLICT");
    assert_eq!(app.workflow_count(), 1);
}

#[tokio::test]
async fn test_create_without_idempotency_key() {
    let app = test_app();
    let (status, body) = app
        .post("/v1/workflows", None, Some(&app.create_body()))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_IDEMPOTENCY_KEY");
    assert!(body["error"]["traceId"].is_string());
    assert_eq!(app.workflow_count(), 0);
}

#[tokio::test]
async fn test_create_rejects_invalid_body() {
    let app = test_app();
    let mut body = app.create_body();
    body["unexpected"] = json!(1);
    let (status, error) = app.post("/v1/workflows", Some("k"), Some(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "BAD_REQUEST");

    let mut body = app.create_body();
    body["yieldId"] = json!("");
    let (status, error) = app.post("/v1/workflows", Some("k"), Some(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "BAD_REQUEST");
    assert_eq!(app.workflow_count(), 0);
}

#[tokio::test]
async fn test_get_workflow_hides_signed_payload_by_default() {
    let app = test_app();
    let (_, created) = app
        .post("/v1/workflows", Some("k"), Some(&app.create_body()))
        .await;
    let workflow_id = created["workflow"]["id"].as_str().unwrap();
    let step_id = created["steps"][0]["id"].as_str().unwrap();

    let sign_uri = format!("/v1/workflows/{}/steps/{}/sign", workflow_id, step_id);
    let (status, signed) = app.post(&sign_uri, Some("sign-1"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(signed["status"], "signed");
    assert!(signed.get("signedPayload").is_none());

    let (status, plain) = app.get(&format!("/v1/workflows/{}", workflow_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(plain["steps"]
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s.get("signedPayload").is_none()));

    let (_, with_signed) = app
        .get(&format!("/v1/workflows/{}?includeSigned=true", workflow_id))
        .await;
    let payload = with_signed["steps"][0]["signedPayload"].as_str().unwrap();
    assert!(payload.starts_with("0x"));
    assert!(with_signed["steps"][1].get("signedPayload").is_none());
}

#[tokio::test]
async fn test_malformed_query_uses_error_shape() {
    let app = test_app();
    let (_, created) = app
        .post("/v1/workflows", Some("k"), Some(&app.create_body()))
        .await;
    let workflow_id = created["workflow"]["id"].as_str().unwrap();

    let (status, body) = app
        .get(&format!(
            "/v1/workflows/{}?includeSigned=true&includeSigned=false",
            workflow_id
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["traceId"].is_string());
}

#[tokio::test]
async fn test_sign_replay_is_identical_without_new_event() {
    let app = test_app();
    let (_, created) = app
        .post("/v1/workflows", Some("k"), Some(&app.create_body()))
        .await;
    let workflow_id = created["workflow"]["id"].as_str().unwrap();
    let step_id = created["steps"][0]["id"].as_str().unwrap();
    let sign_uri = format!("/v1/workflows/{}/steps/{}/sign", workflow_id, step_id);

    let (first_status, first) = app.post(&sign_uri, Some("sign-1"), None).await;
    let (second_status, second) = app.post(&sign_uri, Some("sign-1"), None).await;
    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::CREATED);
    assert_eq!(first, second);

    // A fresh key re-enters the state machine, which returns the signed step as-is
    let (third_status, third) = app.post(&sign_uri, Some("sign-2"), None).await;
    assert_eq!(third_status, StatusCode::CREATED);
    assert_eq!(third["status"], "signed");

    let (_, events) = app
        .get(&format!("/v1/workflows/{}/events", workflow_id))
        .await;
    let types: Vec<&str> = events["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec!["workflow_created", "yield_action_created", "step_signed"]
    );
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let app = test_app();
    let (status, body) = app
        .get("/v1/workflows/0190a5b2-0000-7000-8000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = app.get("/v1/workflows/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, created) = app
        .post("/v1/workflows", Some("k"), Some(&app.create_body()))
        .await;
    let workflow_id = created["workflow"]["id"].as_str().unwrap();
    let (status, body) = app
        .post(
            &format!("/v1/workflows/{}/steps/bogus/sign", workflow_id),
            Some("s"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Step not found");
}

#[tokio::test]
async fn test_shield_failure_persists_failed_workflow() {
    let app = test_app_with(Arc::new(BlockEnterStep), "");
    let (status, body) = app
        .post("/v1/workflows", Some("k"), Some(&app.create_body()))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SHIELD_INVALID");
    let details = &body["error"]["details"];
    assert_eq!(details["failures"][0]["stepIndex"], 1);
    assert_eq!(details["failures"][0]["reason"], "vault not allow-listed");
    let workflow_id = details["workflowId"].as_str().unwrap().to_string();

    let (status, fetched) = app.get(&format!("/v1/workflows/{}", workflow_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["workflow"]["status"], "failed");
    assert_eq!(fetched["steps"][0]["status"], "ready");
    assert_eq!(fetched["steps"][1]["status"], "blocked");

    // The approval passed the shield but belongs to a failed workflow
    let step_id = fetched["steps"][0]["id"].as_str().unwrap();
    let (status, error) = app
        .post(
            &format!("/v1/workflows/{}/steps/{}/sign", workflow_id, step_id),
            Some("s"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["code"], "WORKFLOW_FAILED");

    // Failed creations are not cached; the retry creates another workflow
    let (status, _) = app
        .post("/v1/workflows", Some("k"), Some(&app.create_body()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.workflow_count(), 2);
}

#[tokio::test]
async fn test_sign_with_wrong_address_is_rejected() {
    let app = test_app();
    let mut body = app.create_body();
    body["address"] = json!("0x000000000000000000000000000000000000dead");
    let (_, created) = app.post("/v1/workflows", Some("k"), Some(&body)).await;
    let workflow_id = created["workflow"]["id"].as_str().unwrap();
    let step_id = created["steps"][0]["id"].as_str().unwrap();

    let (status, error) = app
        .post(
            &format!("/v1/workflows/{}/steps/{}/sign", workflow_id, step_id),
            Some("s"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "ADDRESS_MISMATCH");

    let (_, fetched) = app
        .get(&format!("/v1/workflows/{}?includeSigned=true", workflow_id))
        .await;
    assert_eq!(fetched["steps"][0]["status"], "ready");
}

#[tokio::test]
async fn test_trace_id_is_echoed() {
    let app = test_app();
    let request = Request::builder()
        .uri("/v1/workflows/not-a-uuid")
        .header("x-api-key", API_KEY)
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let (status, response, body) = app.send(request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(body["error"]["traceId"], "req-123");

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (_, response, _) = app.send(request).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_api_prefix_applies_to_workflow_routes() {
    let app = test_app_with(Arc::new(NoopShield), "/api");
    let (status, _) = app
        .post("/api/v1/workflows", Some("k"), Some(&app.create_body()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.get("/v1/workflows/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Health stays at the root
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
}
