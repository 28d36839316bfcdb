// PostgreSQL repository tests
// Run with: DATABASE_URL=postgres://... cargo test -p shieldgate-storage --test postgres_test -- --ignored --test-threads=1
// Requires: a reachable PostgreSQL database (migrations are applied by the test)

use serde_json::json;
use shieldgate_storage::*;
use uuid::Uuid;

async fn connect() -> Database {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::from_url(&url).await.expect("Failed to connect");
    db.migrate().await.expect("Failed to migrate");
    db
}

fn graph(step_statuses: &[&str]) -> CreateWorkflowGraph {
    CreateWorkflowGraph {
        workflow: CreateWorkflowRow {
            intent: "enter".into(),
            yield_id: "pg-test-yield".into(),
            address: "0xabc".into(),
            status: "validated".into(),
            request_hash: "hash".into(),
        },
        steps: step_statuses
            .iter()
            .enumerate()
            .map(|(i, status)| CreateStepRow {
                step_index: i as i32,
                network: "eip155:11155111".into(),
                title: format!("step-{}", i),
                status: status.to_string(),
                tx_id: None,
                is_message: false,
                unsigned_tx: json!({"to": "0x11", "data": "0x"}),
                structured_tx: None,
                annotated_tx: None,
                shield_ok: *status == "ready",
                shield_reason: None,
            })
            .collect(),
        events: vec![CreateAuditEventRow {
            event_type: "workflow_created".into(),
            data: json!({"stepCount": step_statuses.len()}),
        }],
    }
}

#[tokio::test]
#[ignore]
async fn test_idempotency_insert_reports_existing() {
    let db = connect().await;
    let key = Uuid::now_v7().to_string();
    let input = CreateIdempotencyRecordRow {
        scope: "POST:/v1/workflows".into(),
        idempotency_key: key.clone(),
        request_hash: "first".into(),
        response_body: json!({"ok": true}),
    };

    assert!(db.create_idempotency_record(input.clone()).await.unwrap());

    let mut second = input;
    second.request_hash = "second".into();
    assert!(!db.create_idempotency_record(second).await.unwrap());

    let stored = db
        .get_idempotency_record("POST:/v1/workflows", &key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.request_hash, "first");
}

#[tokio::test]
#[ignore]
async fn test_workflow_graph_and_signing() {
    let db = connect().await;
    let created = db
        .create_workflow_graph(graph(&["ready", "blocked"]))
        .await
        .unwrap();
    let wf = created.workflow.id;

    let steps = db.list_steps(wf).await.unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].step_index, 0);

    let sign = |step_id| SignStepRow {
        workflow_id: wf,
        step_id,
        signed_payload: "0xsigned".into(),
        event: CreateAuditEventRow {
            event_type: "step_signed".into(),
            data: json!({}),
        },
    };

    let signed = db.mark_step_signed(sign(steps[0].id)).await.unwrap();
    assert_eq!(signed.unwrap().status, "signed");
    assert!(db.mark_step_signed(sign(steps[0].id)).await.unwrap().is_none());
    assert!(db.mark_step_signed(sign(steps[1].id)).await.unwrap().is_none());

    let events = db.list_audit_events(wf).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event_type, "step_signed");
}

#[tokio::test]
#[ignore]
async fn test_duplicate_step_index_rolls_back() {
    let db = connect().await;
    let mut input = graph(&["ready", "ready"]);
    input.steps[1].step_index = 0;
    let yield_id = format!("rollback-{}", Uuid::now_v7());
    input.workflow.yield_id = yield_id.clone();

    assert!(db.create_workflow_graph(input).await.is_err());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workflows WHERE yield_id = $1")
        .bind(&yield_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}
