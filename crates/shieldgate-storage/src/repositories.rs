// Repository layer for database operations
// Decision: IDs are generated here (UUID v7) so both backends agree on ordering
// Decision: Multi-row writes (workflow graph, step signing) run in one transaction

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Raw pool, for ad-hoc queries in tests
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Round-trip check used by the health endpoint
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Idempotency records
    // ============================================

    pub async fn get_idempotency_record(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<IdempotencyRecordRow>> {
        let row = sqlx::query_as::<_, IdempotencyRecordRow>(
            r#"
            SELECT id, scope, idempotency_key, request_hash, response_body, created_at
            FROM idempotency_keys
            WHERE scope = $1 AND idempotency_key = $2
            "#,
        )
        .bind(scope)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Insert a record; returns false when (scope, key) already exists
    pub async fn create_idempotency_record(
        &self,
        input: CreateIdempotencyRecordRow,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO idempotency_keys (id, scope, idempotency_key, request_hash, response_body)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (scope, idempotency_key) DO NOTHING
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.scope)
        .bind(&input.idempotency_key)
        .bind(&input.request_hash)
        .bind(&input.response_body)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // ============================================
    // Workflows
    // ============================================

    pub async fn create_workflow_graph(&self, input: CreateWorkflowGraph) -> Result<WorkflowGraphRow> {
        let mut tx = self.pool.begin().await?;

        let workflow = sqlx::query_as::<_, WorkflowRow>(
            r#"
            INSERT INTO workflows (id, intent, yield_id, address, status, request_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, intent, yield_id, address, status, request_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.workflow.intent)
        .bind(&input.workflow.yield_id)
        .bind(&input.workflow.address)
        .bind(&input.workflow.status)
        .bind(&input.workflow.request_hash)
        .fetch_one(&mut *tx)
        .await?;

        let mut steps = Vec::with_capacity(input.steps.len());
        for step in &input.steps {
            let row = sqlx::query_as::<_, StepRow>(
                r#"
                INSERT INTO steps (
                    id, workflow_id, step_index, network, title, status, tx_id, is_message,
                    unsigned_tx, structured_tx, annotated_tx, shield_ok, shield_reason
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                RETURNING id, workflow_id, step_index, network, title, status, tx_id, is_message,
                          unsigned_tx, structured_tx, annotated_tx, shield_ok, shield_reason,
                          signed_payload, created_at, updated_at
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(workflow.id)
            .bind(step.step_index)
            .bind(&step.network)
            .bind(&step.title)
            .bind(&step.status)
            .bind(&step.tx_id)
            .bind(step.is_message)
            .bind(&step.unsigned_tx)
            .bind(&step.structured_tx)
            .bind(&step.annotated_tx)
            .bind(step.shield_ok)
            .bind(&step.shield_reason)
            .fetch_one(&mut *tx)
            .await?;
            steps.push(row);
        }

        for event in &input.events {
            sqlx::query(
                r#"
                INSERT INTO audit_events (id, workflow_id, event_type, data)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(workflow.id)
            .bind(&event.event_type)
            .bind(&event.data)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(WorkflowGraphRow { workflow, steps })
    }

    pub async fn get_workflow(&self, id: Uuid) -> Result<Option<WorkflowRow>> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, intent, yield_id, address, status, request_hash, created_at, updated_at
            FROM workflows
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ============================================
    // Steps
    // ============================================

    pub async fn list_steps(&self, workflow_id: Uuid) -> Result<Vec<StepRow>> {
        let rows = sqlx::query_as::<_, StepRow>(
            r#"
            SELECT id, workflow_id, step_index, network, title, status, tx_id, is_message,
                   unsigned_tx, structured_tx, annotated_tx, shield_ok, shield_reason,
                   signed_payload, created_at, updated_at
            FROM steps
            WHERE workflow_id = $1
            ORDER BY step_index ASC
            "#,
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn get_step(&self, workflow_id: Uuid, step_id: Uuid) -> Result<Option<StepRow>> {
        let row = sqlx::query_as::<_, StepRow>(
            r#"
            SELECT id, workflow_id, step_index, network, title, status, tx_id, is_message,
                   unsigned_tx, structured_tx, annotated_tx, shield_ok, shield_reason,
                   signed_payload, created_at, updated_at
            FROM steps
            WHERE workflow_id = $1 AND id = $2
            "#,
        )
        .bind(workflow_id)
        .bind(step_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Attach the signed payload and append the audit event.
    /// Returns None when the step was no longer `ready` (nothing is written).
    pub async fn mark_step_signed(&self, input: SignStepRow) -> Result<Option<StepRow>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, StepRow>(
            r#"
            UPDATE steps
            SET status = 'signed', signed_payload = $3, updated_at = NOW()
            WHERE workflow_id = $1 AND id = $2 AND status = 'ready'
            RETURNING id, workflow_id, step_index, network, title, status, tx_id, is_message,
                      unsigned_tx, structured_tx, annotated_tx, shield_ok, shield_reason,
                      signed_payload, created_at, updated_at
            "#,
        )
        .bind(input.workflow_id)
        .bind(input.step_id)
        .bind(&input.signed_payload)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO audit_events (id, workflow_id, event_type, data)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.workflow_id)
        .bind(&input.event.event_type)
        .bind(&input.event.data)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(row))
    }

    // ============================================
    // Audit events
    // ============================================

    pub async fn list_audit_events(&self, workflow_id: Uuid) -> Result<Vec<AuditEventRow>> {
        let rows = sqlx::query_as::<_, AuditEventRow>(
            r#"
            SELECT id, workflow_id, event_type, data, created_at
            FROM audit_events
            WHERE workflow_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
