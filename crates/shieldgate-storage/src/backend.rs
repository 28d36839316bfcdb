// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// This module provides a unified StorageBackend enum that can work with
// either PostgreSQL (production) or in-memory (dev mode) storage.

use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use crate::memory::InMemoryDatabase;
use crate::models::*;
use crate::repositories::Database;

/// Storage backend that can be either PostgreSQL or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(Database),
    /// In-memory database (dev mode)
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Create a PostgreSQL storage backend from a database URL and apply migrations
    pub async fn postgres(database_url: &str) -> Result<Self> {
        let db = Database::from_url(database_url).await?;
        db.migrate().await?;
        Ok(Self::Postgres(db))
    }

    /// Create an in-memory storage backend
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    pub async fn ping(&self) -> Result<()> {
        match self {
            Self::Postgres(db) => db.ping().await,
            Self::InMemory(_) => Ok(()),
        }
    }

    // ============================================
    // Idempotency records
    // ============================================

    pub async fn get_idempotency_record(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<IdempotencyRecordRow>> {
        match self {
            Self::Postgres(db) => db.get_idempotency_record(scope, key).await,
            Self::InMemory(db) => db.get_idempotency_record(scope, key).await,
        }
    }

    /// Returns false when a record for (scope, key) already exists
    pub async fn create_idempotency_record(
        &self,
        input: CreateIdempotencyRecordRow,
    ) -> Result<bool> {
        match self {
            Self::Postgres(db) => db.create_idempotency_record(input).await,
            Self::InMemory(db) => db.create_idempotency_record(input).await,
        }
    }

    // ============================================
    // Workflows
    // ============================================

    pub async fn create_workflow_graph(&self, input: CreateWorkflowGraph) -> Result<WorkflowGraphRow> {
        match self {
            Self::Postgres(db) => db.create_workflow_graph(input).await,
            Self::InMemory(db) => db.create_workflow_graph(input).await,
        }
    }

    pub async fn get_workflow(&self, id: Uuid) -> Result<Option<WorkflowRow>> {
        match self {
            Self::Postgres(db) => db.get_workflow(id).await,
            Self::InMemory(db) => db.get_workflow(id).await,
        }
    }

    // ============================================
    // Steps
    // ============================================

    pub async fn list_steps(&self, workflow_id: Uuid) -> Result<Vec<StepRow>> {
        match self {
            Self::Postgres(db) => db.list_steps(workflow_id).await,
            Self::InMemory(db) => db.list_steps(workflow_id).await,
        }
    }

    pub async fn get_step(&self, workflow_id: Uuid, step_id: Uuid) -> Result<Option<StepRow>> {
        match self {
            Self::Postgres(db) => db.get_step(workflow_id, step_id).await,
            Self::InMemory(db) => db.get_step(workflow_id, step_id).await,
        }
    }

    /// Returns None when the step was not `ready`
    pub async fn mark_step_signed(&self, input: SignStepRow) -> Result<Option<StepRow>> {
        match self {
            Self::Postgres(db) => db.mark_step_signed(input).await,
            Self::InMemory(db) => db.mark_step_signed(input).await,
        }
    }

    // ============================================
    // Audit events
    // ============================================

    pub async fn list_audit_events(&self, workflow_id: Uuid) -> Result<Vec<AuditEventRow>> {
        match self {
            Self::Postgres(db) => db.list_audit_events(workflow_id).await,
            Self::InMemory(db) => db.list_audit_events(workflow_id).await,
        }
    }
}
