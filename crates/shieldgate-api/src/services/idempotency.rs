// Idempotency guard for mutating operations
// Decision: Cache only successful results; failed operations leave no record
// Decision: The record insert is separate from the operation's own writes, so a
//           lost insert race re-reads the winner instead of failing

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shieldgate_core::{fingerprint, IdempotencyRecord, Result, ShieldgateError};
use shieldgate_storage::{CreateIdempotencyRecordRow, IdempotencyRecordRow, StorageBackend};
use std::future::Future;

pub struct IdempotencyService {
    db: StorageBackend,
}

impl IdempotencyService {
    pub fn new(db: StorageBackend) -> Self {
        Self { db }
    }

    /// Run `operation` at most once per (scope, key) from the caller's point of view.
    ///
    /// - A stored record with the same body fingerprint is returned as-is.
    /// - A stored record with a different fingerprint is a conflict.
    /// - Otherwise the operation runs and its result is stored. If another
    ///   caller stored first, that caller's result wins.
    pub async fn execute<T, F, Fut>(
        &self,
        scope: &str,
        key: Option<&str>,
        body: &Value,
        operation: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = key
            .filter(|k| !k.trim().is_empty())
            .ok_or(ShieldgateError::MissingKey)?;
        let request_hash = fingerprint(body);

        if let Some(record) = self.find(scope, key).await? {
            tracing::debug!(scope = %scope, "Idempotency hit");
            return resolve(record, &request_hash);
        }

        let result = operation().await?;

        let response_body = serde_json::to_value(&result)
            .map_err(|e| ShieldgateError::internal(format!("Failed to encode result: {}", e)))?;
        let inserted = self
            .db
            .create_idempotency_record(CreateIdempotencyRecordRow {
                scope: scope.to_string(),
                idempotency_key: key.to_string(),
                request_hash: request_hash.clone(),
                response_body,
            })
            .await?;

        if inserted {
            return Ok(result);
        }

        tracing::info!(scope = %scope, "Idempotency insert lost a race, using stored result");
        let record = self.find(scope, key).await?.ok_or_else(|| {
            ShieldgateError::internal("Idempotency record missing after unique conflict")
        })?;
        resolve(record, &request_hash)
    }

    async fn find(&self, scope: &str, key: &str) -> Result<Option<IdempotencyRecord>> {
        let row = self.db.get_idempotency_record(scope, key).await?;
        Ok(row.map(row_to_record))
    }
}

fn row_to_record(row: IdempotencyRecordRow) -> IdempotencyRecord {
    IdempotencyRecord {
        id: row.id,
        scope: row.scope,
        key: row.idempotency_key,
        request_hash: row.request_hash,
        response_body: row.response_body,
        created_at: row.created_at,
    }
}

fn resolve<T: DeserializeOwned>(record: IdempotencyRecord, request_hash: &str) -> Result<T> {
    if record.request_hash != request_hash {
        return Err(ShieldgateError::IdempotencyConflict);
    }
    serde_json::from_value(record.response_body)
        .map_err(|e| ShieldgateError::internal(format!("Failed to decode stored result: {}", e)))
}
