//! Append-only audit trail (C2).
//!
//! `record` never opens its own connection or commits anything; it always
//! runs inside the caller's transaction, so a failed audit write rolls back
//! the whole unit of work along with it, per contract.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    pub tenant_id: String,
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub entity_id: Uuid,
    pub meta: Value,
    pub occurred_at: DateTime<Utc>,
}

/// Append one row to `audit_log` in the caller's transaction.
pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    actor: &str,
    action: &str,
    entity: &str,
    entity_id: Uuid,
    meta: Value,
) -> Result<Uuid, AuditError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO audit_log (id, tenant_id, actor, action, entity, entity_id, meta, occurred_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, now())",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(actor)
    .bind(action)
    .bind(entity)
    .bind(entity_id)
    .bind(meta)
    .execute(&mut **tx)
    .await?;

    tracing::info!(
        tenant_id, actor, action, entity, entity_id = %entity_id, "audit entry recorded"
    );

    Ok(id)
}
