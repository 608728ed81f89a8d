use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// `(tenant, module, key) -> account`. Resolved inside the caller's unit of
/// work; there is no fallback logic — a missing mapping is always a hard
/// error, never a silently-skipped posting line.
#[derive(Debug, Clone, FromRow)]
pub struct AccountMapping {
    pub tenant_id: String,
    pub module: String,
    pub key: String,
    pub account_id: Uuid,
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("no account mapping for module={module}, key={key}")]
    Missing { module: String, key: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub async fn resolve(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    module: &str,
    key: &str,
) -> Result<Uuid, MappingError> {
    let row = sqlx::query_as::<_, AccountMapping>(
        "SELECT tenant_id, module, key, account_id FROM account_mappings \
         WHERE tenant_id = $1 AND module = $2 AND key = $3",
    )
    .bind(tenant_id)
    .bind(module)
    .bind(key)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(|r| r.account_id).ok_or_else(|| MappingError::Missing {
        module: module.to_string(),
        key: key.to_string(),
    })
}

pub async fn upsert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    module: &str,
    key: &str,
    account_id: Uuid,
) -> Result<(), MappingError> {
    sqlx::query(
        "INSERT INTO account_mappings (tenant_id, module, key, account_id) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (tenant_id, module, key) DO UPDATE SET account_id = EXCLUDED.account_id",
    )
    .bind(tenant_id)
    .bind(module)
    .bind(key)
    .bind(account_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
