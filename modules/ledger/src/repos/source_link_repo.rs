//! The `(module, ref_id)` uniqueness anchor that makes `Post` exactly-once.
//! Unlike the boolean-form idempotency registry in `core-store`, this one
//! must return the *prior outcome* (the journal entry already posted for
//! this source), which `Post` needs to return a success on a retried call.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub async fn find_entry_id(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    source_module: &str,
    source_id: Uuid,
) -> Result<Option<Uuid>, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT entry_id FROM journal_source_links \
         WHERE tenant_id = $1 AND source_module = $2 AND source_id = $3",
    )
    .bind(tenant_id)
    .bind(source_module)
    .bind(source_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(|r| r.0))
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    source_module: &str,
    source_id: Uuid,
    entry_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO journal_source_links (tenant_id, source_module, source_id, entry_id) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(tenant_id)
    .bind(source_module)
    .bind(source_id)
    .bind(entry_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
