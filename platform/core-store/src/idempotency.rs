//! Boolean-form idempotency registry (C3): "has this key been seen before".
//!
//! This backs callers that only need the yes/no form (e.g. "has this
//! payment allocation already been applied"). Ledger-level idempotency,
//! which must also return the *prior outcome*, is implemented by the
//! ledger crate's own `SourceLink` uniqueness instead of this table.

use sqlx::{Postgres, Transaction};

/// Attempt to register `key` as processed. Returns `true` the first time a
/// given key is registered, `false` on every subsequent call — the caller
/// uses this to decide whether to perform the guarded side effect.
pub async fn register(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    key: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO idempotency_keys (tenant_id, key) VALUES ($1, $2) \
         ON CONFLICT (tenant_id, key) DO NOTHING",
    )
    .bind(tenant_id)
    .bind(key)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
}
