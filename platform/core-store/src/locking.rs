//! Row-lock helpers shared by the period registry and inventory engine.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Lock a single row by primary key for the duration of the caller's
/// transaction. `table` must be a trusted, statically-known identifier
/// (never build it from user input) since it can't be bound as a parameter.
pub async fn lock_row_for_update(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("SELECT id FROM {table} WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(())
}

/// Lock an `(warehouse, product)` balance row by its natural key, used by
/// the inventory engine to serialise concurrent movements on the same bin.
pub async fn lock_balance_for_update(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    warehouse: Uuid,
    product: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "SELECT warehouse_id FROM inventory_balances \
         WHERE tenant_id = $1 AND warehouse_id = $2 AND product_id = $3 FOR UPDATE",
    )
    .bind(tenant_id)
    .bind(warehouse)
    .bind(product)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(())
}
