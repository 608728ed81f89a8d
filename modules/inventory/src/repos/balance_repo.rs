use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct InventoryBalance {
    pub tenant_id: String,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub qty: Decimal,
    pub avg_cost: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Lock the `(warehouse, product)` row for the caller's transaction.
/// Returns `None` when the product has never moved in this warehouse —
/// the service treats that as a starting balance of `(0, 0)`.
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    warehouse_id: Uuid,
    product_id: Uuid,
) -> Result<Option<InventoryBalance>, sqlx::Error> {
    sqlx::query_as::<_, InventoryBalance>(
        "SELECT tenant_id, warehouse_id, product_id, qty, avg_cost, updated_at \
         FROM inventory_balances \
         WHERE tenant_id = $1 AND warehouse_id = $2 AND product_id = $3 FOR UPDATE",
    )
    .bind(tenant_id)
    .bind(warehouse_id)
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Replace the balance row with the computed post-movement `(qty, avg_cost)`.
/// The AVCO math happens in the service layer, which is the only caller
/// that knows whether the movement was inbound, outbound, or a transfer leg.
pub async fn upsert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    warehouse_id: Uuid,
    product_id: Uuid,
    qty: Decimal,
    avg_cost: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO inventory_balances (tenant_id, warehouse_id, product_id, qty, avg_cost, updated_at) \
         VALUES ($1, $2, $3, $4, $5, now()) \
         ON CONFLICT (tenant_id, warehouse_id, product_id) \
         DO UPDATE SET qty = EXCLUDED.qty, avg_cost = EXCLUDED.avg_cost, updated_at = now()",
    )
    .bind(tenant_id)
    .bind(warehouse_id)
    .bind(product_id)
    .bind(qty)
    .bind(avg_cost)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
