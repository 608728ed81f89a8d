use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Append-only stock-card row: running qty_in/qty_out and the resulting
/// balance at `posted_at`, used by reports and by the nightly integrity job
/// to reconstruct `InventoryBalance` independently.
#[allow(clippy::too_many_arguments)]
pub async fn append(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    warehouse_id: Uuid,
    product_id: Uuid,
    qty_in: Decimal,
    qty_out: Decimal,
    unit_cost: Decimal,
    balance_qty: Decimal,
    balance_cost: Decimal,
    ref_module: &str,
    ref_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO inventory_cards \
            (id, tenant_id, warehouse_id, product_id, qty_in, qty_out, unit_cost, balance_qty, balance_cost, ref_module, ref_id, posted_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now())",
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(warehouse_id)
    .bind(product_id)
    .bind(qty_in)
    .bind(qty_out)
    .bind(unit_cost)
    .bind(balance_qty)
    .bind(balance_cost)
    .bind(ref_module)
    .bind(ref_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
