use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "inventory_tx_type", rename_all = "lowercase")]
pub enum InventoryTxType {
    In,
    Out,
    Transfer,
    Adjust,
}

pub async fn insert_header(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    tx_type: InventoryTxType,
    ref_module: &str,
    ref_id: Uuid,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO inventory_txs (id, tenant_id, type, ref_module, ref_id, posted_at) \
         VALUES ($1, $2, $3, $4, $5, now())",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(tx_type)
    .bind(ref_module)
    .bind(ref_id)
    .execute(&mut **tx)
    .await?;
    Ok(id)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_line(
    tx: &mut Transaction<'_, Postgres>,
    inventory_tx_id: Uuid,
    warehouse_id: Uuid,
    product_id: Uuid,
    qty: Decimal,
    unit_cost: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO inventory_tx_lines (id, inventory_tx_id, warehouse_id, product_id, qty, unit_cost) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(inventory_tx_id)
    .bind(warehouse_id)
    .bind(product_id)
    .bind(qty)
    .bind(unit_cost)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
