use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "po_status", rename_all = "lowercase")]
pub enum PoStatus {
    Draft,
    Approval,
    Approved,
    Closed,
    Cancelled,
}

#[derive(Debug, Clone, FromRow)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub tenant_id: String,
    pub number: String,
    pub supplier_id: Uuid,
    pub currency: String,
    pub status: PoStatus,
}

#[derive(Debug, Clone, FromRow)]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub po_id: Uuid,
    pub product_id: Uuid,
    pub qty: Decimal,
    pub unit_price: Decimal,
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    number: &str,
    supplier_id: Uuid,
    currency: &str,
) -> Result<PurchaseOrder, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO purchase_orders (id, tenant_id, number, supplier_id, currency, status) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, 'draft') \
         RETURNING id, tenant_id, number, supplier_id, currency, status",
    )
    .bind(tenant_id)
    .bind(number)
    .bind(supplier_id)
    .bind(currency)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    po_id: Uuid,
    lines: &[(Uuid, Decimal, Decimal)],
) -> Result<(), sqlx::Error> {
    for (product_id, qty, unit_price) in lines {
        sqlx::query(
            "INSERT INTO purchase_order_lines (id, po_id, product_id, qty, unit_price) \
             VALUES (gen_random_uuid(), $1, $2, $3, $4)",
        )
        .bind(po_id)
        .bind(product_id)
        .bind(qty)
        .bind(unit_price)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn fetch(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    id: Uuid,
) -> Result<PurchaseOrder, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, tenant_id, number, supplier_id, currency, status \
         FROM purchase_orders WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: PoStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE purchase_orders SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
