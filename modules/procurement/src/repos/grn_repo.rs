use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "grn_status", rename_all = "lowercase")]
pub enum GrnStatus {
    Draft,
    Posted,
    Cancelled,
}

#[derive(Debug, Clone, FromRow)]
pub struct GoodsReceipt {
    pub id: Uuid,
    pub tenant_id: String,
    pub number: String,
    pub po_id: Option<Uuid>,
    pub warehouse_id: Uuid,
    pub status: GrnStatus,
}

#[derive(Debug, Clone, FromRow)]
pub struct GoodsReceiptLine {
    pub id: Uuid,
    pub grn_id: Uuid,
    pub product_id: Uuid,
    pub qty: Decimal,
    pub unit_cost: Decimal,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    number: &str,
    po_id: Option<Uuid>,
    warehouse_id: Uuid,
) -> Result<GoodsReceipt, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO goods_receipts (id, tenant_id, number, po_id, warehouse_id, status) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, 'draft') \
         RETURNING id, tenant_id, number, po_id, warehouse_id, status",
    )
    .bind(tenant_id)
    .bind(number)
    .bind(po_id)
    .bind(warehouse_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    grn_id: Uuid,
    lines: &[(Uuid, Decimal, Decimal)],
) -> Result<(), sqlx::Error> {
    for (product_id, qty, unit_cost) in lines {
        sqlx::query(
            "INSERT INTO goods_receipt_lines (id, grn_id, product_id, qty, unit_cost) \
             VALUES (gen_random_uuid(), $1, $2, $3, $4)",
        )
        .bind(grn_id)
        .bind(product_id)
        .bind(qty)
        .bind(unit_cost)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn fetch_with_lines(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    id: Uuid,
) -> Result<(GoodsReceipt, Vec<GoodsReceiptLine>), sqlx::Error> {
    let grn: GoodsReceipt = sqlx::query_as(
        "SELECT id, tenant_id, number, po_id, warehouse_id, status \
         FROM goods_receipts WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;

    let lines = sqlx::query_as::<_, GoodsReceiptLine>(
        "SELECT id, grn_id, product_id, qty, unit_cost FROM goods_receipt_lines WHERE grn_id = $1",
    )
    .bind(id)
    .fetch_all(&mut **tx)
    .await?;

    Ok((grn, lines))
}

pub async fn mark_posted(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE goods_receipts SET status = 'posted' WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn mark_cancelled(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE goods_receipts SET status = 'cancelled' WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
