use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "do_status", rename_all = "lowercase")]
pub enum DoStatus {
    Draft,
    Confirmed,
    InTransit,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, FromRow)]
pub struct DeliveryOrder {
    pub id: Uuid,
    pub tenant_id: String,
    pub number: String,
    pub so_id: Uuid,
    pub warehouse_id: Uuid,
    pub status: DoStatus,
}

#[derive(Debug, Clone, FromRow)]
pub struct DeliveryOrderLine {
    pub id: Uuid,
    pub do_id: Uuid,
    pub so_line_id: Uuid,
    pub product_id: Uuid,
    pub qty: Decimal,
}

pub async fn insert_header(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    number: &str,
    so_id: Uuid,
    warehouse_id: Uuid,
) -> Result<DeliveryOrder, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO delivery_orders (id, tenant_id, number, so_id, warehouse_id, status) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, 'draft') \
         RETURNING id, tenant_id, number, so_id, warehouse_id, status",
    )
    .bind(tenant_id)
    .bind(number)
    .bind(so_id)
    .bind(warehouse_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_line(
    tx: &mut Transaction<'_, Postgres>,
    do_id: Uuid,
    so_line_id: Uuid,
    product_id: Uuid,
    qty: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO delivery_order_lines (id, do_id, so_line_id, product_id, qty) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4)",
    )
    .bind(do_id)
    .bind(so_line_id)
    .bind(product_id)
    .bind(qty)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn fetch(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    id: Uuid,
) -> Result<DeliveryOrder, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, tenant_id, number, so_id, warehouse_id, status \
         FROM delivery_orders WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn fetch_lines(
    tx: &mut Transaction<'_, Postgres>,
    do_id: Uuid,
) -> Result<Vec<DeliveryOrderLine>, sqlx::Error> {
    sqlx::query_as("SELECT id, do_id, so_line_id, product_id, qty FROM delivery_order_lines WHERE do_id = $1")
        .bind(do_id)
        .fetch_all(&mut **tx)
        .await
}

pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: DoStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE delivery_orders SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
