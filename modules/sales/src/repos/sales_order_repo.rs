use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "sales_order_status", rename_all = "lowercase")]
pub enum SalesOrderStatus {
    Draft,
    Confirmed,
    Processing,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, FromRow)]
pub struct SalesOrder {
    pub id: Uuid,
    pub tenant_id: String,
    pub number: String,
    pub customer_id: Uuid,
    pub currency: String,
    pub status: SalesOrderStatus,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct SalesOrderLine {
    pub id: Uuid,
    pub so_id: Uuid,
    pub product_id: Uuid,
    pub qty: Decimal,
    pub price: Decimal,
    pub discount_pct: Decimal,
    pub tax: Decimal,
    pub quantity_delivered: Decimal,
}

impl SalesOrderLine {
    pub fn line_total(&self) -> Decimal {
        self.qty * self.price * (Decimal::ONE - self.discount_pct) + self.tax
    }

    pub fn remaining_deliverable(&self) -> Decimal {
        self.qty - self.quantity_delivered
    }
}

pub async fn insert_header(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    number: &str,
    customer_id: Uuid,
    currency: &str,
) -> Result<SalesOrder, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO sales_orders (id, tenant_id, number, customer_id, currency, status, total_amount) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, 'draft', 0) \
         RETURNING id, tenant_id, number, customer_id, currency, status, total_amount",
    )
    .bind(tenant_id)
    .bind(number)
    .bind(customer_id)
    .bind(currency)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_line(
    tx: &mut Transaction<'_, Postgres>,
    so_id: Uuid,
    product_id: Uuid,
    qty: Decimal,
    price: Decimal,
    discount_pct: Decimal,
    tax: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sales_order_lines (id, so_id, product_id, qty, price, discount_pct, tax, quantity_delivered) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, 0)",
    )
    .bind(so_id)
    .bind(product_id)
    .bind(qty)
    .bind(price)
    .bind(discount_pct)
    .bind(tax)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn fetch(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    id: Uuid,
) -> Result<SalesOrder, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, tenant_id, number, customer_id, currency, status, total_amount \
         FROM sales_orders WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn fetch_lines(
    tx: &mut Transaction<'_, Postgres>,
    so_id: Uuid,
) -> Result<Vec<SalesOrderLine>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, so_id, product_id, qty, price, discount_pct, tax, quantity_delivered \
         FROM sales_order_lines WHERE so_id = $1",
    )
    .bind(so_id)
    .fetch_all(&mut **tx)
    .await
}

pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: SalesOrderStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sales_orders SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn recompute_total(
    tx: &mut Transaction<'_, Postgres>,
    so_id: Uuid,
) -> Result<Decimal, sqlx::Error> {
    let lines = fetch_lines(tx, so_id).await?;
    let total: Decimal = lines.iter().map(|l| l.line_total()).sum();
    sqlx::query("UPDATE sales_orders SET total_amount = $1 WHERE id = $2")
        .bind(total)
        .bind(so_id)
        .execute(&mut **tx)
        .await?;
    Ok(total)
}

pub async fn add_delivered_qty(
    tx: &mut Transaction<'_, Postgres>,
    line_id: Uuid,
    qty: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sales_order_lines SET quantity_delivered = quantity_delivered + $1 WHERE id = $2")
        .bind(qty)
        .bind(line_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// `COMPLETED` when delivered equals ordered on every line, else
/// `PROCESSING`. Leaves any other status (e.g. `CANCELLED`) untouched: a
/// sales order that was cancelled after some of its lines were already
/// delivered must not be silently revived by a later delivery.
pub async fn derive_completion_status(
    tx: &mut Transaction<'_, Postgres>,
    so_id: Uuid,
) -> Result<SalesOrderStatus, sqlx::Error> {
    let current_status: SalesOrderStatus =
        sqlx::query_scalar("SELECT status FROM sales_orders WHERE id = $1")
            .bind(so_id)
            .fetch_one(&mut **tx)
            .await?;
    if current_status == SalesOrderStatus::Cancelled {
        return Ok(current_status);
    }

    let lines = fetch_lines(tx, so_id).await?;
    let all_delivered = lines.iter().all(|l| l.quantity_delivered >= l.qty);
    let status = if all_delivered {
        SalesOrderStatus::Completed
    } else {
        SalesOrderStatus::Processing
    };
    set_status(tx, so_id, status).await?;
    Ok(status)
}
