use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ar_invoice_status", rename_all = "lowercase")]
pub enum ArInvoiceStatus {
    Draft,
    Issued,
    PartiallyPaid,
    Paid,
    Void,
}

#[derive(Debug, Clone, FromRow)]
pub struct ArInvoice {
    pub id: Uuid,
    pub tenant_id: String,
    pub number: String,
    pub customer_id: Uuid,
    pub do_id: Option<Uuid>,
    pub so_id: Option<Uuid>,
    pub currency: String,
    pub status: ArInvoiceStatus,
    pub total_amount: Decimal,
    pub due_date: NaiveDate,
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    number: &str,
    customer_id: Uuid,
    do_id: Option<Uuid>,
    so_id: Option<Uuid>,
    currency: &str,
    total_amount: Decimal,
    due_date: NaiveDate,
) -> Result<ArInvoice, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO ar_invoices (id, tenant_id, number, customer_id, do_id, so_id, currency, status, total_amount, due_date) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, 'draft', $7, $8) \
         RETURNING id, tenant_id, number, customer_id, do_id, so_id, currency, status, total_amount, due_date",
    )
    .bind(tenant_id)
    .bind(number)
    .bind(customer_id)
    .bind(do_id)
    .bind(so_id)
    .bind(currency)
    .bind(total_amount)
    .bind(due_date)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
    lines: &[(String, Decimal)],
) -> Result<(), sqlx::Error> {
    for (account_code, amount) in lines {
        sqlx::query(
            "INSERT INTO ar_invoice_lines (id, invoice_id, account_code, amount) \
             VALUES (gen_random_uuid(), $1, $2, $3)",
        )
        .bind(invoice_id)
        .bind(account_code)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn fetch(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    id: Uuid,
) -> Result<ArInvoice, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, tenant_id, number, customer_id, do_id, so_id, currency, status, total_amount, due_date \
         FROM ar_invoices WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: ArInvoiceStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ar_invoices SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn remaining_balance(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
) -> Result<Decimal, sqlx::Error> {
    let invoice: ArInvoice = sqlx::query_as(
        "SELECT id, tenant_id, number, customer_id, do_id, so_id, currency, status, total_amount, due_date \
         FROM ar_invoices WHERE id = $1",
    )
    .bind(invoice_id)
    .fetch_one(&mut **tx)
    .await?;

    let allocated: Option<Decimal> =
        sqlx::query_scalar("SELECT SUM(amount) FROM ar_payment_allocations WHERE invoice_id = $1")
            .bind(invoice_id)
            .fetch_one(&mut **tx)
            .await?;

    Ok(invoice.total_amount - allocated.unwrap_or(Decimal::ZERO))
}

#[derive(Debug, Clone, FromRow)]
pub struct AgingBucket {
    pub bucket: String,
    pub outstanding: Decimal,
}

/// One batched query, bucketing every outstanding invoice by
/// `today - due_date` in a single `GROUP BY` -- never a per-invoice round
/// trip.
pub async fn aging_report(
    pool: &sqlx::PgPool,
    tenant_id: &str,
) -> Result<Vec<AgingBucket>, sqlx::Error> {
    sqlx::query_as(
        "SELECT \
            CASE \
                WHEN due_date >= CURRENT_DATE THEN 'current' \
                WHEN CURRENT_DATE - due_date <= 30 THEN '1-30' \
                WHEN CURRENT_DATE - due_date <= 60 THEN '31-60' \
                WHEN CURRENT_DATE - due_date <= 90 THEN '61-90' \
                ELSE '90+' \
            END AS bucket, \
            SUM(i.total_amount - COALESCE(a.allocated, 0)) AS outstanding \
         FROM ar_invoices i \
         LEFT JOIN ( \
            SELECT invoice_id, SUM(amount) AS allocated \
            FROM ar_payment_allocations GROUP BY invoice_id \
         ) a ON a.invoice_id = i.id \
         WHERE i.tenant_id = $1 AND i.status IN ('issued', 'partiallypaid') \
         GROUP BY bucket",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}
