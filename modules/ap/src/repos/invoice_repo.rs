use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ap_invoice_status", rename_all = "lowercase")]
pub enum ApInvoiceStatus {
    Draft,
    Posted,
    Paid,
    Void,
}

#[derive(Debug, Clone, FromRow)]
pub struct ApInvoice {
    pub id: Uuid,
    pub tenant_id: String,
    pub number: String,
    pub supplier_id: Uuid,
    pub po_id: Option<Uuid>,
    pub grn_id: Option<Uuid>,
    pub currency: String,
    pub status: ApInvoiceStatus,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct ApInvoiceLine {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub account_code: String,
    pub amount: Decimal,
}

pub async fn find_by_grn(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    grn_id: Uuid,
) -> Result<Option<ApInvoice>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, tenant_id, number, supplier_id, po_id, grn_id, currency, status, total_amount \
         FROM ap_invoices WHERE tenant_id = $1 AND grn_id = $2",
    )
    .bind(tenant_id)
    .bind(grn_id)
    .fetch_optional(&mut **tx)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    number: &str,
    supplier_id: Uuid,
    po_id: Option<Uuid>,
    grn_id: Option<Uuid>,
    currency: &str,
    total_amount: Decimal,
) -> Result<ApInvoice, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO ap_invoices (id, tenant_id, number, supplier_id, po_id, grn_id, currency, status, total_amount) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, 'draft', $7) \
         RETURNING id, tenant_id, number, supplier_id, po_id, grn_id, currency, status, total_amount",
    )
    .bind(tenant_id)
    .bind(number)
    .bind(supplier_id)
    .bind(po_id)
    .bind(grn_id)
    .bind(currency)
    .bind(total_amount)
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
            "INSERT INTO ap_invoice_lines (id, invoice_id, account_code, amount) \
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
) -> Result<ApInvoice, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, tenant_id, number, supplier_id, po_id, grn_id, currency, status, total_amount \
         FROM ap_invoices WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: ApInvoiceStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ap_invoices SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Remaining unpaid balance: total less the sum of payment allocations
/// registered against this invoice so far.
pub async fn remaining_balance(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
) -> Result<Decimal, sqlx::Error> {
    let invoice: ApInvoice = sqlx::query_as(
        "SELECT id, tenant_id, number, supplier_id, po_id, grn_id, currency, status, total_amount \
         FROM ap_invoices WHERE id = $1",
    )
    .bind(invoice_id)
    .fetch_one(&mut **tx)
    .await?;

    let allocated: Option<Decimal> =
        sqlx::query_scalar("SELECT SUM(amount) FROM ap_payment_allocations WHERE invoice_id = $1")
            .bind(invoice_id)
            .fetch_one(&mut **tx)
            .await?;

    Ok(invoice.total_amount - allocated.unwrap_or(Decimal::ZERO))
}
