use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "quotation_status", rename_all = "lowercase")]
pub enum QuotationStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Converted,
}

#[derive(Debug, Clone, FromRow)]
pub struct Quotation {
    pub id: Uuid,
    pub tenant_id: String,
    pub number: String,
    pub customer_id: Uuid,
    pub currency: String,
    pub status: QuotationStatus,
    pub created_by: String,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuotationLine {
    pub id: Uuid,
    pub quotation_id: Uuid,
    pub product_id: Uuid,
    pub qty: Decimal,
    pub price: Decimal,
    pub discount_pct: Decimal,
    pub tax: Decimal,
}

impl QuotationLine {
    /// `qty * price * (1 - disc%) + tax`.
    pub fn line_total(&self) -> Decimal {
        self.qty * self.price * (Decimal::ONE - self.discount_pct) + self.tax
    }
}

pub async fn insert_header(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    number: &str,
    customer_id: Uuid,
    currency: &str,
    created_by: &str,
) -> Result<Quotation, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO quotations (id, tenant_id, number, customer_id, currency, status, created_by, total_amount) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, 'draft', $5, 0) \
         RETURNING id, tenant_id, number, customer_id, currency, status, created_by, total_amount",
    )
    .bind(tenant_id)
    .bind(number)
    .bind(customer_id)
    .bind(currency)
    .bind(created_by)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_line(
    tx: &mut Transaction<'_, Postgres>,
    quotation_id: Uuid,
    product_id: Uuid,
    qty: Decimal,
    price: Decimal,
    discount_pct: Decimal,
    tax: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO quotation_lines (id, quotation_id, product_id, qty, price, discount_pct, tax) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6)",
    )
    .bind(quotation_id)
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
) -> Result<Quotation, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, tenant_id, number, customer_id, currency, status, created_by, total_amount \
         FROM quotations WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn fetch_lines(
    tx: &mut Transaction<'_, Postgres>,
    quotation_id: Uuid,
) -> Result<Vec<QuotationLine>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, quotation_id, product_id, qty, price, discount_pct, tax \
         FROM quotation_lines WHERE quotation_id = $1",
    )
    .bind(quotation_id)
    .fetch_all(&mut **tx)
    .await
}

pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: QuotationStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quotations SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Recomputes and persists `total_amount` as the sum of current line
/// totals. Called after every line insert/update/delete.
pub async fn recompute_total(
    tx: &mut Transaction<'_, Postgres>,
    quotation_id: Uuid,
) -> Result<Decimal, sqlx::Error> {
    let lines = fetch_lines(tx, quotation_id).await?;
    let total: Decimal = lines.iter().map(|l| l.line_total()).sum();
    sqlx::query("UPDATE quotations SET total_amount = $1 WHERE id = $2")
        .bind(total)
        .bind(quotation_id)
        .execute(&mut **tx)
        .await?;
    Ok(total)
}
