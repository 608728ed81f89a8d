use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ArPayment {
    pub id: Uuid,
    pub tenant_id: String,
    pub number: String,
    pub customer_id: Uuid,
    pub currency: String,
    pub amount: Decimal,
}

pub struct AllocationRequest {
    pub invoice_id: Uuid,
    pub amount: Decimal,
}

pub async fn insert_payment(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    number: &str,
    customer_id: Uuid,
    currency: &str,
    amount: Decimal,
) -> Result<ArPayment, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO ar_payments (id, tenant_id, number, customer_id, currency, amount) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, $5) \
         RETURNING id, tenant_id, number, customer_id, currency, amount",
    )
    .bind(tenant_id)
    .bind(number)
    .bind(customer_id)
    .bind(currency)
    .bind(amount)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_allocation(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    invoice_id: Uuid,
    amount: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ar_payment_allocations (id, payment_id, invoice_id, amount) \
         VALUES (gen_random_uuid(), $1, $2, $3) \
         ON CONFLICT (payment_id, invoice_id) DO NOTHING",
    )
    .bind(payment_id)
    .bind(invoice_id)
    .bind(amount)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
