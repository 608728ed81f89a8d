use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "pr_status", rename_all = "lowercase")]
pub enum PrStatus {
    Draft,
    Submitted,
    Closed,
}

#[derive(Debug, Clone, FromRow)]
pub struct PurchaseRequest {
    pub id: Uuid,
    pub tenant_id: String,
    pub number: String,
    pub status: PrStatus,
}

#[derive(Debug, Clone, FromRow)]
pub struct PurchaseRequestLine {
    pub id: Uuid,
    pub request_id: Uuid,
    pub product_id: Uuid,
    pub qty: Decimal,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    number: &str,
) -> Result<PurchaseRequest, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO purchase_requests (id, tenant_id, number, status) \
         VALUES (gen_random_uuid(), $1, $2, 'draft') \
         RETURNING id, tenant_id, number, status",
    )
    .bind(tenant_id)
    .bind(number)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    request_id: Uuid,
    lines: &[(Uuid, Decimal)],
) -> Result<(), sqlx::Error> {
    for (product_id, qty) in lines {
        sqlx::query(
            "INSERT INTO purchase_request_lines (id, request_id, product_id, qty) \
             VALUES (gen_random_uuid(), $1, $2, $3)",
        )
        .bind(request_id)
        .bind(product_id)
        .bind(qty)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn assert_editable(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    id: Uuid,
) -> Result<PurchaseRequest, sqlx::Error> {
    let pr: PurchaseRequest = sqlx::query_as(
        "SELECT id, tenant_id, number, status FROM purchase_requests WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(pr)
}
