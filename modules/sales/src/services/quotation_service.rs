use crate::repos::quotation_repo::{self, Quotation, QuotationStatus};
use crate::repos::sales_order_repo;
use chrono::Datelike;
use core_errors::ErrorKind;
use core_store::numbering;
use rust_decimal::Decimal;
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QuotationError {
    #[error("quotation {0} is not in draft status")]
    NotDraft(Uuid),

    #[error("quotation {0} is not submitted")]
    NotSubmitted(Uuid),

    #[error("quotation {0} is not approved")]
    NotApproved(Uuid),

    #[error("the creator of a quotation cannot approve it")]
    SelfApproval,

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl QuotationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuotationError::NotDraft(_)
            | QuotationError::NotSubmitted(_)
            | QuotationError::NotApproved(_) => ErrorKind::StateConflict,
            QuotationError::SelfApproval => ErrorKind::AuthorisationDenied,
            QuotationError::Numbering(_) => ErrorKind::Internal,
            QuotationError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            QuotationError::Audit(_) | QuotationError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// `Create`: always lands in `DRAFT`. Line totals, and the header's
/// `total_amount`, are computed by `recompute_total` after insert.
#[allow(clippy::too_many_arguments)]
pub async fn create(
    pool: &PgPool,
    actor: &str,
    tenant_id: &str,
    customer_id: Uuid,
    currency: &str,
    lines: Vec<(Uuid, Decimal, Decimal, Decimal, Decimal)>,
) -> Result<Quotation, QuotationError> {
    let mut tx = pool.begin().await?;

    let today = chrono::Utc::now().date_naive();
    let period_token = today.format("%Y%m").to_string();
    let seq = numbering::next_value(pool, tenant_id, "QUOTE", &period_token).await?;
    let number = numbering::format_document_number("QUO", today.year(), today.month(), 2, 5, seq);

    let quotation = quotation_repo::insert_header(&mut tx, tenant_id, &number, customer_id, currency, actor).await?;
    for (product_id, qty, price, discount_pct, tax) in &lines {
        quotation_repo::insert_line(&mut tx, quotation.id, *product_id, *qty, *price, *discount_pct, *tax).await?;
    }
    quotation_repo::recompute_total(&mut tx, quotation.id).await?;
    let quotation = quotation_repo::fetch(&mut tx, tenant_id, quotation.id).await?;

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "quotation.create",
        "quotation",
        quotation.id,
        serde_json::json!({ "number": quotation.number }),
    )
    .await?;

    tx.commit().await?;
    Ok(quotation)
}

pub async fn submit(
    pool: &PgPool,
    actor: &str,
    tenant_id: &str,
    quotation_id: Uuid,
) -> Result<(), QuotationError> {
    let mut tx = pool.begin().await?;
    let q = quotation_repo::fetch(&mut tx, tenant_id, quotation_id).await?;
    if q.status != QuotationStatus::Draft {
        return Err(QuotationError::NotDraft(quotation_id));
    }
    quotation_repo::set_status(&mut tx, quotation_id, QuotationStatus::Submitted).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "quotation.submit",
        "quotation",
        quotation_id,
        serde_json::json!({ "number": q.number }),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

/// Approval is forbidden for the quotation's own creator.
pub async fn approve(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    quotation_id: Uuid,
) -> Result<(), QuotationError> {
    security::require(caps, Capability::QuotationApprove)?;

    let mut tx = pool.begin().await?;
    let q = quotation_repo::fetch(&mut tx, tenant_id, quotation_id).await?;
    if q.status != QuotationStatus::Submitted {
        return Err(QuotationError::NotSubmitted(quotation_id));
    }
    if q.created_by == actor {
        return Err(QuotationError::SelfApproval);
    }
    quotation_repo::set_status(&mut tx, quotation_id, QuotationStatus::Approved).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "quotation.approve",
        "quotation",
        quotation_id,
        serde_json::json!({ "number": q.number }),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn reject(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    quotation_id: Uuid,
) -> Result<(), QuotationError> {
    security::require(caps, Capability::QuotationApprove)?;

    let mut tx = pool.begin().await?;
    let q = quotation_repo::fetch(&mut tx, tenant_id, quotation_id).await?;
    if q.status != QuotationStatus::Submitted {
        return Err(QuotationError::NotSubmitted(quotation_id));
    }
    quotation_repo::set_status(&mut tx, quotation_id, QuotationStatus::Rejected).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "quotation.reject",
        "quotation",
        quotation_id,
        serde_json::json!({ "number": q.number }),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

/// Copies lines into a new `SalesOrder` in `DRAFT` and marks the quotation
/// `CONVERTED`. Requires the quotation be `APPROVED`.
pub async fn convert_to_sales_order(
    pool: &PgPool,
    actor: &str,
    tenant_id: &str,
    quotation_id: Uuid,
) -> Result<Uuid, QuotationError> {
    let mut tx = pool.begin().await?;
    let q = quotation_repo::fetch(&mut tx, tenant_id, quotation_id).await?;
    if q.status != QuotationStatus::Approved {
        return Err(QuotationError::NotApproved(quotation_id));
    }
    let lines = quotation_repo::fetch_lines(&mut tx, quotation_id).await?;

    let today = chrono::Utc::now().date_naive();
    let period_token = today.format("%Y%m").to_string();
    let seq = numbering::next_value(pool, tenant_id, "SO", &period_token).await?;
    let so_number = numbering::format_document_number("SO", today.year(), today.month(), 2, 5, seq);

    let so = sales_order_repo::insert_header(&mut tx, tenant_id, &so_number, q.customer_id, &q.currency).await?;
    for line in &lines {
        sales_order_repo::insert_line(
            &mut tx,
            so.id,
            line.product_id,
            line.qty,
            line.price,
            line.discount_pct,
            line.tax,
        )
        .await?;
    }
    sales_order_repo::recompute_total(&mut tx, so.id).await?;

    quotation_repo::set_status(&mut tx, quotation_id, QuotationStatus::Converted).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "quotation.convert",
        "quotation",
        quotation_id,
        serde_json::json!({ "number": q.number, "sales_order_id": so.id }),
    )
    .await?;

    tx.commit().await?;
    Ok(so.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_approval_maps_to_authorisation_denied() {
        assert_eq!(QuotationError::SelfApproval.kind(), ErrorKind::AuthorisationDenied);
    }
}
