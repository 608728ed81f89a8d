use crate::repos::pr_repo::{self, PrStatus, PurchaseRequest};
use chrono::Datelike;
use core_errors::ErrorKind;
use core_store::numbering;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("purchase request {0} is not editable in its current status")]
    NotEditable(Uuid),

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl PrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrError::NotEditable(_) => ErrorKind::StateConflict,
            PrError::Numbering(_) => ErrorKind::Internal,
            PrError::Audit(_) | PrError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// `Create`: always lands in `DRAFT`, editable until `submit`.
pub async fn create(
    pool: &PgPool,
    actor: &str,
    tenant_id: &str,
    lines: Vec<(Uuid, Decimal)>,
) -> Result<PurchaseRequest, PrError> {
    let mut tx = pool.begin().await?;

    let today = chrono::Utc::now().date_naive();
    let period_token = today.format("%Y%m").to_string();
    let seq = numbering::next_value(pool, tenant_id, "PR", &period_token).await?;
    let number = numbering::format_document_number("PR", today.year(), today.month(), 4, 5, seq);

    let pr = pr_repo::insert(&mut tx, tenant_id, &number).await?;
    pr_repo::insert_lines(&mut tx, pr.id, &lines).await?;

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "pr.create",
        "purchase_request",
        pr.id,
        serde_json::json!({ "number": pr.number }),
    )
    .await?;

    tx.commit().await?;
    Ok(pr)
}

/// `DRAFT -> SUBMITTED`. Only a `DRAFT` request can be submitted.
pub async fn submit(
    pool: &PgPool,
    actor: &str,
    tenant_id: &str,
    pr_id: Uuid,
) -> Result<(), PrError> {
    let mut tx = pool.begin().await?;
    let pr = pr_repo::assert_editable(&mut tx, tenant_id, pr_id).await?;
    if pr.status != PrStatus::Draft {
        return Err(PrError::NotEditable(pr_id));
    }

    sqlx::query("UPDATE purchase_requests SET status = 'submitted' WHERE id = $1")
        .bind(pr_id)
        .execute(&mut *tx)
        .await?;

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "pr.submit",
        "purchase_request",
        pr_id,
        serde_json::json!({ "number": pr.number }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_editable_maps_to_state_conflict() {
        let err = PrError::NotEditable(Uuid::nil());
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }
}
