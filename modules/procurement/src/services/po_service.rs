use crate::repos::po_repo::{self, PoStatus, PurchaseOrder};
use chrono::Datelike;
use core_errors::ErrorKind;
use core_store::numbering;
use rust_decimal::Decimal;
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PoError {
    #[error("purchase order {0} is not in draft status")]
    NotDraft(Uuid),

    #[error("purchase order {0} is not awaiting approval")]
    NotPendingApproval(Uuid),

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl PoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoError::NotDraft(_) | PoError::NotPendingApproval(_) => ErrorKind::StateConflict,
            PoError::Numbering(_) => ErrorKind::Internal,
            PoError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            PoError::Audit(_) | PoError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// `Create`: always lands in `DRAFT`, editable until submitted for approval.
pub async fn create(
    pool: &PgPool,
    actor: &str,
    tenant_id: &str,
    supplier_id: Uuid,
    currency: &str,
    lines: Vec<(Uuid, Decimal, Decimal)>,
) -> Result<PurchaseOrder, PoError> {
    let mut tx = pool.begin().await?;

    let today = chrono::Utc::now().date_naive();
    let period_token = today.format("%Y%m").to_string();
    let seq = numbering::next_value(pool, tenant_id, "PO", &period_token).await?;
    let number = numbering::format_document_number("PO", today.year(), today.month(), 4, 5, seq);

    let po = po_repo::insert(&mut tx, tenant_id, &number, supplier_id, currency).await?;
    po_repo::insert_lines(&mut tx, po.id, &lines).await?;

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "po.create",
        "purchase_order",
        po.id,
        serde_json::json!({ "number": po.number }),
    )
    .await?;

    tx.commit().await?;
    Ok(po)
}

/// `DRAFT -> APPROVAL`. Only a `DRAFT` order may be submitted for approval.
pub async fn submit_for_approval(
    pool: &PgPool,
    actor: &str,
    tenant_id: &str,
    po_id: Uuid,
) -> Result<(), PoError> {
    let mut tx = pool.begin().await?;
    let po = po_repo::fetch(&mut tx, tenant_id, po_id).await?;
    if po.status != PoStatus::Draft {
        return Err(PoError::NotDraft(po_id));
    }
    po_repo::set_status(&mut tx, po_id, PoStatus::Approval).await?;

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "po.submit",
        "purchase_order",
        po_id,
        serde_json::json!({ "number": po.number }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// `APPROVAL -> APPROVED`, gated on `po.approve`. Emits no ledger effect;
/// the ledger only reacts to the downstream GRN.
pub async fn approve(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    po_id: Uuid,
) -> Result<(), PoError> {
    security::require(caps, Capability::PoApprove)?;

    let mut tx = pool.begin().await?;
    let po = po_repo::fetch(&mut tx, tenant_id, po_id).await?;
    if po.status != PoStatus::Approval {
        return Err(PoError::NotPendingApproval(po_id));
    }

    po_repo::set_status(&mut tx, po_id, PoStatus::Approved).await?;

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "po.approve",
        "purchase_order",
        po_id,
        serde_json::json!({ "number": po.number }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_pending_maps_to_state_conflict() {
        let err = PoError::NotPendingApproval(Uuid::nil());
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }
}
