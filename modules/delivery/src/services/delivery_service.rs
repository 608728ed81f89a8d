use crate::repos::do_repo::{self, DoStatus};
use chrono::Datelike;
use core_errors::ErrorKind;
use core_store::numbering;
use inventory::services::movement_service::{self, InventoryError, MovementLine};
use rust_decimal::Decimal;
use sales::repos::sales_order_repo;
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery order {0} is not in draft status")]
    NotDraft(Uuid),

    #[error("delivery order {0} is not confirmed")]
    NotConfirmed(Uuid),

    #[error("delivery order {0} is not in transit")]
    NotInTransit(Uuid),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl DeliveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeliveryError::NotDraft(_)
            | DeliveryError::NotConfirmed(_)
            | DeliveryError::NotInTransit(_) => ErrorKind::StateConflict,
            DeliveryError::Inventory(e) => e.kind(),
            DeliveryError::Numbering(_) => ErrorKind::Internal,
            DeliveryError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            DeliveryError::Audit(_) | DeliveryError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// `CreateFromSO`: produces a DO in `DRAFT` with lines capped at each SO
/// line's remaining deliverable quantity.
pub async fn create_from_so(
    pool: &PgPool,
    tenant_id: &str,
    so_id: Uuid,
    warehouse_id: Uuid,
) -> Result<Uuid, DeliveryError> {
    let mut tx = pool.begin().await?;
    let so_lines = sales_order_repo::fetch_lines(&mut tx, so_id).await?;

    let today = chrono::Utc::now().date_naive();
    let period_token = today.format("%Y%m").to_string();
    let seq = numbering::next_value(pool, tenant_id, "DO", &period_token).await?;
    let number = numbering::format_document_number("DO", today.year(), today.month(), 2, 5, seq);

    let doc = do_repo::insert_header(&mut tx, tenant_id, &number, so_id, warehouse_id).await?;
    for line in so_lines.iter().filter(|l| l.remaining_deliverable() > Decimal::ZERO) {
        do_repo::insert_line(
            &mut tx,
            doc.id,
            line.id,
            line.product_id,
            line.remaining_deliverable(),
        )
        .await?;
    }

    tx.commit().await?;
    Ok(doc.id)
}

pub async fn confirm(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    do_id: Uuid,
) -> Result<(), DeliveryError> {
    security::require(caps, Capability::DoConfirm)?;

    let mut tx = pool.begin().await?;
    let doc = do_repo::fetch(&mut tx, tenant_id, do_id).await?;
    if doc.status != DoStatus::Draft {
        return Err(DeliveryError::NotDraft(do_id));
    }
    do_repo::set_status(&mut tx, do_id, DoStatus::Confirmed).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "do.confirm",
        "delivery_order",
        do_id,
        serde_json::json!({ "number": doc.number }),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn mark_in_transit(
    pool: &PgPool,
    actor: &str,
    tenant_id: &str,
    do_id: Uuid,
) -> Result<(), DeliveryError> {
    let mut tx = pool.begin().await?;
    let doc = do_repo::fetch(&mut tx, tenant_id, do_id).await?;
    if doc.status != DoStatus::Confirmed {
        return Err(DeliveryError::NotConfirmed(do_id));
    }
    do_repo::set_status(&mut tx, do_id, DoStatus::InTransit).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "do.mark_in_transit",
        "delivery_order",
        do_id,
        serde_json::json!({ "number": doc.number }),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

/// `MarkDelivered`: the only DO transition that writes inventory. Posts the
/// outbound movement, updates each referenced `SalesOrderLine.quantity_delivered`,
/// and re-derives the SO's completion status, all in one unit of work.
pub async fn mark_delivered(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    do_id: Uuid,
    allow_negative_stock: bool,
) -> Result<(), DeliveryError> {
    security::require(caps, Capability::DoComplete)?;

    let mut tx = pool.begin().await?;
    let doc = do_repo::fetch(&mut tx, tenant_id, do_id).await?;
    if doc.status != DoStatus::InTransit {
        return Err(DeliveryError::NotInTransit(do_id));
    }
    let lines = do_repo::fetch_lines(&mut tx, do_id).await?;

    let movement_lines: Vec<MovementLine> = lines
        .iter()
        .map(|l| MovementLine {
            warehouse_id: doc.warehouse_id,
            product_id: l.product_id,
            qty: l.qty,
            unit_cost: None,
        })
        .collect();

    movement_service::post_outbound_tx(
        &mut tx,
        caps,
        tenant_id,
        doc.warehouse_id,
        movement_lines,
        "DELIVERY.DO",
        do_id,
        allow_negative_stock,
    )
    .await?;

    for line in &lines {
        sales_order_repo::add_delivered_qty(&mut tx, line.so_line_id, line.qty).await?;
    }
    sales_order_repo::derive_completion_status(&mut tx, doc.so_id).await?;

    do_repo::set_status(&mut tx, do_id, DoStatus::Delivered).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "do.mark_delivered",
        "delivery_order",
        do_id,
        serde_json::json!({ "number": doc.number }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_in_transit_maps_to_state_conflict() {
        assert_eq!(DeliveryError::NotInTransit(Uuid::nil()).kind(), ErrorKind::StateConflict);
    }
}
