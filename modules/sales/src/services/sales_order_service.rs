use crate::repos::sales_order_repo::{self, SalesOrderStatus};
use core_errors::ErrorKind;
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SalesOrderError {
    #[error("sales order {0} is not in draft status")]
    NotDraft(Uuid),

    #[error("sales order {0} cannot be cancelled from its current status")]
    NotCancellable(Uuid),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl SalesOrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SalesOrderError::NotDraft(_) | SalesOrderError::NotCancellable(_) => {
                ErrorKind::StateConflict
            }
            SalesOrderError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            SalesOrderError::Audit(_) | SalesOrderError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// `DRAFT -> CONFIRMED`, gated on `so.confirm`.
pub async fn confirm(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    so_id: Uuid,
) -> Result<(), SalesOrderError> {
    security::require(caps, Capability::SoConfirm)?;

    let mut tx = pool.begin().await?;
    let so = sales_order_repo::fetch(&mut tx, tenant_id, so_id).await?;
    if so.status != SalesOrderStatus::Draft {
        return Err(SalesOrderError::NotDraft(so_id));
    }
    sales_order_repo::set_status(&mut tx, so_id, SalesOrderStatus::Confirmed).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "so.confirm",
        "sales_order",
        so_id,
        serde_json::json!({ "number": so.number }),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

/// Cancellation is reachable only from `DRAFT` or `CONFIRMED`.
pub async fn cancel(
    pool: &PgPool,
    actor: &str,
    tenant_id: &str,
    so_id: Uuid,
) -> Result<(), SalesOrderError> {
    let mut tx = pool.begin().await?;
    let so = sales_order_repo::fetch(&mut tx, tenant_id, so_id).await?;
    if so.status != SalesOrderStatus::Draft && so.status != SalesOrderStatus::Confirmed {
        return Err(SalesOrderError::NotCancellable(so_id));
    }
    sales_order_repo::set_status(&mut tx, so_id, SalesOrderStatus::Cancelled).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "so.cancel",
        "sales_order",
        so_id,
        serde_json::json!({ "number": so.number }),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_draft_maps_to_state_conflict() {
        assert_eq!(SalesOrderError::NotDraft(Uuid::nil()).kind(), ErrorKind::StateConflict);
    }
}
