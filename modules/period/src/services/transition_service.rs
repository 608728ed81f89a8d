use crate::repos::period_repo::{self, Period, PeriodError, PeriodStatus};
use crate::services::period_close_service::{self, ClosePeriodError};
use audit::AuditError;
use security::{Capability, CapabilitySet};
use sqlx::{Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error(transparent)]
    Close(#[from] ClosePeriodError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("actor lacks capability {0}")]
    Unauthorised(&'static str),

    #[error("period has pending documents and cannot be soft-closed")]
    PendingDocuments,

    #[error("unsupported transition from {from:?} to {to:?}")]
    Unsupported {
        from: PeriodStatus,
        to: PeriodStatus,
    },
}

pub struct TransitionRequest {
    pub tenant_id: String,
    pub period_id: Uuid,
    pub to: PeriodStatus,
    pub actor: String,
    pub reason: String,
}

fn required_capability(from: PeriodStatus, to: PeriodStatus) -> Result<Capability, TransitionError> {
    use PeriodStatus::*;
    match (from, to) {
        (Open, SoftClosed) => Ok(Capability::PeriodClose),
        (SoftClosed, Open) => Ok(Capability::PeriodClose),
        (SoftClosed, HardClosed) => Ok(Capability::PeriodClose),
        (HardClosed, SoftClosed) => Ok(Capability::OverrideLock),
        _ => Err(TransitionError::Unsupported { from, to }),
    }
}

async fn has_pending_documents(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    period_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM pending_documents_in_period WHERE tenant_id = $1 AND period_id = $2",
    )
    .bind(tenant_id)
    .bind(period_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.0 > 0)
}

/// Transition a period, re-checking status under the row lock taken here,
/// gating on the capability the from/to pair requires, and sealing a
/// close-hash snapshot on every transition into SOFT_CLOSED or HARD_CLOSED.
pub async fn transition(
    tx: &mut Transaction<'_, Postgres>,
    caps: &CapabilitySet,
    req: TransitionRequest,
) -> Result<Period, TransitionError> {
    let period = period_repo::lock_tx(tx, req.period_id).await?;
    let cap = required_capability(period.status, req.to)?;
    if !caps.has(cap) {
        return Err(TransitionError::Unauthorised(cap.as_str()));
    }

    if period.status == PeriodStatus::Open && req.to == PeriodStatus::SoftClosed {
        if has_pending_documents(tx, &req.tenant_id, req.period_id).await? {
            return Err(TransitionError::PendingDocuments);
        }
        period_close_service::create_close_snapshot(tx, &req.tenant_id, req.period_id).await?;
    }
    if req.to == PeriodStatus::HardClosed {
        period_close_service::verify_close_hash(tx, &req.tenant_id, req.period_id).await?;
    }

    sqlx::query(
        "UPDATE periods SET status = $1, \
            closed_at = CASE WHEN $1 = 'soft_closed' THEN now() ELSE closed_at END, \
            closed_by = CASE WHEN $1 = 'soft_closed' THEN $2 ELSE closed_by END, \
            hard_closed_at = CASE WHEN $1 = 'hard_closed' THEN now() ELSE hard_closed_at END, \
            hard_closed_by = CASE WHEN $1 = 'hard_closed' THEN $2 ELSE hard_closed_by END \
         WHERE id = $3",
    )
    .bind(req.to)
    .bind(&req.actor)
    .bind(req.period_id)
    .execute(&mut **tx)
    .await
    .map_err(PeriodError::Database)?;

    audit::record(
        tx,
        &req.tenant_id,
        &req.actor,
        "period.transition",
        "period",
        req.period_id,
        serde_json::json!({
            "from": format!("{:?}", period.status),
            "to": format!("{:?}", req.to),
            "reason": req.reason,
        }),
    )
    .await?;

    period_repo::lock_tx(tx, req.period_id).await.map_err(Into::into)
}
