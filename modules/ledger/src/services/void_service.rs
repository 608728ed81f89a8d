use crate::repos::journal_repo::{self, JournalEntry, JournalStatus};
use core_errors::ErrorKind;
use period::repos::period_repo::{self, PeriodError};
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum VoidError {
    #[error("journal entry {0} is already void")]
    AlreadyVoid(Uuid),

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl VoidError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VoidError::AlreadyVoid(_) => ErrorKind::StateConflict,
            VoidError::Period(PeriodError::PeriodLocked(_)) => ErrorKind::PeriodLocked,
            VoidError::Period(_) => ErrorKind::Validation,
            VoidError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            VoidError::Audit(_) | VoidError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// Permitted while the entry's period is OPEN or SOFT_CLOSED. The
/// source-link row is left in place on purpose: a retried `Post` with the
/// same `source_id` still conflicts until the caller registers a new one.
pub async fn void_entry(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    entry_id: Uuid,
    reason: &str,
) -> Result<JournalEntry, VoidError> {
    security::require(caps, Capability::GlPost)?;

    let mut tx = pool.begin().await?;
    let (entry, _) = journal_repo::fetch_entry_with_lines(&mut tx, tenant_id, entry_id).await?;
    if entry.status == JournalStatus::Void {
        return Err(VoidError::AlreadyVoid(entry_id));
    }

    let period = period_repo::lock_tx(&mut tx, entry.period_id).await?;
    period_repo::assert_reversible(&period)?;

    journal_repo::mark_void(&mut tx, entry_id).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "gl.void",
        "journal_entry",
        entry_id,
        serde_json::json!({ "reason": reason, "number": entry.number }),
    )
    .await?;

    let (entry, _) = journal_repo::fetch_entry_with_lines(&mut tx, tenant_id, entry_id).await?;
    tx.commit().await?;
    Ok(entry)
}
