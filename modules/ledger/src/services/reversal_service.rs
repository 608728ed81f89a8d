use crate::repos::journal_repo::{self, JournalEntry, JournalLineInsert};
use crate::repos::{outbox_repo, source_link_repo};
use core_errors::ErrorKind;
use core_store::numbering;
use period::repos::period_repo::{self, PeriodError};
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReversalError {
    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ReversalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReversalError::Period(PeriodError::PeriodLocked(_)) => ErrorKind::PeriodLocked,
            ReversalError::Period(_) => ErrorKind::Validation,
            ReversalError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            ReversalError::Numbering(_) | ReversalError::Audit(_) | ReversalError::Database(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReversalOutcome {
    pub entry: JournalEntry,
}

/// `Reverse(entry_id)`. Unlike a naive implementation that always dates the
/// reversal "today", this resolves the reversal's period deliberately:
/// if the original entry's period is still OPEN the reversal posts today
/// (inside that same period); otherwise it's parked in the earliest
/// subsequent OPEN period, per the period-gate contract. Reversing a
/// reversal is allowed — there is no "already reversed" guard — so that
/// `Reverse(Reverse(JE))` produces two journals summing to zero per
/// account, as required.
pub async fn reverse(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    entry_id: Uuid,
    reason: &str,
) -> Result<ReversalOutcome, ReversalError> {
    security::require(caps, Capability::GlPost)?;

    let mut tx = pool.begin().await?;

    let (original, lines) = journal_repo::fetch_entry_with_lines(&mut tx, tenant_id, entry_id).await?;
    let original_period = period_repo::lock_tx(&mut tx, original.period_id).await?;
    period_repo::assert_reversible(&original_period)?;

    let (reversal_date, reversal_period) = if original_period.status == period::repos::period_repo::PeriodStatus::Open {
        let today = chrono::Utc::now().date_naive();
        (today, original_period.clone())
    } else {
        let target = period_repo::earliest_open_after(&mut tx, tenant_id, original_period.end_date).await?;
        (target.start_date, target)
    };
    let reversal_period = period_repo::lock_tx(&mut tx, reversal_period.id).await?;
    period_repo::assert_open(&reversal_period)?;

    let number = numbering::next_value(pool, tenant_id, "JE", &reversal_period.code).await?;

    let reversal_source_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("reversal:{entry_id}").as_bytes());

    let reversal_entry = journal_repo::insert_entry(
        &mut tx,
        tenant_id,
        number,
        reversal_period.id,
        reversal_date,
        "GL.REVERSAL",
        reversal_source_id,
        &format!("Reversal of #{}: {reason}", original.number),
        &original.currency,
        Some(entry_id),
    )
    .await?;

    let reversal_lines: Vec<JournalLineInsert> = lines
        .iter()
        .map(|l| JournalLineInsert {
            account_id: l.account_id,
            debit: l.credit,
            credit: l.debit,
            dimensions: l.dimensions.clone(),
        })
        .collect();

    journal_repo::bulk_insert_lines(&mut tx, reversal_entry.id, &reversal_lines).await?;
    source_link_repo::insert(&mut tx, tenant_id, "GL.REVERSAL", reversal_source_id, reversal_entry.id)
        .await?;

    outbox_repo::insert_outbox_event(
        &mut tx,
        Uuid::new_v4(),
        "ledger.events.entry.reversed",
        "journal_entry",
        reversal_entry.id,
        serde_json::json!({
            "tenant_id": tenant_id,
            "reverses_entry_id": entry_id,
            "reversal_entry_id": reversal_entry.id,
            "number": reversal_entry.number,
        }),
    )
    .await?;

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "gl.reverse",
        "journal_entry",
        reversal_entry.id,
        serde_json::json!({ "reverses_entry_id": entry_id, "reason": reason }),
    )
    .await?;

    let (reversal_entry, _) =
        journal_repo::fetch_entry_with_lines(&mut tx, tenant_id, reversal_entry.id).await?;
    tx.commit().await?;

    Ok(ReversalOutcome {
        entry: reversal_entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversal_source_id_is_deterministic_per_original_entry() {
        let entry_id = Uuid::new_v4();
        let a = Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("reversal:{entry_id}").as_bytes());
        let b = Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("reversal:{entry_id}").as_bytes());
        assert_eq!(a, b, "reversing the same entry twice must hit the same source link");
    }
}
