use crate::contracts::posting_request_v1::PostingRequestV1;
use crate::repos::journal_repo::{self, JournalEntry, JournalLine, JournalLineInsert};
use crate::repos::{outbox_repo, source_link_repo};
use crate::services::validation::{self, ValidationError};
use coa::repos::account_repo::{self, AccountError};
use core_errors::ErrorKind;
use core_store::numbering;
use period::repos::period_repo::{self, PeriodError};
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl JournalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JournalError::Validation(ValidationError::NotBalanced { .. }) => ErrorKind::NotBalanced,
            JournalError::Validation(_) => ErrorKind::Validation,
            JournalError::Period(PeriodError::PeriodClosed(_)) => ErrorKind::PeriodClosed,
            JournalError::Period(PeriodError::PeriodLocked(_)) => ErrorKind::PeriodLocked,
            JournalError::Period(_) => ErrorKind::Validation,
            JournalError::Account(_) => ErrorKind::Validation,
            JournalError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            JournalError::Numbering(_) | JournalError::Database(_) | JournalError::Audit(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostOutcome {
    pub entry: JournalEntry,
    pub lines: Vec<JournalLine>,
    /// `false` when the same `(source_module, source_id)` was already
    /// posted and this call returned the prior journal unchanged.
    pub first_post: bool,
}

/// `Post(req) -> JournalEntry`. Validates structurally, resolves the period
/// and asserts it's OPEN, resolves every account, checks the source-link
/// for idempotent success, allocates the journal number, and writes
/// header/lines/source-link/audit in one unit of work.
pub async fn post(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    req: PostingRequestV1,
) -> Result<PostOutcome, JournalError> {
    security::require(caps, Capability::GlPost)?;
    validation::validate_posting_request(&req)?;

    let mut tx = pool.begin().await?;

    let source_module = req.source_module.as_module_str();
    if let Some(existing_id) =
        source_link_repo::find_entry_id(&mut tx, &req.tenant_id, source_module, req.source_id)
            .await?
    {
        let (entry, lines) =
            journal_repo::fetch_entry_with_lines(&mut tx, &req.tenant_id, existing_id).await?;
        tx.commit().await?;
        return Ok(PostOutcome {
            entry,
            lines,
            first_post: false,
        });
    }

    let period = period_repo::resolve_tx(&mut tx, &req.tenant_id, req.date).await?;
    let period = period_repo::lock_tx(&mut tx, period.id).await?;
    period_repo::assert_open(&period)?;

    let mut line_inserts = Vec::with_capacity(req.lines.len());
    for line in &req.lines {
        let account =
            account_repo::find_active_by_code_tx(&mut tx, &req.tenant_id, &line.account_code)
                .await?;
        line_inserts.push(JournalLineInsert {
            account_id: account.id,
            debit: line.debit,
            credit: line.credit,
            dimensions: serde_json::to_value(&line.dimensions).unwrap_or(serde_json::Value::Null),
        });
    }

    let number = numbering::next_value(pool, &req.tenant_id, "JE", &period.code).await?;

    let entry = journal_repo::insert_entry(
        &mut tx,
        &req.tenant_id,
        number,
        period.id,
        req.date,
        source_module,
        req.source_id,
        &req.memo,
        &req.currency,
        None,
    )
    .await?;

    journal_repo::bulk_insert_lines(&mut tx, entry.id, &line_inserts).await?;
    source_link_repo::insert(&mut tx, &req.tenant_id, source_module, req.source_id, entry.id)
        .await?;

    outbox_repo::insert_outbox_event(
        &mut tx,
        Uuid::new_v4(),
        "ledger.events.entry.posted",
        "journal_entry",
        entry.id,
        serde_json::json!({
            "tenant_id": req.tenant_id,
            "entry_id": entry.id,
            "number": entry.number,
            "source_module": source_module,
            "source_id": req.source_id,
        }),
    )
    .await?;

    audit::record(
        &mut tx,
        &req.tenant_id,
        actor,
        "gl.post",
        "journal_entry",
        entry.id,
        serde_json::json!({ "number": entry.number, "source_module": source_module }),
    )
    .await?;

    let (entry, lines) =
        journal_repo::fetch_entry_with_lines(&mut tx, &req.tenant_id, entry.id).await?;

    tx.commit().await?;

    Ok(PostOutcome {
        entry,
        lines,
        first_post: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_balanced_maps_to_not_balanced_kind() {
        let err = JournalError::Validation(ValidationError::NotBalanced {
            debits: Default::default(),
            credits: Default::default(),
        });
        assert_eq!(err.kind(), ErrorKind::NotBalanced);
    }

    #[test]
    fn period_closed_maps_to_period_closed_kind() {
        let err = JournalError::Period(PeriodError::PeriodClosed("2025-03".into()));
        assert_eq!(err.kind(), ErrorKind::PeriodClosed);
    }
}
