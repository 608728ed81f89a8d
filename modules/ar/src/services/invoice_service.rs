use crate::repos::invoice_repo::{self, ArInvoice, ArInvoiceStatus};
use chrono::{Datelike, NaiveDate};
use core_errors::ErrorKind;
use core_store::numbering;
use ledger::repos::outbox_repo;
use rust_decimal::Decimal;
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ArInvoiceError {
    #[error("invoice {0} is not in draft status")]
    NotDraft(Uuid),

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ArInvoiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArInvoiceError::NotDraft(_) => ErrorKind::StateConflict,
            ArInvoiceError::Numbering(_) => ErrorKind::Internal,
            ArInvoiceError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            ArInvoiceError::Audit(_) | ArInvoiceError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// `CreateFromDO` / `CreateFromSO` / manual, unified: the caller supplies
/// whichever source identifiers apply (at most one of `do_id`/`so_id` is
/// typical, but neither is required for a manual invoice).
#[allow(clippy::too_many_arguments)]
pub async fn create(
    pool: &PgPool,
    tenant_id: &str,
    customer_id: Uuid,
    do_id: Option<Uuid>,
    so_id: Option<Uuid>,
    currency: &str,
    lines: Vec<(String, Decimal)>,
    due_date: NaiveDate,
) -> Result<ArInvoice, ArInvoiceError> {
    let mut tx = pool.begin().await?;
    let total: Decimal = lines.iter().map(|(_, amount)| *amount).sum();

    let today = chrono::Utc::now().date_naive();
    let period_token = today.format("%Y%m").to_string();
    let seq = numbering::next_value(pool, tenant_id, "AR_INV", &period_token).await?;
    let number = numbering::format_document_number("INV", today.year(), today.month(), 2, 5, seq);

    let invoice = invoice_repo::insert(
        &mut tx, tenant_id, &number, customer_id, do_id, so_id, currency, total, due_date,
    )
    .await?;
    invoice_repo::insert_lines(&mut tx, invoice.id, &lines).await?;

    tx.commit().await?;
    Ok(invoice)
}

/// `Post`: `DRAFT -> ISSUED`, then emits `ARInvoicePosted` on the outbox.
/// The ledger entry itself is the Integration Bus's job -- it resolves
/// `ar.invoice.*` through the account mapping rather than this module
/// carrying a hardcoded account code.
pub async fn post(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    invoice_id: Uuid,
) -> Result<ArInvoice, ArInvoiceError> {
    security::require(caps, Capability::ArPost)?;

    let mut tx = pool.begin().await?;
    let invoice = invoice_repo::fetch(&mut tx, tenant_id, invoice_id).await?;
    if invoice.status != ArInvoiceStatus::Draft {
        return Err(ArInvoiceError::NotDraft(invoice_id));
    }
    invoice_repo::set_status(&mut tx, invoice_id, ArInvoiceStatus::Issued).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "ar.invoice.post",
        "ar_invoice",
        invoice_id,
        serde_json::json!({ "number": invoice.number }),
    )
    .await?;

    outbox_repo::insert_outbox_event(
        &mut tx,
        Uuid::new_v4(),
        "ArInvoicePosted",
        "ar_invoice",
        invoice_id,
        serde_json::json!({
            "tenant_id": tenant_id,
            "invoice_id": invoice_id,
            "revenue_amount": invoice.total_amount,
            "tax_amount": Decimal::ZERO,
            "currency": invoice.currency,
        }),
    )
    .await?;

    tx.commit().await?;
    Ok(invoice)
}
