use crate::repos::invoice_repo::{self, ApInvoice, ApInvoiceStatus};
use core_errors::ErrorKind;
use chrono::Datelike;
use core_store::numbering;
use ledger::repos::outbox_repo;
use procurement::repos::{grn_repo, po_repo};
use rust_decimal::Decimal;
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApInvoiceError {
    #[error("goods receipt {0} is not posted")]
    GrnNotPosted(Uuid),

    #[error("an AP invoice already exists for goods receipt {0}")]
    AlreadyLinked(Uuid),

    #[error("purchase order {0} is not approved or closed")]
    PoNotApproved(Uuid),

    #[error("purchase order {0} belongs to a different supplier")]
    SupplierMismatch(Uuid),

    #[error("invoice {0} is not in draft status")]
    NotDraft(Uuid),

    #[error("invoice {0} is not posted")]
    NotPosted(Uuid),

    #[error("invoice {0} has a payment allocated and cannot be voided")]
    HasPayment(Uuid),

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApInvoiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApInvoiceError::GrnNotPosted(_)
            | ApInvoiceError::AlreadyLinked(_)
            | ApInvoiceError::PoNotApproved(_)
            | ApInvoiceError::SupplierMismatch(_)
            | ApInvoiceError::NotDraft(_)
            | ApInvoiceError::NotPosted(_)
            | ApInvoiceError::HasPayment(_) => ErrorKind::StateConflict,
            ApInvoiceError::Numbering(_) => ErrorKind::Internal,
            ApInvoiceError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            ApInvoiceError::Audit(_) | ApInvoiceError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// `CreateFromGRN`: GRN must be `POSTED`, and no prior AP invoice may be
/// linked to it. When the GRN carries a `po_id`, the PO must be `APPROVED`
/// or `CLOSED`, belong to the same supplier, and its currency is inherited.
pub async fn create_from_grn(
    pool: &PgPool,
    tenant_id: &str,
    grn_id: Uuid,
    supplier_id: Uuid,
    lines: Vec<(String, Decimal)>,
) -> Result<ApInvoice, ApInvoiceError> {
    let mut tx = pool.begin().await?;

    let (grn, _) = grn_repo::fetch_with_lines(&mut tx, tenant_id, grn_id).await?;
    if grn.status != grn_repo::GrnStatus::Posted {
        return Err(ApInvoiceError::GrnNotPosted(grn_id));
    }
    if invoice_repo::find_by_grn(&mut tx, tenant_id, grn_id).await?.is_some() {
        return Err(ApInvoiceError::AlreadyLinked(grn_id));
    }

    let mut currency = "USD".to_string();
    if let Some(po_id) = grn.po_id {
        let po = po_repo::fetch(&mut tx, tenant_id, po_id).await?;
        if po.status != po_repo::PoStatus::Approved && po.status != po_repo::PoStatus::Closed {
            return Err(ApInvoiceError::PoNotApproved(po_id));
        }
        if po.supplier_id != supplier_id {
            return Err(ApInvoiceError::SupplierMismatch(po_id));
        }
        currency = po.currency;
    }

    let total: Decimal = lines.iter().map(|(_, amount)| *amount).sum();
    let today = chrono::Utc::now().date_naive();
    let period_token = today.format("%Y%m").to_string();
    let seq = numbering::next_value(pool, tenant_id, "AP_INV", &period_token).await?;
    let number = numbering::format_document_number("INV", today.year(), today.month(), 2, 5, seq);

    let invoice = invoice_repo::insert(
        &mut tx,
        tenant_id,
        &number,
        supplier_id,
        grn.po_id,
        Some(grn_id),
        &currency,
        total,
    )
    .await?;
    invoice_repo::insert_lines(&mut tx, invoice.id, &lines).await?;

    tx.commit().await?;
    Ok(invoice)
}

/// `Post`: `DRAFT -> POSTED`, then emits `APInvoicePosted` on the outbox.
/// The ledger entry itself is the Integration Bus's job -- it resolves
/// `ap.invoice.*` through the account mapping rather than this module
/// carrying a hardcoded account code.
pub async fn post(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    invoice_id: Uuid,
) -> Result<ApInvoice, ApInvoiceError> {
    security::require(caps, Capability::ApPost)?;

    let mut tx = pool.begin().await?;
    let invoice = invoice_repo::fetch(&mut tx, tenant_id, invoice_id).await?;
    if invoice.status != ApInvoiceStatus::Draft {
        return Err(ApInvoiceError::NotDraft(invoice_id));
    }
    invoice_repo::set_status(&mut tx, invoice_id, ApInvoiceStatus::Posted).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "ap.invoice.post",
        "ap_invoice",
        invoice_id,
        serde_json::json!({ "number": invoice.number }),
    )
    .await?;

    outbox_repo::insert_outbox_event(
        &mut tx,
        Uuid::new_v4(),
        "APInvoicePosted",
        "ap_invoice",
        invoice_id,
        serde_json::json!({
            "tenant_id": tenant_id,
            "invoice_id": invoice_id,
            "grn_id": invoice.grn_id,
            "goods_amount": invoice.total_amount,
            "tax_amount": Decimal::ZERO,
            "currency": invoice.currency,
        }),
    )
    .await?;

    tx.commit().await?;
    Ok(invoice)
}

/// `Void`: allowed only from `POSTED` while no payment has been allocated.
pub async fn void(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    invoice_id: Uuid,
) -> Result<(), ApInvoiceError> {
    security::require(caps, Capability::ApPost)?;

    let mut tx = pool.begin().await?;
    let invoice = invoice_repo::fetch(&mut tx, tenant_id, invoice_id).await?;
    if invoice.status != ApInvoiceStatus::Posted {
        return Err(ApInvoiceError::NotPosted(invoice_id));
    }
    let remaining = invoice_repo::remaining_balance(&mut tx, invoice_id).await?;
    if remaining != invoice.total_amount {
        return Err(ApInvoiceError::HasPayment(invoice_id));
    }
    invoice_repo::set_status(&mut tx, invoice_id, ApInvoiceStatus::Void).await?;
    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "ap.invoice.void",
        "ap_invoice",
        invoice_id,
        serde_json::json!({ "number": invoice.number }),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}
