use crate::repos::invoice_repo::{self, ArInvoiceStatus};
use crate::repos::payment_repo::{self, AllocationRequest, ArPayment};
use chrono::Datelike;
use core_errors::ErrorKind;
use core_store::numbering;
use ledger::repos::outbox_repo;
use rust_decimal::Decimal;
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ArPaymentError {
    #[error("payment amount must be positive")]
    NonPositiveAmount,

    #[error("allocations sum {allocated} exceeds payment amount {amount}")]
    AllocationExceedsPayment { allocated: Decimal, amount: Decimal },

    #[error("invoice {0} is not issued")]
    InvoiceNotIssued(Uuid),

    #[error("invoice {invoice_id} has remaining balance {remaining} but allocation is {allocation}")]
    AllocationExceedsBalance {
        invoice_id: Uuid,
        remaining: Decimal,
        allocation: Decimal,
    },

    #[error("invoices belong to more than one customer")]
    CustomerMismatch,

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ArPaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArPaymentError::NonPositiveAmount => ErrorKind::Validation,
            ArPaymentError::AllocationExceedsPayment { .. } => ErrorKind::AllocationExceedsPayment,
            ArPaymentError::InvoiceNotIssued(_) | ArPaymentError::CustomerMismatch => {
                ErrorKind::StateConflict
            }
            ArPaymentError::AllocationExceedsBalance { .. } => ErrorKind::AllocationExceedsBalance,
            ArPaymentError::Numbering(_) => ErrorKind::Internal,
            ArPaymentError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            ArPaymentError::Audit(_) | ArPaymentError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// Mirrors AP's `RegisterPayment`: validates every allocation against its
/// invoice's remaining balance before any row is written.
pub async fn register_payment(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    currency: &str,
    amount: Decimal,
    allocations: Vec<AllocationRequest>,
) -> Result<ArPayment, ArPaymentError> {
    security::require(caps, Capability::ArPay)?;

    if amount <= Decimal::ZERO {
        return Err(ArPaymentError::NonPositiveAmount);
    }
    let total_allocated: Decimal = allocations.iter().map(|a| a.amount).sum();
    if total_allocated > amount {
        return Err(ArPaymentError::AllocationExceedsPayment {
            allocated: total_allocated,
            amount,
        });
    }

    let mut tx = pool.begin().await?;

    let mut customer_id: Option<Uuid> = None;
    for alloc in &allocations {
        let invoice = invoice_repo::fetch(&mut tx, tenant_id, alloc.invoice_id).await?;
        if invoice.status != ArInvoiceStatus::Issued && invoice.status != ArInvoiceStatus::PartiallyPaid {
            return Err(ArPaymentError::InvoiceNotIssued(alloc.invoice_id));
        }
        match customer_id {
            None => customer_id = Some(invoice.customer_id),
            Some(existing) if existing != invoice.customer_id => {
                return Err(ArPaymentError::CustomerMismatch)
            }
            _ => {}
        }
        let remaining = invoice_repo::remaining_balance(&mut tx, alloc.invoice_id).await?;
        if alloc.amount > remaining {
            return Err(ArPaymentError::AllocationExceedsBalance {
                invoice_id: alloc.invoice_id,
                remaining,
                allocation: alloc.amount,
            });
        }
    }
    let customer_id = customer_id.ok_or(ArPaymentError::CustomerMismatch)?;

    let today = chrono::Utc::now().date_naive();
    let period_token = today.format("%Y%m").to_string();
    let seq = numbering::next_value(pool, tenant_id, "AR_PAY", &period_token).await?;
    let number = numbering::format_document_number("PAY", today.year(), today.month(), 2, 5, seq);

    let payment = payment_repo::insert_payment(&mut tx, tenant_id, &number, customer_id, currency, amount).await?;

    for alloc in &allocations {
        payment_repo::insert_allocation(&mut tx, payment.id, alloc.invoice_id, alloc.amount).await?;
        let remaining_after = invoice_repo::remaining_balance(&mut tx, alloc.invoice_id).await?;
        if remaining_after.is_zero() {
            invoice_repo::set_status(&mut tx, alloc.invoice_id, ArInvoiceStatus::Paid).await?;
        } else {
            invoice_repo::set_status(&mut tx, alloc.invoice_id, ArInvoiceStatus::PartiallyPaid).await?;
        }
    }

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "ar.payment.register",
        "ar_payment",
        payment.id,
        serde_json::json!({ "number": payment.number, "amount": amount }),
    )
    .await?;

    outbox_repo::insert_outbox_event(
        &mut tx,
        Uuid::new_v4(),
        "ArPaymentPosted",
        "ar_payment",
        payment.id,
        serde_json::json!({
            "tenant_id": tenant_id,
            "payment_id": payment.id,
            "amount": total_allocated,
            "currency": currency,
        }),
    )
    .await?;

    tx.commit().await?;
    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_amount_maps_to_validation() {
        assert_eq!(ArPaymentError::NonPositiveAmount.kind(), ErrorKind::Validation);
    }
}
