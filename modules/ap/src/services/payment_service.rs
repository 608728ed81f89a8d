use crate::repos::invoice_repo::{self, ApInvoiceStatus};
use crate::repos::payment_repo::{self, AllocationRequest, ApPayment};
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
pub enum ApPaymentError {
    #[error("payment amount must be positive")]
    NonPositiveAmount,

    #[error("allocations sum {allocated} exceeds payment amount {amount}")]
    AllocationExceedsPayment { allocated: Decimal, amount: Decimal },

    #[error("invoice {0} is not posted")]
    InvoiceNotPosted(Uuid),

    #[error("invoice {invoice_id} has remaining balance {remaining} but allocation is {allocation}")]
    AllocationExceedsBalance {
        invoice_id: Uuid,
        remaining: Decimal,
        allocation: Decimal,
    },

    #[error("invoices belong to more than one supplier")]
    SupplierMismatch,

    #[error(transparent)]
    Numbering(#[from] numbering::NumberingError),

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Audit(#[from] audit::AuditError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApPaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApPaymentError::NonPositiveAmount => ErrorKind::Validation,
            ApPaymentError::AllocationExceedsPayment { .. } => ErrorKind::AllocationExceedsPayment,
            ApPaymentError::InvoiceNotPosted(_) | ApPaymentError::SupplierMismatch => {
                ErrorKind::StateConflict
            }
            ApPaymentError::AllocationExceedsBalance { .. } => ErrorKind::AllocationExceedsBalance,
            ApPaymentError::Numbering(_) => ErrorKind::Internal,
            ApPaymentError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            ApPaymentError::Audit(_) | ApPaymentError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// `RegisterPayment(payment, allocations)`. Every allocation is validated
/// against its invoice's remaining balance before any row is written --
/// allocation failures never leave a partially-applied payment behind.
pub async fn register_payment(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    tenant_id: &str,
    currency: &str,
    amount: Decimal,
    allocations: Vec<AllocationRequest>,
) -> Result<ApPayment, ApPaymentError> {
    security::require(caps, Capability::ApPay)?;

    if amount <= Decimal::ZERO {
        return Err(ApPaymentError::NonPositiveAmount);
    }
    let total_allocated: Decimal = allocations.iter().map(|a| a.amount).sum();
    if total_allocated > amount {
        return Err(ApPaymentError::AllocationExceedsPayment {
            allocated: total_allocated,
            amount,
        });
    }

    let mut tx = pool.begin().await?;

    let mut supplier_id: Option<Uuid> = None;
    for alloc in &allocations {
        let invoice = invoice_repo::fetch(&mut tx, tenant_id, alloc.invoice_id).await?;
        if invoice.status != ApInvoiceStatus::Posted {
            return Err(ApPaymentError::InvoiceNotPosted(alloc.invoice_id));
        }
        match supplier_id {
            None => supplier_id = Some(invoice.supplier_id),
            Some(existing) if existing != invoice.supplier_id => {
                return Err(ApPaymentError::SupplierMismatch)
            }
            _ => {}
        }
        let remaining = invoice_repo::remaining_balance(&mut tx, alloc.invoice_id).await?;
        if alloc.amount > remaining {
            return Err(ApPaymentError::AllocationExceedsBalance {
                invoice_id: alloc.invoice_id,
                remaining,
                allocation: alloc.amount,
            });
        }
    }
    let supplier_id = supplier_id.ok_or(ApPaymentError::SupplierMismatch)?;

    let today = chrono::Utc::now().date_naive();
    let period_token = today.format("%Y%m").to_string();
    let seq = numbering::next_value(pool, tenant_id, "AP_PAY", &period_token).await?;
    let number = numbering::format_document_number("PAY", today.year(), today.month(), 2, 5, seq);

    let payment = payment_repo::insert_payment(&mut tx, tenant_id, &number, supplier_id, currency, amount).await?;

    for alloc in &allocations {
        payment_repo::insert_allocation(&mut tx, payment.id, alloc.invoice_id, alloc.amount).await?;
        let remaining_after = invoice_repo::remaining_balance(&mut tx, alloc.invoice_id).await?;
        if remaining_after.is_zero() {
            invoice_repo::set_status(&mut tx, alloc.invoice_id, ApInvoiceStatus::Paid).await?;
        }
    }

    audit::record(
        &mut tx,
        tenant_id,
        actor,
        "ap.payment.register",
        "ap_payment",
        payment.id,
        serde_json::json!({ "number": payment.number, "amount": amount }),
    )
    .await?;

    outbox_repo::insert_outbox_event(
        &mut tx,
        Uuid::new_v4(),
        "APPaymentPosted",
        "ap_payment",
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
        assert_eq!(ApPaymentError::NonPositiveAmount.kind(), ErrorKind::Validation);
    }

    #[test]
    fn allocation_exceeds_balance_maps_correctly() {
        let err = ApPaymentError::AllocationExceedsBalance {
            invoice_id: Uuid::nil(),
            remaining: Decimal::ZERO,
            allocation: Decimal::ONE,
        };
        assert_eq!(err.kind(), ErrorKind::AllocationExceedsBalance);
    }
}
