use crate::events::{
    ApInvoicePosted, ApPaymentPosted, ArInvoicePosted, ArPaymentPosted, GrnPosted,
    InventoryAdjustmentPosted,
};
use coa::repos::{account_repo, mapping_repo};
use core_errors::ErrorKind;
use ledger::contracts::posting_request_v1::{Dimensions, JournalLineRequest, PostingRequestV1, SourceDocType};
use ledger::services::journal_service::{self, JournalError};
use rust_decimal::Decimal;
use security::CapabilitySet;
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Mapping(#[from] mapping_repo::MappingError),

    #[error(transparent)]
    Account(#[from] account_repo::AccountError),

    #[error(transparent)]
    Ledger(#[from] JournalError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Mapping(_) => ErrorKind::MappingMissing,
            DispatchError::Account(_) => ErrorKind::Validation,
            DispatchError::Ledger(e) => e.kind(),
            DispatchError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// Resolve a `(module, key)` mapping to the account's code. The mapping
/// row may point at any code a tenant's chart uses; the dispatcher never
/// hardcodes one.
async fn resolve_code(pool: &PgPool, tenant_id: &str, module: &str, key: &str) -> Result<String, DispatchError> {
    let mut tx = pool.begin().await?;
    let account_id = mapping_repo::resolve(&mut tx, tenant_id, module, key).await?;
    let account = account_repo::find_by_id_tx(&mut tx, tenant_id, account_id).await?;
    tx.commit().await?;
    Ok(account.code)
}

fn balanced_line(account_code: String, debit: Decimal, credit: Decimal) -> JournalLineRequest {
    JournalLineRequest {
        account_code,
        debit,
        credit,
        dimensions: Dimensions::default(),
    }
}

/// `GRNPosted` -> DR `grn.inventory`, CR `grn.grir`.
pub async fn handle_grn_posted(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    event: &GrnPosted,
) -> Result<(), DispatchError> {
    let inventory = resolve_code(pool, &event.tenant_id, "grn", "inventory").await?;
    let grir = resolve_code(pool, &event.tenant_id, "grn", "grir").await?;

    let req = PostingRequestV1 {
        tenant_id: event.tenant_id.clone(),
        date: chrono::Utc::now().date_naive(),
        source_module: SourceDocType::Grn,
        source_id: event.grn_id,
        memo: "GRN received".to_string(),
        currency: event.currency.clone(),
        lines: vec![
            balanced_line(inventory, event.amount, Decimal::ZERO),
            balanced_line(grir, Decimal::ZERO, event.amount),
        ],
    };
    journal_service::post(pool, caps, actor, req).await?;
    Ok(())
}

/// `APInvoicePosted` -> DR `ap.invoice.inventory` (or `grn.grir` to clear it
/// when linked to a GRN) and `ap.invoice.tax_input`, CR `ap.invoice.ap`.
pub async fn handle_ap_invoice_posted(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    event: &ApInvoicePosted,
) -> Result<(), DispatchError> {
    let goods_key = if event.grn_id.is_some() {
        resolve_code(pool, &event.tenant_id, "grn", "grir").await?
    } else {
        resolve_code(pool, &event.tenant_id, "ap.invoice", "inventory").await?
    };
    let tax_input = resolve_code(pool, &event.tenant_id, "ap.invoice", "tax_input").await?;
    let ap = resolve_code(pool, &event.tenant_id, "ap.invoice", "ap").await?;

    let total = event.goods_amount + event.tax_amount;
    let mut lines = vec![balanced_line(goods_key, event.goods_amount, Decimal::ZERO)];
    if !event.tax_amount.is_zero() {
        lines.push(balanced_line(tax_input, event.tax_amount, Decimal::ZERO));
    }
    lines.push(balanced_line(ap, Decimal::ZERO, total));

    let req = PostingRequestV1 {
        tenant_id: event.tenant_id.clone(),
        date: chrono::Utc::now().date_naive(),
        source_module: SourceDocType::ApInvoice,
        source_id: event.invoice_id,
        memo: "AP invoice posted".to_string(),
        currency: event.currency.clone(),
        lines,
    };
    journal_service::post(pool, caps, actor, req).await?;
    Ok(())
}

/// `APPaymentPosted` -> DR `ap.payment.ap`, CR `ap.payment.cash`.
pub async fn handle_ap_payment_posted(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    event: &ApPaymentPosted,
) -> Result<(), DispatchError> {
    let ap = resolve_code(pool, &event.tenant_id, "ap.payment", "ap").await?;
    let cash = resolve_code(pool, &event.tenant_id, "ap.payment", "cash").await?;

    let req = PostingRequestV1 {
        tenant_id: event.tenant_id.clone(),
        date: chrono::Utc::now().date_naive(),
        source_module: SourceDocType::ApPayment,
        source_id: event.payment_id,
        memo: "AP payment posted".to_string(),
        currency: event.currency.clone(),
        lines: vec![
            balanced_line(ap, event.amount, Decimal::ZERO),
            balanced_line(cash, Decimal::ZERO, event.amount),
        ],
    };
    journal_service::post(pool, caps, actor, req).await?;
    Ok(())
}

/// `InventoryAdjustment` (signed) -> DR/CR `inventory.adjustment.{gain|loss}`
/// against `inventory.adjustment.inventory`.
pub async fn handle_inventory_adjustment_posted(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    event: &InventoryAdjustmentPosted,
) -> Result<(), DispatchError> {
    let inventory = resolve_code(pool, &event.tenant_id, "inventory.adjustment", "inventory").await?;
    let amount = event.signed_amount.abs();
    let (gain_loss, debit, credit) = if event.signed_amount >= Decimal::ZERO {
        (
            resolve_code(pool, &event.tenant_id, "inventory.adjustment", "gain").await?,
            amount,
            Decimal::ZERO,
        )
    } else {
        (
            resolve_code(pool, &event.tenant_id, "inventory.adjustment", "loss").await?,
            Decimal::ZERO,
            amount,
        )
    };

    let lines = if event.signed_amount >= Decimal::ZERO {
        vec![
            balanced_line(inventory, debit, credit),
            balanced_line(gain_loss, Decimal::ZERO, amount),
        ]
    } else {
        vec![
            balanced_line(gain_loss, amount, Decimal::ZERO),
            balanced_line(inventory, debit, credit),
        ]
    };

    let req = PostingRequestV1 {
        tenant_id: event.tenant_id.clone(),
        date: chrono::Utc::now().date_naive(),
        source_module: SourceDocType::InventoryAdjustment,
        source_id: event.adjustment_id,
        memo: "Inventory adjustment posted".to_string(),
        currency: event.currency.clone(),
        lines,
    };
    journal_service::post(pool, caps, actor, req).await?;
    Ok(())
}

/// `ARInvoicePosted` -> DR `ar.invoice.ar`, CR `ar.invoice.revenue` and
/// `ar.invoice.tax_output` (always resolved through the mapping key, never
/// a hardcoded account code).
pub async fn handle_ar_invoice_posted(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    event: &ArInvoicePosted,
) -> Result<(), DispatchError> {
    let ar = resolve_code(pool, &event.tenant_id, "ar.invoice", "ar").await?;
    let revenue = resolve_code(pool, &event.tenant_id, "ar.invoice", "revenue").await?;
    let tax_output = resolve_code(pool, &event.tenant_id, "ar.invoice", "tax_output").await?;

    let total = event.revenue_amount + event.tax_amount;
    let mut lines = vec![balanced_line(ar, total, Decimal::ZERO)];
    lines.push(balanced_line(revenue, Decimal::ZERO, event.revenue_amount));
    if !event.tax_amount.is_zero() {
        lines.push(balanced_line(tax_output, Decimal::ZERO, event.tax_amount));
    }

    let req = PostingRequestV1 {
        tenant_id: event.tenant_id.clone(),
        date: chrono::Utc::now().date_naive(),
        source_module: SourceDocType::ArInvoice,
        source_id: event.invoice_id,
        memo: "AR invoice posted".to_string(),
        currency: event.currency.clone(),
        lines,
    };
    journal_service::post(pool, caps, actor, req).await?;
    Ok(())
}

/// `ARPaymentPosted` -> DR `ar.payment.cash`, CR `ar.payment.ar`.
pub async fn handle_ar_payment_posted(
    pool: &PgPool,
    caps: &CapabilitySet,
    actor: &str,
    event: &ArPaymentPosted,
) -> Result<(), DispatchError> {
    let cash = resolve_code(pool, &event.tenant_id, "ar.payment", "cash").await?;
    let ar = resolve_code(pool, &event.tenant_id, "ar.payment", "ar").await?;

    let req = PostingRequestV1 {
        tenant_id: event.tenant_id.clone(),
        date: chrono::Utc::now().date_naive(),
        source_module: SourceDocType::ArPayment,
        source_id: event.payment_id,
        memo: "AR payment posted".to_string(),
        currency: event.currency.clone(),
        lines: vec![
            balanced_line(cash, event.amount, Decimal::ZERO),
            balanced_line(ar, Decimal::ZERO, event.amount),
        ],
    };
    journal_service::post(pool, caps, actor, req).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_error_maps_to_mapping_missing() {
        let err = DispatchError::Mapping(mapping_repo::MappingError::Missing {
            module: "grn".into(),
            key: "inventory".into(),
        });
        assert_eq!(err.kind(), ErrorKind::MappingMissing);
    }
}
