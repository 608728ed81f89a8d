//! Event payloads the dispatcher translates into ledger postings. Each
//! carries the identifiers a `Post` request needs to stay idempotent under
//! retries: `(source_module, source_id)` is derived from the event itself.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrnPosted {
    pub tenant_id: String,
    pub grn_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApInvoicePosted {
    pub tenant_id: String,
    pub invoice_id: Uuid,
    pub grn_id: Option<Uuid>,
    pub goods_amount: Decimal,
    pub tax_amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApPaymentPosted {
    pub tenant_id: String,
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryAdjustmentPosted {
    pub tenant_id: String,
    pub adjustment_id: Uuid,
    /// Positive is a gain, negative a loss.
    pub signed_amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArInvoicePosted {
    pub tenant_id: String,
    pub invoice_id: Uuid,
    pub revenue_amount: Decimal,
    pub tax_amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArPaymentPosted {
    pub tenant_id: String,
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
}
