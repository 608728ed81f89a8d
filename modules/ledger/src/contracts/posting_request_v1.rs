//! Versioned request payload for `Post`, carried over the integration bus
//! and accepted directly by the ledger service. Keeping the wire shape
//! versioned (`V1` suffix) lets a later revision add fields without
//! breaking producers still emitting the old shape.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The source module/document kind a posting originates from. Kept as a
/// closed enumeration (not a free string) so the mapping lookup in the
/// integration bus can match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceDocType {
    Grn,
    ApInvoice,
    ApPayment,
    ArInvoice,
    ArPayment,
    InventoryAdjustment,
    Manual,
}

/// Analytical tags a journal line may carry. Modeled as a fixed struct of
/// optionals, not a free-form map, so validation stays static.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimensions {
    pub company: Option<String>,
    pub branch: Option<String>,
    pub warehouse: Option<String>,
    pub ic_party: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLineRequest {
    pub account_code: String,
    pub debit: Decimal,
    pub credit: Decimal,
    #[serde(default)]
    pub dimensions: Dimensions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingRequestV1 {
    pub tenant_id: String,
    pub date: NaiveDate,
    pub source_module: SourceDocType,
    pub source_id: Uuid,
    pub memo: String,
    pub currency: String,
    pub lines: Vec<JournalLineRequest>,
}

impl SourceDocType {
    pub fn as_module_str(self) -> &'static str {
        match self {
            SourceDocType::Grn => "PROCUREMENT.GRN",
            SourceDocType::ApInvoice => "AP.INVOICE",
            SourceDocType::ApPayment => "AP.PAYMENT",
            SourceDocType::ArInvoice => "AR.INVOICE",
            SourceDocType::ArPayment => "AR.PAYMENT",
            SourceDocType::InventoryAdjustment => "INVENTORY.ADJUSTMENT",
            SourceDocType::Manual => "GL.MANUAL",
        }
    }
}
