pub mod repos;
pub mod services;

pub use repos::grn_repo::{GoodsReceipt, GrnStatus};
pub use repos::po_repo::{PoStatus, PurchaseOrder};
pub use repos::pr_repo::{PrStatus, PurchaseRequest};
pub use services::grn_service::{GrnError, GrnPostOutcome};
pub use services::po_service::PoError;
pub use services::pr_service::PrError;
