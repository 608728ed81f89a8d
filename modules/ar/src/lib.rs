pub mod repos;
pub mod services;

pub use repos::invoice_repo::{AgingBucket, ArInvoice, ArInvoiceStatus};
pub use repos::payment_repo::{AllocationRequest, ArPayment};
pub use services::invoice_service::ArInvoiceError;
pub use services::payment_service::ArPaymentError;
