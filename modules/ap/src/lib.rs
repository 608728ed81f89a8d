pub mod repos;
pub mod services;

pub use repos::invoice_repo::{ApInvoice, ApInvoiceStatus};
pub use repos::payment_repo::{AllocationRequest, ApPayment};
pub use services::invoice_service::ApInvoiceError;
pub use services::payment_service::ApPaymentError;
