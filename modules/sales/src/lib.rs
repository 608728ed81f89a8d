pub mod repos;
pub mod services;

pub use repos::quotation_repo::{Quotation, QuotationLine, QuotationStatus};
pub use repos::sales_order_repo::{SalesOrder, SalesOrderLine, SalesOrderStatus};
pub use services::quotation_service::QuotationError;
pub use services::sales_order_service::SalesOrderError;
