pub mod quotation_service;
pub mod sales_order_service;
