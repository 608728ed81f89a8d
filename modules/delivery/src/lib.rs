pub mod repos;
pub mod services;

pub use repos::do_repo::{DeliveryOrder, DeliveryOrderLine, DoStatus};
pub use services::delivery_service::DeliveryError;
