pub mod repos;
pub mod services;

pub use repos::balance_repo::InventoryBalance;
pub use services::movement_service::{InventoryError, MovementLine, MovementOutcome};
