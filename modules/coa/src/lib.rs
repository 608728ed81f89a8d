pub mod repos;

pub use repos::account_repo::{Account, AccountError, AccountType, NormalBalance};
pub use repos::mapping_repo::{AccountMapping, MappingError};
