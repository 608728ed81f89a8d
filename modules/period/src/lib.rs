pub mod repos;
pub mod services;

pub use repos::period_repo::{Period, PeriodError, PeriodStatus};
pub use services::period_close_service::{ClosePeriodError, PeriodCloseSnapshot};
pub use services::transition_service::{TransitionError, TransitionRequest};
