pub mod contracts;
pub mod repos;
pub mod services;

pub use contracts::posting_request_v1::{Dimensions, JournalLineRequest, PostingRequestV1, SourceDocType};
pub use repos::journal_repo::{JournalEntry, JournalLine, JournalStatus};
pub use services::journal_service::{JournalError, PostOutcome};
pub use services::reversal_service::{ReversalError, ReversalOutcome};
pub use services::void_service::VoidError;
