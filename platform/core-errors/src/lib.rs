//! Stable error-kind taxonomy shared by every posting/costing service.
//!
//! Each domain crate keeps its own `thiserror` enum with rich, service-specific
//! variants; this crate only carries the small closed set of kinds a caller
//! (HTTP layer, integration bus consumer) needs to decide how to react,
//! without string-matching a message.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    StateConflict,
    PeriodClosed,
    PeriodLocked,
    NotBalanced,
    MappingMissing,
    SourceAlreadyLinked,
    InsufficientStock,
    AllocationExceedsBalance,
    AllocationExceedsPayment,
    AuthorisationDenied,
    Conflict,
    /// Anything not classified above: store/IO failures, unexpected state.
    Internal,
}

impl ErrorKind {
    /// Whether a caller may retry the operation as-is (no user action required).
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Conflict | ErrorKind::Internal)
    }
}

/// Implemented by every domain error enum so any layer can recover the
/// taxonomy above without depending on that crate's concrete error type.
pub trait HasErrorKind {
    fn kind(&self) -> ErrorKind;
}
