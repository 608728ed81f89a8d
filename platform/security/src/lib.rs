//! Capability membership checks.
//!
//! The core never enumerates roles or permissions; it only asks whether the
//! caller's asserted capability set contains one symbol. Session handling,
//! JWT verification, and rate limiting live with the RBAC collaborator and
//! are out of scope here.

use core_errors::ErrorKind;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    GlPost,
    GlEdit,
    PeriodClose,
    OverrideLock,
    PoApprove,
    GrnPost,
    ApPost,
    ApPay,
    ArPost,
    ArPay,
    InvAdjust,
    SoConfirm,
    QuotationApprove,
    DoConfirm,
    DoComplete,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::GlPost => "gl.post",
            Capability::GlEdit => "gl.edit",
            Capability::PeriodClose => "period.close",
            Capability::OverrideLock => "override.lock",
            Capability::PoApprove => "po.approve",
            Capability::GrnPost => "grn.post",
            Capability::ApPost => "ap.post",
            Capability::ApPay => "ap.pay",
            Capability::ArPost => "ar.post",
            Capability::ArPay => "ar.pay",
            Capability::InvAdjust => "inv.adjust",
            Capability::SoConfirm => "so.confirm",
            Capability::QuotationApprove => "quotation.approve",
            Capability::DoConfirm => "do.confirm",
            Capability::DoComplete => "do.complete",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapabilitySet(HashSet<String>);

impl CapabilitySet {
    pub fn from_strings<I: IntoIterator<Item = String>>(caps: I) -> Self {
        Self(caps.into_iter().collect())
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.0.contains(cap.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("actor lacks capability: {0}")]
pub struct AuthorisationError(pub &'static str);

impl AuthorisationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::AuthorisationDenied
    }
}

/// Turn a missing capability into a typed error instead of returning a bool,
/// so callers propagate with `?` the same way every other guard does.
pub fn require(caps: &CapabilitySet, cap: Capability) -> Result<(), AuthorisationError> {
    if caps.has(cap) {
        Ok(())
    } else {
        tracing::warn!(capability = cap.as_str(), "capability check failed");
        Err(AuthorisationError(cap.as_str()))
    }
}
