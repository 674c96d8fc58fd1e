//! Typed error taxonomy for the ledger core.
//!
//! The calling surface renders legally meaningful messages, so nothing
//! here is a generic failure: every rejection names what went wrong and
//! on which record. The core never silently retries a financial write;
//! conflicts are returned to the caller to retry.

use clearfund_domain::{Money, ObligationStatus};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid transition: obligation {obligation} is {status}")]
    InvalidTransition {
        obligation: Uuid,
        status: ObligationStatus,
    },
    #[error("funding of {attempted} exceeds remaining balance {remaining} on obligation {obligation}")]
    Overfund {
        obligation: Uuid,
        attempted: Money,
        remaining: Money,
    },
    #[error("version conflict on obligation {obligation}: expected {expected}, found {found}")]
    ConcurrencyConflict {
        obligation: Uuid,
        expected: u64,
        found: u64,
    },
    #[error(
        "ledger divergence in case {case}: entry {entry} stores balance {stored}, replay yields {replayed}"
    )]
    IntegrityDivergence {
        case: Uuid,
        entry: Uuid,
        stored: Money,
        replayed: Money,
    },
    #[error("case {0} is frozen pending ledger reconciliation")]
    CaseFrozen(Uuid),
    #[error("report {0} has expired")]
    ReportExpired(String),
    #[error("obligation not found: {0}")]
    ObligationNotFound(Uuid),
    #[error("ledger entry not found: {0}")]
    EntryNotFound(Uuid),
    #[error("report not found: {0}")]
    ReportNotFound(String),
    #[error("case not loaded")]
    CaseNotLoaded,
    #[error("case not found: {0}")]
    CaseNotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<clearfund_domain::DateWindowError> for CoreError {
    fn from(err: clearfund_domain::DateWindowError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<clearfund_domain::ComplianceConfigError> for CoreError {
    fn from(err: clearfund_domain::ComplianceConfigError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
