//! clearfund-core
//!
//! Business logic for the ClearFund obligation ledger: the obligation
//! state machine, ledger append/replay, balance derivation, compliance
//! scoring, and report integrity. Depends on clearfund-domain. No CLI,
//! no terminal I/O, no direct storage interactions.

pub mod balance_service;
pub mod case_manager;
pub mod compliance_service;
pub mod error;
pub mod ledger_service;
pub mod obligation_service;
pub mod report_service;
pub mod storage;
pub mod time;

pub use balance_service::*;
pub use case_manager::*;
pub use compliance_service::*;
pub use error::CoreError;
pub use ledger_service::*;
pub use obligation_service::*;
pub use report_service::*;
pub use time::{Clock, FixedClock, SystemClock};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::from_default_env().add_directive("clearfund_core=info".parse().unwrap());
        fmt().with_env_filter(filter).init();
        tracing::info!("ClearFund core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
