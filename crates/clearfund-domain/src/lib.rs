//! clearfund-domain
//!
//! Pure domain models for the ClearFund obligation ledger (CaseFile,
//! Obligation, LedgerEntry, compliance and report types).
//! No I/O, no storage. Only data types and core enums.

pub mod balance;
pub mod case;
pub mod common;
pub mod compliance;
pub mod ledger;
pub mod money;
pub mod obligation;
pub mod report;

pub use balance::*;
pub use case::*;
pub use common::*;
pub use compliance::*;
pub use ledger::*;
pub use money::*;
pub use obligation::*;
pub use report::*;
