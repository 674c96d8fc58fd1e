//! clearfund-config
//!
//! Deployment configuration for the ClearFund engine: scoring weights and
//! thresholds, report numbering policy, and data-directory resolution,
//! persisted as JSON.

mod error;
mod manager;
mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::Config;
