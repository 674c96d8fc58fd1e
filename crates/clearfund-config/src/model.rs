use std::path::PathBuf;

use clearfund_domain::{ComplianceConfig, ReportPolicy};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Deployment-level settings for the ledger engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default)]
    pub report: ReportPolicy,
    /// Retained JSON backups per case.
    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for case files. Defaults to
    /// `~/Documents/ClearFund/cases`.
    pub case_root: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for backups. Defaults to
    /// `~/Documents/ClearFund/backups`.
    pub backup_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compliance: ComplianceConfig::default(),
            report: ReportPolicy::default(),
            backup_retention: Self::default_backup_retention(),
            case_root: None,
            backup_root: None,
        }
    }
}

impl Config {
    pub fn default_backup_retention() -> usize {
        5
    }

    /// Checks the loaded configuration before it reaches the scorer or
    /// report service.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compliance
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if self.report.number_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "report number prefix must not be empty".into(),
            ));
        }
        if let Some(days) = self.report.expiry_days {
            if days < 1 {
                return Err(ConfigError::Invalid(format!(
                    "report expiry of {days} days is not usable"
                )));
            }
        }
        if self.backup_retention == 0 {
            return Err(ConfigError::Invalid("backup retention must be at least 1".into()));
        }
        Ok(())
    }

    pub fn resolve_case_root(&self) -> PathBuf {
        if let Some(path) = &self.case_root {
            return path.clone();
        }
        default_base().join("cases")
    }

    pub fn resolve_backup_root(&self) -> PathBuf {
        if let Some(path) = &self.backup_root {
            return path.clone();
        }
        default_base().join("backups")
    }
}

fn default_base() -> PathBuf {
    let base = dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("ClearFund")
}
