//! Facade coordinating case state, persistence, and fleet-wide audits.

use std::path::Path;

use clearfund_domain::{CaseFile, ReportVerification, CURRENT_SCHEMA_VERSION};

use crate::balance_service::BalanceService;
use crate::error::CoreError;
use crate::report_service::ReportService;
use crate::storage::{CaseBackupInfo, CaseStorage};
use crate::time::Clock;

/// One case flagged by the reconciliation sweep.
#[derive(Debug, Clone)]
pub struct ReconciliationFinding {
    pub case_name: String,
    pub error: String,
}

/// Coordinates the loaded case file with the persistence layer.
pub struct CaseManager {
    current: Option<CaseFile>,
    current_name: Option<String>,
    storage: Box<dyn CaseStorage>,
}

impl CaseManager {
    pub fn new(storage: Box<dyn CaseStorage>) -> Self {
        Self {
            current: None,
            current_name: None,
            storage,
        }
    }

    pub fn storage(&self) -> &dyn CaseStorage {
        self.storage.as_ref()
    }

    pub fn current(&self) -> Option<&CaseFile> {
        self.current.as_ref()
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    /// The loaded case, or [`CoreError::CaseNotLoaded`].
    pub fn case(&self) -> Result<&CaseFile, CoreError> {
        self.current.as_ref().ok_or(CoreError::CaseNotLoaded)
    }

    pub fn case_mut(&mut self) -> Result<&mut CaseFile, CoreError> {
        self.current.as_mut().ok_or(CoreError::CaseNotLoaded)
    }

    pub fn load(&mut self, name: &str) -> Result<(), CoreError> {
        let case = self.storage.load_case(name)?;
        ensure_schema_support(case.schema_version)?;
        self.current = Some(case);
        self.current_name = Some(name.to_string());
        Ok(())
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<(), CoreError> {
        let case = self.storage.load_case_from_path(path)?;
        ensure_schema_support(case.schema_version)?;
        self.current = Some(case);
        self.current_name = None;
        Ok(())
    }

    pub fn save(&mut self) -> Result<(), CoreError> {
        let name = self
            .current_name
            .clone()
            .ok_or_else(|| CoreError::Storage("current case is unnamed".into()))?;
        let case = self.case()?.clone();
        self.storage.save_case(&name, &case)
    }

    pub fn save_as(&mut self, name: &str) -> Result<(), CoreError> {
        let case = self.case()?.clone();
        self.storage.save_case(name, &case)?;
        self.current_name = Some(name.to_string());
        Ok(())
    }

    pub fn set_current(&mut self, case: CaseFile, name: Option<String>) {
        self.current = Some(case);
        self.current_name = name;
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.current_name = None;
    }

    pub fn backup(&self, note: Option<&str>) -> Result<CaseBackupInfo, CoreError> {
        let name = self
            .current_name
            .as_deref()
            .ok_or_else(|| CoreError::Storage("current case is unnamed".into()))?;
        let case = self.case()?;
        self.storage.backup_case(name, case, note)
    }

    pub fn list_backups(&self, name: &str) -> Result<Vec<CaseBackupInfo>, CoreError> {
        self.storage.list_backups(name)
    }

    pub fn restore_backup(&self, backup: &CaseBackupInfo) -> Result<CaseFile, CoreError> {
        self.storage.restore_backup(backup)
    }

    /// Standalone audit sweep: replays every stored case and flags any
    /// whose stored running balances diverge. Diverged cases are saved
    /// back frozen so subsequent writes are rejected until an operator
    /// steps in.
    pub fn reconcile_all(&self, clock: &dyn Clock) -> Result<Vec<ReconciliationFinding>, CoreError> {
        let mut findings = Vec::new();
        for name in self.storage.list_cases()? {
            let mut case = self.storage.load_case(&name)?;
            match BalanceService::reconcile(&mut case, clock) {
                Ok(()) => self.storage.save_case(&name, &case)?,
                Err(err @ CoreError::IntegrityDivergence { .. }) => {
                    self.storage.save_case(&name, &case)?;
                    findings.push(ReconciliationFinding {
                        case_name: name,
                        error: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(findings)
    }

    /// Court-portal verification: looks a report number up across every
    /// stored case. Unknown numbers are a valid outcome, not an error.
    pub fn verify_report_number(&self, report_number: &str) -> Result<ReportVerification, CoreError> {
        for name in self.storage.list_cases()? {
            let case = self.storage.load_case(&name)?;
            let verification = ReportService::verify(&case, report_number);
            if verification.is_valid {
                return Ok(verification);
            }
        }
        Ok(ReportVerification::not_found(report_number))
    }
}

fn ensure_schema_support(schema_version: u8) -> Result<(), CoreError> {
    if schema_version > CURRENT_SCHEMA_VERSION {
        return Err(CoreError::Storage(format!(
            "case schema v{} is newer than supported v{}",
            schema_version, CURRENT_SCHEMA_VERSION
        )));
    }
    Ok(())
}
