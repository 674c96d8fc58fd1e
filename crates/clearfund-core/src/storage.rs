//! Persistence abstraction for case files.

use std::path::{Path, PathBuf};

use clearfund_domain::CaseFile;
use uuid::Uuid;

use crate::CoreError;

/// Describes a persisted backup artifact for a case file.
#[derive(Debug, Clone)]
pub struct CaseBackupInfo {
    pub case: String,
    pub id: String,
    pub created_at: String,
    pub path: PathBuf,
}

/// Abstraction over persistence backends capable of storing case files
/// and backups. A case file is always saved and loaded as one unit so the
/// obligation update and its paired ledger entry land together.
pub trait CaseStorage: Send + Sync {
    fn save_case(&self, name: &str, case: &CaseFile) -> Result<(), CoreError>;
    fn load_case(&self, name: &str) -> Result<CaseFile, CoreError>;
    fn list_cases(&self) -> Result<Vec<String>, CoreError>;
    fn delete_case(&self, name: &str) -> Result<(), CoreError>;
    fn save_case_to_path(&self, case: &CaseFile, path: &Path) -> Result<(), CoreError>;
    fn load_case_from_path(&self, path: &Path) -> Result<CaseFile, CoreError>;
    fn backup_case(
        &self,
        name: &str,
        case: &CaseFile,
        note: Option<&str>,
    ) -> Result<CaseBackupInfo, CoreError>;
    fn list_backups(&self, name: &str) -> Result<Vec<CaseBackupInfo>, CoreError>;
    fn restore_backup(&self, backup: &CaseBackupInfo) -> Result<CaseFile, CoreError>;
}

/// Detects dangling references and other anomalies within a case snapshot.
pub fn case_warnings(case: &CaseFile) -> Vec<String> {
    let obligation_ids: Vec<Uuid> = case.obligations.iter().map(|ob| ob.id).collect();
    let mut warnings = Vec::new();

    for entry in &case.entries {
        if !case.is_party(entry.obligor_id) || !case.is_party(entry.obligee_id) {
            warnings.push(format!(
                "entry {} references a party outside the case",
                entry.id
            ));
        }
        if entry.obligor_id == entry.obligee_id {
            warnings.push(format!("entry {} has identical obligor and obligee", entry.id));
        }
        if let Some(obligation_id) = entry.obligation_id {
            if !obligation_ids.contains(&obligation_id) {
                warnings.push(format!(
                    "entry {} references unknown obligation {}",
                    entry.id, obligation_id
                ));
            }
        }
        if let Some(adjusted) = entry.adjusts_entry_id {
            if case.entry(adjusted).is_none() {
                warnings.push(format!(
                    "adjustment {} references unknown entry {}",
                    entry.id, adjusted
                ));
            }
        }
    }

    for ob in &case.obligations {
        let shares = ob.petitioner_share.checked_add(ob.respondent_share);
        if shares != Some(ob.total_amount) {
            warnings.push(format!(
                "obligation {} shares {} + {} do not sum to total {}",
                ob.id, ob.petitioner_share, ob.respondent_share, ob.total_amount
            ));
        }
        if ob.amount_funded > ob.total_amount {
            warnings.push(format!(
                "obligation {} funded {} beyond total {}",
                ob.id, ob.amount_funded, ob.total_amount
            ));
        }
        if ob.amount_verified > ob.amount_funded {
            warnings.push(format!(
                "obligation {} verified {} beyond funded {}",
                ob.id, ob.amount_verified, ob.amount_funded
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clearfund_domain::{Money, Obligation, PurposeCategory};

    #[test]
    fn flags_share_mismatch() {
        let petitioner = Uuid::new_v4();
        let respondent = Uuid::new_v4();
        let mut case = CaseFile::new(Uuid::new_v4(), petitioner, respondent, Utc::now());
        let mut ob = Obligation::new(
            case.case_id,
            "Braces",
            PurposeCategory::Medical,
            Money::from_major(400),
            Money::from_major(200),
            Money::from_major(150),
            petitioner,
            Utc::now(),
        );
        ob.amount_funded = Money::from_major(500);
        case.obligations.push(ob);

        let warnings = case_warnings(&case);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("do not sum"));
        assert!(warnings[1].contains("beyond total"));
    }
}
