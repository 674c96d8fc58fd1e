//! Filesystem-backed JSON persistence for case files and their backups.
//!
//! A case file is written as one JSON document via a tmp-file rename, so
//! an obligation update and its paired ledger entry are never persisted
//! separately.

use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use clearfund_core::{
    storage::{CaseBackupInfo, CaseStorage},
    CoreError,
};
use clearfund_domain::CaseFile;

const CASE_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Filesystem-backed JSON persistence for case files.
#[derive(Clone)]
pub struct JsonCaseStorage {
    cases_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonCaseStorage {
    pub fn new(cases_dir: PathBuf, backups_dir: PathBuf) -> Result<Self, CoreError> {
        Self::with_retention(cases_dir, backups_dir, DEFAULT_RETENTION)
    }

    pub fn with_retention(
        cases_dir: PathBuf,
        backups_dir: PathBuf,
        retention: usize,
    ) -> Result<Self, CoreError> {
        fs::create_dir_all(&cases_dir)?;
        fs::create_dir_all(&backups_dir)?;
        Ok(Self {
            cases_dir,
            backups_dir,
            retention: retention.max(1),
        })
    }

    pub fn case_path(&self, name: &str) -> PathBuf {
        self.cases_dir
            .join(format!("{}.{}", canonical_name(name), CASE_EXTENSION))
    }

    /// Summarizes every stored case without keeping them in memory.
    pub fn list_case_metadata(&self) -> Result<Vec<CaseMetadata>, CoreError> {
        let mut rows = Vec::new();
        for slug in self.list_cases()? {
            let case = self.load_case(&slug)?;
            rows.push(CaseMetadata {
                slug: slug.clone(),
                path: self.case_path(&slug),
                case_id: case.case_id.to_string(),
                created_at: case.created_at,
                updated_at: case.updated_at,
                obligation_count: case.obligations.len(),
                entry_count: case.entries.len(),
                report_count: case.reports.len(),
                writes_frozen: case.writes_frozen,
            });
        }
        rows.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(rows)
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    fn write_backup_file(
        &self,
        case: &CaseFile,
        name: &str,
        note: Option<&str>,
    ) -> Result<CaseBackupInfo, CoreError> {
        let dir = self.backup_dir(name);
        fs::create_dir_all(&dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut stem = format!("{}_{}", canonical_name(name), timestamp);
        if let Some(label) = sanitize_backup_note(note) {
            stem.push('_');
            stem.push_str(&label);
        }
        let file_name = format!("{}.{}", stem, CASE_EXTENSION);
        let path = dir.join(&file_name);
        write_atomic(&path, &serialize_case(case)?)?;
        self.prune_backups(name)?;
        Ok(CaseBackupInfo {
            case: canonical_name(name),
            id: file_name,
            created_at: timestamp,
            path,
        })
    }

    fn prune_backups(&self, name: &str) -> Result<(), CoreError> {
        let mut entries = self.list_backups(name)?;
        entries.sort_by_key(|info| Reverse(parse_backup_timestamp(&info.id)));
        for entry in entries.into_iter().skip(self.retention) {
            let _ = fs::remove_file(entry.path);
        }
        Ok(())
    }
}

impl CaseStorage for JsonCaseStorage {
    fn save_case(&self, name: &str, case: &CaseFile) -> Result<(), CoreError> {
        let path = self.case_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(&path);
        write_atomic(&tmp, &serialize_case(case)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load_case(&self, name: &str) -> Result<CaseFile, CoreError> {
        let path = self.case_path(name);
        if !path.exists() {
            return Err(CoreError::CaseNotFound(name.to_string()));
        }
        load_case_from_path(&path)
    }

    fn list_cases(&self) -> Result<Vec<String>, CoreError> {
        if !self.cases_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.cases_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(CASE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete_case(&self, name: &str) -> Result<(), CoreError> {
        let path = self.case_path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn save_case_to_path(&self, case: &CaseFile, path: &Path) -> Result<(), CoreError> {
        save_case_to_path(case, path)
    }

    fn load_case_from_path(&self, path: &Path) -> Result<CaseFile, CoreError> {
        load_case_from_path(path)
    }

    fn backup_case(
        &self,
        name: &str,
        case: &CaseFile,
        note: Option<&str>,
    ) -> Result<CaseBackupInfo, CoreError> {
        self.write_backup_file(case, name, note)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<CaseBackupInfo>, CoreError> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let slug = canonical_name(name);
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(CASE_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(CaseBackupInfo {
                    case: slug.clone(),
                    id: file_name.to_string(),
                    created_at: file_name.to_string(),
                    path: path.clone(),
                });
            }
        }
        entries.sort_by_key(|info| Reverse(parse_backup_timestamp(&info.id)));
        Ok(entries)
    }

    fn restore_backup(&self, backup: &CaseBackupInfo) -> Result<CaseFile, CoreError> {
        if !backup.path.exists() {
            return Err(CoreError::Storage(format!(
                "backup `{}` not found",
                backup.id
            )));
        }
        let target = self.case_path(&backup.case);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&backup.path, &target)?;
        load_case_from_path(&target)
    }
}

/// Saves a case file to an arbitrary path on disk.
pub fn save_case_to_path(case: &CaseFile, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    write_atomic(&tmp, &serialize_case(case)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Loads a case file from the provided filesystem path.
pub fn load_case_from_path(path: &Path) -> Result<CaseFile, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

/// Row describing one stored case.
#[derive(Debug, Clone)]
pub struct CaseMetadata {
    pub slug: String,
    pub path: PathBuf,
    pub case_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub obligation_count: usize,
    pub entry_count: usize,
    pub report_count: usize,
    pub writes_frozen: bool,
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "case".into()
    } else {
        sanitized
    }
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let trimmed = name.strip_suffix(&format!(".{}", CASE_EXTENSION))?;
    let mut segments = trimmed.split('_').collect::<Vec<_>>();
    if segments.len() < 2 {
        return None;
    }
    let time = segments.pop()?;
    let date = segments.pop()?;
    if !is_digits(date, 8) || !is_digits(time, 6) {
        return None;
    }
    let raw = format!("{}{}", date, time);
    NaiveDateTime::parse_from_str(&raw, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

fn serialize_case(case: &CaseFile) -> Result<String, CoreError> {
    serde_json::to_string_pretty(case).map_err(|err| CoreError::Serde(err.to_string()))
}
