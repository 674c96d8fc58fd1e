//! Report generation, verification, and download accounting.
//!
//! A report is assembled read-only from the case, canonicalized, hashed,
//! and persisted as an immutable record. The hash payload excludes
//! `generated_at`, `generated_by`, and `report_number`, so identical
//! requests over identical data reproduce the same `content_hash`;
//! everything inside the payload serializes with sorted keys and fixed
//! date formatting.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clearfund_domain::{
    CaseFile, ComplianceConfig, ComplianceInputs, DateWindow, Obligation, PageRequest, PageSlice,
    Report, ReportPolicy, ReportSection, ReportType, ReportVerification,
};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::balance_service::BalanceService;
use crate::compliance_service::ComplianceService;
use crate::error::CoreError;
use crate::ledger_service::ensure_unfrozen;
use crate::time::Clock;

const NUMBER_ALLOC_ATTEMPTS: usize = 16;
const NUMBER_SUFFIX_LEN: usize = 6;

/// Caller-supplied fields for a report generation request.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub title: Option<String>,
    pub date_range_start: NaiveDate,
    pub date_range_end: NaiveDate,
    pub sections: Vec<ReportSection>,
    pub generated_by: Uuid,
    pub purpose: Option<String>,
}

/// A freshly generated report plus the canonical content it was hashed
/// over, for the rendering layer to consume.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub report: Report,
    pub content: String,
}

/// Stateless report operations over a [`CaseFile`].
pub struct ReportService;

impl ReportService {
    /// Generates and persists an immutable report record.
    ///
    /// Assembly is read-only against the case; nothing is persisted until
    /// the whole record (hash included) exists, so a failure never leaves
    /// a partial report behind.
    pub fn generate(
        case: &mut CaseFile,
        request: ReportRequest,
        inputs: &ComplianceInputs,
        config: &ComplianceConfig,
        policy: &ReportPolicy,
        clock: &dyn Clock,
    ) -> Result<ReportArtifact, CoreError> {
        ensure_unfrozen(case)?;
        let window = DateWindow::new(request.date_range_start, request.date_range_end)?;
        Self::validate_sections(&request.sections)?;

        let generated_at = clock.now();
        let payload = Self::canonical_payload(case, &request, inputs, config, window, generated_at)?;
        let content =
            serde_json::to_string(&payload).map_err(|err| CoreError::Serde(err.to_string()))?;
        let content_hash = hex_digest(content.as_bytes());
        let page_count = Self::estimate_pages(case, &request.sections, window, policy);
        let report_number = Self::allocate_number(case, policy, clock)?;

        let report = Report {
            id: Uuid::new_v4(),
            case_id: case.case_id,
            generated_by: request.generated_by,
            report_number,
            report_type: request.report_type,
            title: request
                .title
                .unwrap_or_else(|| request.report_type.to_string()),
            date_range_start: window.start,
            date_range_end: window.end,
            sections_included: request.sections,
            page_count,
            content_hash,
            download_count: 0,
            purpose: request.purpose,
            generated_at,
            expires_at: policy
                .expiry_days
                .map(|days| generated_at + Duration::days(days)),
        };
        case.reports.push(report.clone());
        case.updated_at = generated_at;
        info!(
            report_number = %report.report_number,
            case = %case.case_id,
            sections = report.sections_included.len(),
            "report generated"
        );
        Ok(ReportArtifact { report, content })
    }

    /// Looks up a report by number. Unknown numbers return
    /// `is_valid = false`; this never fails.
    ///
    /// Document-level tamper detection stays with the consumer: hash the
    /// delivered file and compare against `content_hash`.
    pub fn verify(case: &CaseFile, report_number: &str) -> ReportVerification {
        match case.report_by_number(report_number) {
            Some(report) => ReportVerification::found(report),
            None => ReportVerification::not_found(report_number),
        }
    }

    /// Records a download. The counter is the only mutable field on a
    /// report; content is never regenerated.
    pub fn download(
        case: &mut CaseFile,
        report_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<u32, CoreError> {
        let now = clock.now();
        let report = case
            .reports
            .iter_mut()
            .find(|report| report.id == report_id)
            .ok_or_else(|| CoreError::ReportNotFound(report_id.to_string()))?;
        if report.is_expired(now) {
            return Err(CoreError::ReportExpired(report.report_number.clone()));
        }
        report.download_count += 1;
        let count = report.download_count;
        case.updated_at = now;
        Ok(count)
    }

    /// Lists reports for the case, newest first.
    pub fn list_by_case(case: &CaseFile, page: PageRequest) -> PageSlice<Report> {
        let page = page.normalized();
        let mut ordered: Vec<&Report> = case.reports.iter().collect();
        ordered.sort_by(|a, b| b.generated_at.cmp(&a.generated_at).then(a.id.cmp(&b.id)));
        let total = ordered.len();
        let items = ordered
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .cloned()
            .collect();
        PageSlice {
            items,
            page: page.page,
            page_size: page.page_size,
            total,
        }
    }

    fn validate_sections(sections: &[ReportSection]) -> Result<(), CoreError> {
        if sections.is_empty() {
            return Err(CoreError::Validation(
                "a report needs at least one section".into(),
            ));
        }
        for (index, section) in sections.iter().enumerate() {
            if sections[..index].contains(section) {
                return Err(CoreError::Validation(format!(
                    "duplicate report section: {section}"
                )));
            }
        }
        Ok(())
    }

    /// Builds the canonical hash payload. `generated_at` is needed to
    /// assemble the compliance snapshot but is stripped before hashing.
    fn canonical_payload(
        case: &CaseFile,
        request: &ReportRequest,
        inputs: &ComplianceInputs,
        config: &ComplianceConfig,
        window: DateWindow,
        generated_at: DateTime<Utc>,
    ) -> Result<Value, CoreError> {
        let mut sections = serde_json::Map::new();
        for section in &request.sections {
            let value = match section {
                ReportSection::BalanceSummary => {
                    to_canonical(&BalanceService::summarize(case, window.end))?
                }
                ReportSection::ComplianceSnapshot => {
                    let snapshot =
                        ComplianceService::snapshot(case, inputs, window, config, generated_at)?;
                    let mut value = to_canonical(&snapshot)?;
                    if let Some(object) = value.as_object_mut() {
                        object.remove("generated_at");
                    }
                    value
                }
                ReportSection::Obligations => {
                    let rows: Vec<_> = case
                        .obligations
                        .iter()
                        .filter(|ob| Self::obligation_in_window(ob, window))
                        .collect();
                    to_canonical(&rows)?
                }
                ReportSection::LedgerEntries => {
                    let rows: Vec<_> = case
                        .entries_in_replay_order()
                        .into_iter()
                        .filter(|entry| window.contains(entry.effective_date))
                        .collect();
                    to_canonical(&rows)?
                }
            };
            sections.insert(section.to_string(), value);
        }

        Ok(json!({
            "case_id": case.case_id,
            "report_type": request.report_type,
            "date_range_start": window.start.format("%Y-%m-%d").to_string(),
            "date_range_end": window.end.format("%Y-%m-%d").to_string(),
            "purpose": request.purpose,
            "sections": Value::Object(sections),
        }))
    }

    fn obligation_in_window(ob: &Obligation, window: DateWindow) -> bool {
        ob.due_date.map(|due| window.contains(due)).unwrap_or(false)
            || window.contains(ob.created_at.date_naive())
    }

    fn estimate_pages(
        case: &CaseFile,
        sections: &[ReportSection],
        window: DateWindow,
        policy: &ReportPolicy,
    ) -> u32 {
        let mut rows = 0usize;
        for section in sections {
            rows += match section {
                ReportSection::BalanceSummary | ReportSection::ComplianceSnapshot => 0,
                ReportSection::Obligations => case
                    .obligations
                    .iter()
                    .filter(|ob| Self::obligation_in_window(ob, window))
                    .count(),
                ReportSection::LedgerEntries => case
                    .entries
                    .iter()
                    .filter(|entry| window.contains(entry.effective_date))
                    .count(),
            };
        }
        let per_page = policy.rows_per_page.max(1) as usize;
        1 + (rows / per_page) as u32
    }

    /// Allocates a unique human-readable report number; collisions are
    /// retried, never overwritten.
    fn allocate_number(
        case: &CaseFile,
        policy: &ReportPolicy,
        clock: &dyn Clock,
    ) -> Result<String, CoreError> {
        let date_part = clock.today().format("%Y%m%d").to_string();
        for attempt in 0..NUMBER_ALLOC_ATTEMPTS {
            let raw = Uuid::new_v4().simple().to_string();
            let suffix = raw[..NUMBER_SUFFIX_LEN].to_uppercase();
            let candidate = format!("{}-{}-{}", policy.number_prefix, date_part, suffix);
            if case.report_by_number(&candidate).is_none() {
                return Ok(candidate);
            }
            warn!(%candidate, attempt, "report number collision, retrying");
        }
        Err(CoreError::Storage(
            "could not allocate a unique report number".into(),
        ))
    }
}

fn to_canonical<T: serde::Serialize>(value: &T) -> Result<Value, CoreError> {
    serde_json::to_value(value).map_err(|err| CoreError::Serde(err.to_string()))
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
