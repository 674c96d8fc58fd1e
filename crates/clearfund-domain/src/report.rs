//! Immutable, content-addressed report records for court use.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Identifiable;

/// Kind of export a report represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    ComplianceSummary,
    FinancialStatement,
    FullRecord,
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReportType::ComplianceSummary => "Compliance Summary",
            ReportType::FinancialStatement => "Financial Statement",
            ReportType::FullRecord => "Full Record",
        };
        f.write_str(label)
    }
}

/// Sections that may be included in a report. Requests are validated
/// against this closed set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportSection {
    BalanceSummary,
    ComplianceSnapshot,
    Obligations,
    LedgerEntries,
}

impl ReportSection {
    pub const ALL: [ReportSection; 4] = [
        ReportSection::BalanceSummary,
        ReportSection::ComplianceSnapshot,
        ReportSection::Obligations,
        ReportSection::LedgerEntries,
    ];
}

impl fmt::Display for ReportSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReportSection::BalanceSummary => "balance_summary",
            ReportSection::ComplianceSnapshot => "compliance_snapshot",
            ReportSection::Obligations => "obligations",
            ReportSection::LedgerEntries => "ledger_entries",
        };
        f.write_str(label)
    }
}

/// A frozen, hash-verifiable export of case data.
///
/// `content_hash` is computed once at generation over the canonical
/// serialization of the included sections and never recomputed. The only
/// field that changes after generation is `download_count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: Uuid,
    pub case_id: Uuid,
    pub generated_by: Uuid,
    /// Human-readable, globally unique (e.g. `CF-20250615-A3F29B`).
    pub report_number: String,
    pub report_type: ReportType,
    pub title: String,
    pub date_range_start: NaiveDate,
    pub date_range_end: NaiveDate,
    pub sections_included: Vec<ReportSection>,
    pub page_count: u32,
    /// Lowercase hex SHA-256 of the canonicalized report content.
    pub content_hash: String,
    pub download_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Expiry is derived, never stored; the record itself is retained for
    /// audit even after it expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => expires < now,
            None => false,
        }
    }
}

impl Identifiable for Report {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Outcome of looking up a report by number. Unknown numbers are a valid
/// outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportVerification {
    pub report_number: String,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl ReportVerification {
    pub fn not_found(report_number: impl Into<String>) -> Self {
        Self {
            report_number: report_number.into(),
            is_valid: false,
            generated_at: None,
            generated_by: None,
            content_hash: None,
        }
    }

    pub fn found(report: &Report) -> Self {
        Self {
            report_number: report.report_number.clone(),
            is_valid: true,
            generated_at: Some(report.generated_at),
            generated_by: Some(report.generated_by),
            content_hash: Some(report.content_hash.clone()),
        }
    }
}

/// Policy knobs for report numbering and expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportPolicy {
    pub number_prefix: String,
    /// Reports expire this many days after generation; `None` disables
    /// expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_days: Option<i64>,
    /// Rows per rendered page, used for the page-count estimate.
    pub rows_per_page: u32,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self {
            number_prefix: "CF".into(),
            expiry_days: Some(90),
            rows_per_page: 25,
        }
    }
}
