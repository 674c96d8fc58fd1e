//! The case file aggregate: everything the ledger engine persists for one
//! case, plus its non-monetary audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::LedgerEntry;
use crate::obligation::Obligation;
use crate::report::Report;

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

fn default_schema_version() -> u8 {
    CURRENT_SCHEMA_VERSION
}

/// Aggregate root for one case: the two parties, their obligations, the
/// append-only ledger, generated reports, and the audit log.
///
/// `writes_frozen` is set when reconciliation detects a ledger divergence;
/// all write paths reject frozen cases until an operator resolves the
/// incident.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseFile {
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
    pub case_id: Uuid,
    pub petitioner_id: Uuid,
    pub respondent_id: Uuid,
    #[serde(default)]
    pub obligations: Vec<Obligation>,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub audit_log: Vec<AuditEvent>,
    #[serde(default)]
    pub writes_frozen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaseFile {
    pub fn new(
        case_id: Uuid,
        petitioner_id: Uuid,
        respondent_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            case_id,
            petitioner_id,
            respondent_id,
            obligations: Vec::new(),
            entries: Vec::new(),
            reports: Vec::new(),
            audit_log: Vec::new(),
            writes_frozen: false,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_party(&self, id: Uuid) -> bool {
        id == self.petitioner_id || id == self.respondent_id
    }

    /// The counterparty of `party`, if `party` belongs to this case.
    pub fn other_party(&self, party: Uuid) -> Option<Uuid> {
        if party == self.petitioner_id {
            Some(self.respondent_id)
        } else if party == self.respondent_id {
            Some(self.petitioner_id)
        } else {
            None
        }
    }

    pub fn obligation(&self, id: Uuid) -> Option<&Obligation> {
        self.obligations.iter().find(|ob| ob.id == id)
    }

    pub fn obligation_mut(&mut self, id: Uuid) -> Option<&mut Obligation> {
        self.obligations.iter_mut().find(|ob| ob.id == id)
    }

    pub fn entry(&self, id: Uuid) -> Option<&LedgerEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn report(&self, id: Uuid) -> Option<&Report> {
        self.reports.iter().find(|report| report.id == id)
    }

    pub fn report_by_number(&self, number: &str) -> Option<&Report> {
        self.reports.iter().find(|report| report.report_number == number)
    }

    /// Next insertion index for the append-only ledger.
    pub fn next_sequence(&self) -> u64 {
        self.entries.last().map(|entry| entry.sequence + 1).unwrap_or(0)
    }

    /// Entries sorted by the deterministic replay key.
    pub fn entries_in_replay_order(&self) -> Vec<&LedgerEntry> {
        let mut ordered: Vec<&LedgerEntry> = self.entries.iter().collect();
        ordered.sort_by_key(|entry| entry.replay_key());
        ordered
    }

    pub fn record_audit(&mut self, event: AuditEvent) {
        self.audit_log.push(event);
    }
}

/// Non-monetary audit record. Cancellations land here rather than in the
/// ledger, since no money moves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obligation_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Uuid>,
    pub action: AuditAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            obligation_id: None,
            actor: None,
            action,
            note: None,
            recorded_at,
        }
    }

    pub fn for_obligation(mut self, obligation_id: Uuid) -> Self {
        self.obligation_id = Some(obligation_id);
        self
    }

    pub fn by(mut self, actor: Uuid) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// What happened, for the audit trail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ObligationCancelled,
    ObligationVerified,
    ObligationCompleted,
    IntegrityDivergence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_party_resolves_both_directions() {
        let petitioner = Uuid::new_v4();
        let respondent = Uuid::new_v4();
        let case = CaseFile::new(Uuid::new_v4(), petitioner, respondent, Utc::now());
        assert_eq!(case.other_party(petitioner), Some(respondent));
        assert_eq!(case.other_party(respondent), Some(petitioner));
        assert_eq!(case.other_party(Uuid::new_v4()), None);
    }

    #[test]
    fn sequence_starts_at_zero() {
        let case = CaseFile::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        assert_eq!(case.next_sequence(), 0);
    }
}
