//! Append-only ledger entries recording monetary movements between parties.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Identifiable;
use crate::money::Money;

/// One atomic, immutable monetary movement.
///
/// Once appended, the amount, parties, and effective date never change;
/// corrections are new entries of type [`EntryType::Adjustment`] that
/// reference the original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub case_id: Uuid,
    /// Store-assigned, strictly increasing insertion index. Resolves the
    /// replay ordering tie-break when two entries share an effective date.
    pub sequence: u64,
    pub entry_type: EntryType,
    pub obligor_id: Uuid,
    pub obligee_id: Uuid,
    /// Signed amount; positive increases the obligor's debt to the obligee.
    pub amount: Money,
    /// Case-level net balance immediately after this entry, oriented as
    /// the amount the petitioner owes the respondent.
    pub running_balance: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obligation_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusts_entry_id: Option<Uuid>,
    pub description: String,
    pub effective_date: NaiveDate,
    pub is_reconciled: bool,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Signed contribution of this entry toward the canonical
    /// petitioner-owes-respondent net balance.
    pub fn signed_toward(&self, petitioner_id: Uuid) -> Money {
        if self.obligor_id == petitioner_id {
            self.amount
        } else {
            -self.amount
        }
    }

    /// Ordering key for deterministic replay.
    pub fn replay_key(&self) -> (NaiveDate, u64) {
        (self.effective_date, self.sequence)
    }
}

impl Identifiable for LedgerEntry {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Kind of monetary movement an entry records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// A direct inter-party obligation coming due (e.g. child support).
    Obligation,
    /// A payment into a purpose-locked obligation; emitted only by
    /// funding transitions.
    Funding,
    /// One party fronting money on the other's behalf.
    Prepayment,
    /// Signed correction referencing a prior entry.
    Adjustment,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryType::Obligation => "obligation",
            EntryType::Funding => "funding",
            EntryType::Prepayment => "prepayment",
            EntryType::Adjustment => "adjustment",
        };
        f.write_str(label)
    }
}

/// Caller-supplied fields for a new entry; the ledger service assigns
/// identity, sequence, timestamps, and the running balance.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub entry_type: EntryType,
    pub obligor_id: Uuid,
    pub obligee_id: Uuid,
    pub amount: Money,
    pub obligation_id: Option<Uuid>,
    pub adjusts_entry_id: Option<Uuid>,
    pub description: String,
    pub effective_date: NaiveDate,
}

impl EntryDraft {
    pub fn new(
        entry_type: EntryType,
        obligor_id: Uuid,
        obligee_id: Uuid,
        amount: Money,
        description: impl Into<String>,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            entry_type,
            obligor_id,
            obligee_id,
            amount,
            obligation_id: None,
            adjusts_entry_id: None,
            description: description.into(),
            effective_date,
        }
    }

    pub fn for_obligation(mut self, obligation_id: Uuid) -> Self {
        self.obligation_id = Some(obligation_id);
        self
    }

    pub fn adjusting(mut self, entry_id: Uuid) -> Self {
        self.adjusts_entry_id = Some(entry_id);
        self
    }
}
