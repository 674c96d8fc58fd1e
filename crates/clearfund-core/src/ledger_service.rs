//! Append-only ledger writes and ordered reads.
//!
//! The ledger exposes exactly two operations: append and list. There is no
//! update or delete; corrections are adjustment entries referencing the
//! original.

use clearfund_domain::{
    CaseFile, EntryDraft, EntryType, LedgerEntry, Money, PageRequest, PageSlice,
};
use uuid::Uuid;

use crate::error::CoreError;
use crate::time::Clock;

/// Stateless ledger operations over a [`CaseFile`].
pub struct LedgerService;

impl LedgerService {
    /// Appends one entry, computing its running balance from the latest
    /// entry for the case pair.
    ///
    /// Appends must arrive in effective-date order; a draft dated before
    /// the newest entry is rejected so that insertion order and replay
    /// order provably coincide, which is what keeps stored running
    /// balances replayable. Backdated corrections go through an
    /// adjustment entry dated today instead.
    pub fn append(
        case: &mut CaseFile,
        draft: EntryDraft,
        clock: &dyn Clock,
    ) -> Result<Uuid, CoreError> {
        ensure_unfrozen(case)?;
        Self::validate_draft(case, &draft)?;

        let previous = case
            .entries
            .last()
            .map(|entry| entry.running_balance)
            .unwrap_or(Money::ZERO);
        let contribution = if draft.obligor_id == case.petitioner_id {
            draft.amount
        } else {
            -draft.amount
        };
        let running_balance = previous.checked_add(contribution).ok_or_else(|| {
            CoreError::Validation("running balance overflows ledger range".into())
        })?;

        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            case_id: case.case_id,
            sequence: case.next_sequence(),
            entry_type: draft.entry_type,
            obligor_id: draft.obligor_id,
            obligee_id: draft.obligee_id,
            amount: draft.amount,
            running_balance,
            obligation_id: draft.obligation_id,
            adjusts_entry_id: draft.adjusts_entry_id,
            description: draft.description,
            effective_date: draft.effective_date,
            is_reconciled: false,
            created_at: clock.now(),
        };
        let id = entry.id;
        case.entries.push(entry);
        case.updated_at = clock.now();
        Ok(id)
    }

    /// Lists entries for the case in replay order, one page at a time.
    pub fn list_by_case(case: &CaseFile, page: PageRequest) -> PageSlice<LedgerEntry> {
        let page = page.normalized();
        let ordered = case.entries_in_replay_order();
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

    /// All entries that reference the given obligation, in replay order.
    pub fn entries_for_obligation(case: &CaseFile, obligation_id: Uuid) -> Vec<LedgerEntry> {
        case.entries_in_replay_order()
            .into_iter()
            .filter(|entry| entry.obligation_id == Some(obligation_id))
            .cloned()
            .collect()
    }

    fn validate_draft(case: &CaseFile, draft: &EntryDraft) -> Result<(), CoreError> {
        if !case.is_party(draft.obligor_id) || !case.is_party(draft.obligee_id) {
            return Err(CoreError::Validation(
                "entry parties must be the case petitioner and respondent".into(),
            ));
        }
        if draft.obligor_id == draft.obligee_id {
            return Err(CoreError::Validation(
                "obligor and obligee must differ".into(),
            ));
        }
        if draft.description.trim().is_empty() {
            return Err(CoreError::Validation("entry description is required".into()));
        }
        match draft.entry_type {
            EntryType::Adjustment => {
                if draft.amount.is_zero() {
                    return Err(CoreError::Validation(
                        "adjustment amount must be non-zero".into(),
                    ));
                }
                let adjusted = draft.adjusts_entry_id.ok_or_else(|| {
                    CoreError::Validation("adjustment must reference the corrected entry".into())
                })?;
                if case.entry(adjusted).is_none() {
                    return Err(CoreError::EntryNotFound(adjusted));
                }
            }
            _ => {
                if !draft.amount.is_positive() {
                    return Err(CoreError::Validation("amount must be positive".into()));
                }
                if draft.adjusts_entry_id.is_some() {
                    return Err(CoreError::Validation(
                        "only adjustment entries may reference a corrected entry".into(),
                    ));
                }
            }
        }
        if let Some(obligation_id) = draft.obligation_id {
            if case.obligation(obligation_id).is_none() {
                return Err(CoreError::ObligationNotFound(obligation_id));
            }
        }
        if let Some(last) = case.entries.last() {
            if draft.effective_date < last.effective_date {
                return Err(CoreError::Validation(format!(
                    "entry dated {} precedes the newest ledger entry ({}); record an adjustment instead",
                    draft.effective_date, last.effective_date
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn ensure_unfrozen(case: &CaseFile) -> Result<(), CoreError> {
    if case.writes_frozen {
        return Err(CoreError::CaseFrozen(case.case_id));
    }
    Ok(())
}
