//! The obligation state machine.
//!
//! Transitions are the only legal way to mutate funding amounts or
//! status. Every funding transition emits exactly one ledger entry inside
//! the same unit of work: all validation happens up front, so by the time
//! anything is mutated the whole transition can no longer fail.

use chrono::NaiveDate;
use clearfund_domain::{
    AuditAction, AuditEvent, CaseFile, EntryDraft, EntryType, Money, Obligation,
    ObligationStatus, PageRequest, PageSlice, PurposeCategory,
};
use tracing::info;
use uuid::Uuid;

use crate::error::CoreError;
use crate::ledger_service::{ensure_unfrozen, LedgerService};
use crate::time::Clock;

/// Caller-supplied fields for a new obligation.
#[derive(Debug, Clone)]
pub struct NewObligation {
    pub title: String,
    pub purpose_category: PurposeCategory,
    pub total_amount: Money,
    pub petitioner_share: Money,
    pub respondent_share: Money,
    pub due_date: Option<NaiveDate>,
    pub verification_required: bool,
    pub receipt_required: bool,
    pub created_by: Uuid,
}

/// Result of a successful funding transition.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingOutcome {
    pub entry_id: Uuid,
    pub status: ObligationStatus,
    pub amount_funded: Money,
    pub version: u64,
}

/// Stateless lifecycle operations over a [`CaseFile`]'s obligations.
pub struct ObligationService;

impl ObligationService {
    /// Creates a new purpose-locked obligation in the `open` state.
    ///
    /// Shares must sum to the total exactly; tolerance is zero.
    pub fn create(
        case: &mut CaseFile,
        input: NewObligation,
        clock: &dyn Clock,
    ) -> Result<Uuid, CoreError> {
        ensure_unfrozen(case)?;
        if input.title.trim().is_empty() {
            return Err(CoreError::Validation("obligation title is required".into()));
        }
        if !input.total_amount.is_positive() {
            return Err(CoreError::Validation(
                "obligation total must be positive".into(),
            ));
        }
        if input.petitioner_share.is_negative() || input.respondent_share.is_negative() {
            return Err(CoreError::Validation("shares must not be negative".into()));
        }
        let share_sum = input
            .petitioner_share
            .checked_add(input.respondent_share)
            .ok_or_else(|| CoreError::Validation("shares overflow".into()))?;
        if share_sum != input.total_amount {
            return Err(CoreError::Validation(format!(
                "shares {} + {} must sum to the total amount {}",
                input.petitioner_share, input.respondent_share, input.total_amount
            )));
        }

        let mut obligation = Obligation::new(
            case.case_id,
            input.title,
            input.purpose_category,
            input.total_amount,
            input.petitioner_share,
            input.respondent_share,
            input.created_by,
            clock.now(),
        );
        obligation.due_date = input.due_date;
        obligation.verification_required = input.verification_required;
        obligation.receipt_required = input.receipt_required;
        let id = obligation.id;
        case.obligations.push(obligation);
        case.updated_at = clock.now();
        Ok(id)
    }

    /// Funds an obligation by `amount` on behalf of `funder`, emitting the
    /// paired ledger entry atomically.
    ///
    /// Pass the version the caller last read as `expected_version`; a
    /// mismatch means a concurrent transition won and the caller must
    /// re-read and retry.
    pub fn fund(
        case: &mut CaseFile,
        obligation_id: Uuid,
        funder: Uuid,
        amount: Money,
        expected_version: Option<u64>,
        clock: &dyn Clock,
    ) -> Result<FundingOutcome, CoreError> {
        ensure_unfrozen(case)?;
        let counterparty = case
            .other_party(funder)
            .ok_or_else(|| CoreError::Validation("funder is not a party to this case".into()))?;
        if !amount.is_positive() {
            return Err(CoreError::Validation("funding amount must be positive".into()));
        }

        let (title, new_funded, new_status) = {
            let obligation = case
                .obligation(obligation_id)
                .ok_or(CoreError::ObligationNotFound(obligation_id))?;
            check_version(obligation, expected_version)?;
            if !obligation.status.accepts_funding() {
                return Err(CoreError::InvalidTransition {
                    obligation: obligation_id,
                    status: obligation.status,
                });
            }
            let remaining = obligation.remaining_amount();
            if amount > remaining {
                return Err(CoreError::Overfund {
                    obligation: obligation_id,
                    attempted: amount,
                    remaining,
                });
            }
            let new_funded = obligation
                .amount_funded
                .checked_add(amount)
                .ok_or_else(|| CoreError::Validation("funded amount overflows".into()))?;
            let new_status = if new_funded == obligation.total_amount {
                ObligationStatus::Funded
            } else {
                ObligationStatus::PartiallyFunded
            };
            (obligation.title.clone(), new_funded, new_status)
        };

        // Ledger append is validated and performed first; once it succeeds
        // the obligation update below cannot fail, so the two writes land
        // as one unit.
        let draft = EntryDraft::new(
            EntryType::Funding,
            counterparty,
            funder,
            amount,
            format!("Funding: {title}"),
            clock.today(),
        )
        .for_obligation(obligation_id);
        let entry_id = LedgerService::append(case, draft, clock)?;

        let petitioner_id = case.petitioner_id;
        let obligation = case
            .obligation_mut(obligation_id)
            .ok_or(CoreError::ObligationNotFound(obligation_id))?;
        obligation.amount_funded = new_funded;
        obligation.status = new_status;
        obligation.version += 1;
        if funder == petitioner_id {
            obligation.funded_by_petitioner = obligation.funded_by_petitioner.saturating_add(amount);
        } else {
            obligation.funded_by_respondent = obligation.funded_by_respondent.saturating_add(amount);
        }
        let version = obligation.version;
        case.updated_at = clock.now();
        info!(
            obligation = %obligation_id,
            amount = %amount,
            status = %new_status,
            "obligation funded"
        );
        Ok(FundingOutcome {
            entry_id,
            status: new_status,
            amount_funded: new_funded,
            version,
        })
    }

    /// Marks a fully funded obligation as verified.
    pub fn verify(
        case: &mut CaseFile,
        obligation_id: Uuid,
        verified_by: Uuid,
        expected_version: Option<u64>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        ensure_unfrozen(case)?;
        let obligation = case
            .obligation_mut(obligation_id)
            .ok_or(CoreError::ObligationNotFound(obligation_id))?;
        check_version(obligation, expected_version)?;
        if obligation.status != ObligationStatus::Funded || !obligation.verification_required {
            return Err(CoreError::InvalidTransition {
                obligation: obligation_id,
                status: obligation.status,
            });
        }
        obligation.amount_verified = obligation.amount_funded;
        obligation.status = ObligationStatus::Verified;
        obligation.version += 1;
        case.record_audit(
            AuditEvent::new(AuditAction::ObligationVerified, clock.now())
                .for_obligation(obligation_id)
                .by(verified_by),
        );
        case.updated_at = clock.now();
        Ok(())
    }

    /// Completes an obligation. Requires `verified` when verification is
    /// required, `funded` otherwise; a receipt reference when receipts are
    /// required.
    pub fn complete(
        case: &mut CaseFile,
        obligation_id: Uuid,
        completed_by: Uuid,
        receipt_reference: Option<String>,
        expected_version: Option<u64>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        ensure_unfrozen(case)?;
        let obligation = case
            .obligation_mut(obligation_id)
            .ok_or(CoreError::ObligationNotFound(obligation_id))?;
        check_version(obligation, expected_version)?;
        let required_status = if obligation.verification_required {
            ObligationStatus::Verified
        } else {
            ObligationStatus::Funded
        };
        if obligation.status != required_status {
            return Err(CoreError::InvalidTransition {
                obligation: obligation_id,
                status: obligation.status,
            });
        }
        if let Some(reference) = receipt_reference {
            obligation.receipt_reference = Some(reference);
        }
        if obligation.receipt_required && obligation.receipt_reference.is_none() {
            return Err(CoreError::Validation(
                "a receipt reference is required to complete this obligation".into(),
            ));
        }
        obligation.status = ObligationStatus::Completed;
        obligation.version += 1;
        case.record_audit(
            AuditEvent::new(AuditAction::ObligationCompleted, clock.now())
                .for_obligation(obligation_id)
                .by(completed_by),
        );
        case.updated_at = clock.now();
        Ok(())
    }

    /// Cancels a non-terminal obligation, recording who cancelled and why
    /// in the audit log. No ledger entry is written: no money moves.
    pub fn cancel(
        case: &mut CaseFile,
        obligation_id: Uuid,
        cancelled_by: Uuid,
        reason: impl Into<String>,
        expected_version: Option<u64>,
        clock: &dyn Clock,
    ) -> Result<(), CoreError> {
        ensure_unfrozen(case)?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(CoreError::Validation("a cancellation reason is required".into()));
        }
        let obligation = case
            .obligation_mut(obligation_id)
            .ok_or(CoreError::ObligationNotFound(obligation_id))?;
        check_version(obligation, expected_version)?;
        if obligation.is_terminal() {
            return Err(CoreError::InvalidTransition {
                obligation: obligation_id,
                status: obligation.status,
            });
        }
        obligation.status = ObligationStatus::Cancelled;
        obligation.version += 1;
        case.record_audit(
            AuditEvent::new(AuditAction::ObligationCancelled, clock.now())
                .for_obligation(obligation_id)
                .by(cancelled_by)
                .with_note(reason),
        );
        case.updated_at = clock.now();
        Ok(())
    }

    /// Lists obligations for the case, newest first.
    pub fn list_by_case(case: &CaseFile, page: PageRequest) -> PageSlice<Obligation> {
        let page = page.normalized();
        let mut ordered: Vec<&Obligation> = case.obligations.iter().collect();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
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
}

fn check_version(obligation: &Obligation, expected: Option<u64>) -> Result<(), CoreError> {
    if let Some(expected) = expected {
        if expected != obligation.version {
            return Err(CoreError::ConcurrencyConflict {
                obligation: obligation.id,
                expected,
                found: obligation.version,
            });
        }
    }
    Ok(())
}
