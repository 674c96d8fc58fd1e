//! Balance derivation and ledger reconciliation.
//!
//! The incremental path trusts the newest stored running balance; full
//! replay from entry zero is the canonical reference and doubles as the
//! audit job. A mismatch between the two is a data-integrity incident and
//! is never auto-corrected.

use chrono::NaiveDate;
use clearfund_domain::{
    same_month, AuditAction, AuditEvent, BalanceSummary, CaseFile, CaseMetrics, Money,
    ObligationStatus, ObligationStatusCounts,
};
use tracing::error;

use crate::error::CoreError;
use crate::time::Clock;

/// Stateless balance calculations over a [`CaseFile`].
pub struct BalanceService;

impl BalanceService {
    /// Point-in-time balance summary, trusting the newest stored running
    /// balance (the incremental path).
    pub fn summarize(case: &CaseFile, today: NaiveDate) -> BalanceSummary {
        let net = case
            .entries
            .last()
            .map(|entry| entry.running_balance)
            .unwrap_or(Money::ZERO);
        let mut summary =
            BalanceSummary::from_net(case.case_id, case.petitioner_id, case.respondent_id, net);

        let mut counts = ObligationStatusCounts::default();
        let mut total_this_month = Money::ZERO;
        let mut total_overdue = Money::ZERO;
        for obligation in &case.obligations {
            counts.record(obligation.status);
            if obligation.status != ObligationStatus::Cancelled {
                if let Some(due) = obligation.due_date {
                    if same_month(due, today) {
                        total_this_month = total_this_month.saturating_add(obligation.total_amount);
                    }
                }
            }
            if obligation.is_overdue(today) {
                total_overdue = total_overdue.saturating_add(obligation.remaining_amount());
            }
        }
        summary.obligation_counts = counts;
        summary.total_this_month = total_this_month;
        summary.total_overdue = total_overdue;
        summary
    }

    /// Case-level counters for the metrics endpoint.
    pub fn metrics(case: &CaseFile, today: NaiveDate) -> CaseMetrics {
        let summary = Self::summarize(case, today);
        let mut total_obligated = Money::ZERO;
        let mut total_funded = Money::ZERO;
        let mut overdue_count = 0u32;
        for obligation in &case.obligations {
            if obligation.status != ObligationStatus::Cancelled {
                total_obligated = total_obligated.saturating_add(obligation.total_amount);
                total_funded = total_funded.saturating_add(obligation.amount_funded);
            }
            if obligation.is_overdue(today) {
                overdue_count += 1;
            }
        }
        CaseMetrics {
            case_id: case.case_id,
            obligation_counts: summary.obligation_counts,
            entry_count: case.entries.len(),
            report_count: case.reports.len(),
            total_obligated,
            total_funded,
            total_this_month: summary.total_this_month,
            total_overdue: summary.total_overdue,
            overdue_count,
            writes_frozen: case.writes_frozen,
        }
    }

    /// Net balance derived by full replay from entry zero; the canonical
    /// reference implementation.
    pub fn replay_net(case: &CaseFile) -> Money {
        case.entries_in_replay_order()
            .iter()
            .fold(Money::ZERO, |acc, entry| {
                acc.saturating_add(entry.signed_toward(case.petitioner_id))
            })
    }

    /// Replays the ledger and checks every stored running balance against
    /// the recomputed value.
    ///
    /// On success all entries are marked reconciled. On the first
    /// mismatch the case is frozen for writes, an audit event is
    /// recorded, and the divergence is returned; resolution is an
    /// operator decision, never an automatic correction.
    pub fn reconcile(case: &mut CaseFile, clock: &dyn Clock) -> Result<(), CoreError> {
        let mut running = Money::ZERO;
        let mut divergence = None;
        for entry in case.entries_in_replay_order() {
            running = running.saturating_add(entry.signed_toward(case.petitioner_id));
            if entry.running_balance != running {
                divergence = Some((entry.id, entry.running_balance, running));
                break;
            }
        }

        match divergence {
            None => {
                for entry in &mut case.entries {
                    entry.is_reconciled = true;
                }
                case.updated_at = clock.now();
                Ok(())
            }
            Some((entry_id, stored, replayed)) => {
                case.writes_frozen = true;
                case.record_audit(
                    AuditEvent::new(AuditAction::IntegrityDivergence, clock.now()).with_note(
                        format!(
                            "entry {entry_id} stores balance {stored}, replay yields {replayed}"
                        ),
                    ),
                );
                case.updated_at = clock.now();
                error!(
                    case = %case.case_id,
                    entry = %entry_id,
                    stored = %stored,
                    replayed = %replayed,
                    "ledger divergence detected; case frozen for writes"
                );
                Err(CoreError::IntegrityDivergence {
                    case: case.case_id,
                    entry: entry_id,
                    stored,
                    replayed,
                })
            }
        }
    }
}
