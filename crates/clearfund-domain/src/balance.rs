//! Derived balance views computed from the ledger; never persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;
use crate::obligation::ObligationStatus;

/// Point-in-time balance between the two parties of a case.
///
/// `net_balance` is oriented as the amount the petitioner owes the
/// respondent; the two one-directional fields are split from it, so at
/// most one of them is ever positive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceSummary {
    pub case_id: Uuid,
    pub petitioner_id: Uuid,
    pub respondent_id: Uuid,
    /// Signed; positive means the petitioner owes.
    pub petitioner_balance: Money,
    /// Signed; positive means the respondent owes.
    pub respondent_balance: Money,
    pub petitioner_owes_respondent: Money,
    pub respondent_owes_petitioner: Money,
    pub net_balance: Money,
    pub obligation_counts: ObligationStatusCounts,
    pub total_this_month: Money,
    pub total_overdue: Money,
}

impl BalanceSummary {
    /// Derives the directional fields from a signed net balance.
    pub fn from_net(
        case_id: Uuid,
        petitioner_id: Uuid,
        respondent_id: Uuid,
        net_balance: Money,
    ) -> Self {
        Self {
            case_id,
            petitioner_id,
            respondent_id,
            petitioner_balance: net_balance,
            respondent_balance: -net_balance,
            petitioner_owes_respondent: net_balance.floor_zero(),
            respondent_owes_petitioner: (-net_balance).floor_zero(),
            net_balance,
            obligation_counts: ObligationStatusCounts::default(),
            total_this_month: Money::ZERO,
            total_overdue: Money::ZERO,
        }
    }
}

/// Per-status obligation tallies for the case.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObligationStatusCounts {
    pub open: u32,
    pub partially_funded: u32,
    pub funded: u32,
    pub verified: u32,
    pub completed: u32,
    pub cancelled: u32,
}

impl ObligationStatusCounts {
    pub fn record(&mut self, status: ObligationStatus) {
        match status {
            ObligationStatus::Open => self.open += 1,
            ObligationStatus::PartiallyFunded => self.partially_funded += 1,
            ObligationStatus::Funded => self.funded += 1,
            ObligationStatus::Verified => self.verified += 1,
            ObligationStatus::Completed => self.completed += 1,
            ObligationStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.open + self.partially_funded + self.funded + self.verified + self.completed
            + self.cancelled
    }
}

/// Case-level dashboard counters backing the metrics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseMetrics {
    pub case_id: Uuid,
    pub obligation_counts: ObligationStatusCounts,
    pub entry_count: usize,
    pub report_count: usize,
    /// Sum of totals across non-cancelled obligations.
    pub total_obligated: Money,
    pub total_funded: Money,
    pub total_this_month: Money,
    pub total_overdue: Money,
    pub overdue_count: u32,
    pub writes_frozen: bool,
}
