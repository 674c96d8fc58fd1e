//! Purpose-locked obligations and their lifecycle states.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Displayable, Identifiable};
use crate::money::Money;

/// A purpose-locked financial commitment between the two parties of a case.
///
/// Obligations are never hard-deleted; cancellation is a terminal status.
/// All mutation goes through the obligation service so that every change
/// is a legal state-machine transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Obligation {
    pub id: Uuid,
    pub case_id: Uuid,
    pub title: String,
    pub purpose_category: PurposeCategory,
    pub total_amount: Money,
    pub petitioner_share: Money,
    pub respondent_share: Money,
    pub status: ObligationStatus,
    pub amount_funded: Money,
    pub amount_verified: Money,
    pub funded_by_petitioner: Money,
    pub funded_by_respondent: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub verification_required: bool,
    pub receipt_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_reference: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every successful transition.
    pub version: u64,
}

impl Obligation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        case_id: Uuid,
        title: impl Into<String>,
        purpose_category: PurposeCategory,
        total_amount: Money,
        petitioner_share: Money,
        respondent_share: Money,
        created_by: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            title: title.into(),
            purpose_category,
            total_amount,
            petitioner_share,
            respondent_share,
            status: ObligationStatus::Open,
            amount_funded: Money::ZERO,
            amount_verified: Money::ZERO,
            funded_by_petitioner: Money::ZERO,
            funded_by_respondent: Money::ZERO,
            due_date: None,
            verification_required: false,
            receipt_required: false,
            receipt_reference: None,
            created_by,
            created_at,
            version: 0,
        }
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Amount still unfunded. Never negative while the service invariants hold.
    pub fn remaining_amount(&self) -> Money {
        self.total_amount
            .checked_sub(self.amount_funded)
            .unwrap_or(Money::ZERO)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Overdue is computed, never stored: the due date has passed and the
    /// obligation has not reached a terminal state.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => due < today && !self.is_terminal(),
            None => false,
        }
    }
}

impl Identifiable for Obligation {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Obligation {
    fn display_label(&self) -> String {
        format!("{} ({} of {})", self.title, self.amount_funded, self.total_amount)
    }
}

/// Declared use of the funds; locked at creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurposeCategory {
    Medical,
    Education,
    Sports,
    Extracurricular,
    Device,
    Camp,
    Clothing,
    Transportation,
    Childcare,
    ChildSupport,
    Other,
}

impl fmt::Display for PurposeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PurposeCategory::Medical => "Medical",
            PurposeCategory::Education => "Education",
            PurposeCategory::Sports => "Sports",
            PurposeCategory::Extracurricular => "Extracurricular",
            PurposeCategory::Device => "Device",
            PurposeCategory::Camp => "Camp",
            PurposeCategory::Clothing => "Clothing",
            PurposeCategory::Transportation => "Transportation",
            PurposeCategory::Childcare => "Childcare",
            PurposeCategory::ChildSupport => "Child Support",
            PurposeCategory::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Lifecycle states. `Completed` and `Cancelled` are absorbing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Open,
    PartiallyFunded,
    Funded,
    Verified,
    Completed,
    Cancelled,
}

impl ObligationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ObligationStatus::Completed | ObligationStatus::Cancelled)
    }

    /// States from which a funding transition is legal.
    pub fn accepts_funding(self) -> bool {
        matches!(self, ObligationStatus::Open | ObligationStatus::PartiallyFunded)
    }
}

impl fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObligationStatus::Open => "open",
            ObligationStatus::PartiallyFunded => "partially_funded",
            ObligationStatus::Funded => "funded",
            ObligationStatus::Verified => "verified",
            ObligationStatus::Completed => "completed",
            ObligationStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}
