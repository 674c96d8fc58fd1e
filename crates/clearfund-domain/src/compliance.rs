//! Compliance scoring types: per-category assessments, snapshots, and the
//! scoring configuration with its validation rules.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::DateWindow;

/// Traffic-light status used for categories and the overall snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Green,
    Amber,
    Red,
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComplianceStatus::Green => "green",
            ComplianceStatus::Amber => "amber",
            ComplianceStatus::Red => "red",
        };
        f.write_str(label)
    }
}

/// The four scored dimensions of a snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCategory {
    Schedule,
    Communication,
    Financial,
    Item,
}

impl fmt::Display for ComplianceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComplianceCategory::Schedule => "schedule",
            ComplianceCategory::Communication => "communication",
            ComplianceCategory::Financial => "financial",
            ComplianceCategory::Item => "item",
        };
        f.write_str(label)
    }
}

/// Score and findings for one category within the window.
///
/// `metrics` uses a sorted map so serialization order is stable, which the
/// report hash depends on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryCompliance {
    pub category: ComplianceCategory,
    pub status: ComplianceStatus,
    pub score: f64,
    pub metrics: BTreeMap<String, f64>,
    pub issues: Vec<String>,
}

/// Direction of change relative to the previous snapshot, when known.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceTrend {
    Improving,
    Steady,
    Declining,
}

/// Scored, time-windowed assessment of a case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceSnapshot {
    pub case_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub window: DateWindow,
    pub schedule: CategoryCompliance,
    pub communication: CategoryCompliance,
    pub financial: CategoryCompliance,
    pub item: CategoryCompliance,
    pub overall_score: f64,
    pub overall_status: ComplianceStatus,
    pub days_monitored: u32,
    pub total_exchanges: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_time_rate: Option<f64>,
    pub flagged_messages_count: u32,
    pub overdue_obligations: u32,
    pub disputed_items: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<ComplianceTrend>,
}

impl ComplianceSnapshot {
    pub fn categories(&self) -> [&CategoryCompliance; 4] {
        [&self.schedule, &self.communication, &self.financial, &self.item]
    }
}

/// Custody-exchange facts for the window, supplied by the scheduling
/// subsystem.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleFacts {
    pub days_monitored: u32,
    pub total_exchanges: u32,
    pub on_time_exchanges: u32,
    pub missed_exchanges: u32,
}

/// Messaging facts for the window, supplied by the messaging subsystem.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommunicationFacts {
    pub messages_total: u32,
    pub flagged_messages: u32,
}

/// Item-exchange facts for the window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemFacts {
    pub exchanges_recorded: u32,
    pub returned_on_time: u32,
    pub disputed_items: u32,
}

/// Read-only facts injected into the scorer. The financial category is the
/// only one derived from case data directly; the rest come from the
/// excluded collaborator subsystems.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ComplianceInputs {
    pub schedule: ScheduleFacts,
    pub communication: CommunicationFacts,
    pub items: ItemFacts,
    /// Payment disputes raised through the dispute subsystem.
    pub disputed_obligations: u32,
    /// Overall score of the previous snapshot, used to derive the trend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_overall: Option<f64>,
}

/// Relative weight of each category in the overall score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CategoryWeights {
    pub schedule: f64,
    pub communication: f64,
    pub financial: f64,
    pub item: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            schedule: 0.3,
            communication: 0.2,
            financial: 0.3,
            item: 0.2,
        }
    }
}

/// Score cutoffs mapping a 0–100 score onto a status band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StatusThresholds {
    /// Scores at or above this are green.
    pub green_min: f64,
    /// Scores at or above this (and below `green_min`) are amber.
    pub amber_min: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            green_min: 85.0,
            amber_min: 70.0,
        }
    }
}

impl StatusThresholds {
    pub fn status_for(&self, score: f64) -> ComplianceStatus {
        if score >= self.green_min {
            ComplianceStatus::Green
        } else if score >= self.amber_min {
            ComplianceStatus::Amber
        } else {
            ComplianceStatus::Red
        }
    }
}

/// Per-incident score deductions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScorePenalties {
    pub overdue_obligation: f64,
    pub disputed_item: f64,
    pub flagged_message: f64,
    pub missed_exchange: f64,
}

impl Default for ScorePenalties {
    fn default() -> Self {
        Self {
            overdue_obligation: 15.0,
            disputed_item: 10.0,
            flagged_message: 5.0,
            missed_exchange: 10.0,
        }
    }
}

/// Complete scorer configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComplianceConfig {
    pub weights: CategoryWeights,
    pub thresholds: StatusThresholds,
    pub penalties: ScorePenalties,
    /// Score assigned to a category with no observations in the window.
    pub neutral_score: f64,
    pub snapshot_window_days: i64,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            weights: CategoryWeights::default(),
            thresholds: StatusThresholds::default(),
            penalties: ScorePenalties::default(),
            neutral_score: 100.0,
            snapshot_window_days: 30,
        }
    }
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

impl ComplianceConfig {
    pub fn validate(&self) -> Result<(), ComplianceConfigError> {
        let w = &self.weights;
        for weight in [w.schedule, w.communication, w.financial, w.item] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ComplianceConfigError::WeightOutOfRange(weight));
            }
        }
        let sum = w.schedule + w.communication + w.financial + w.item;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ComplianceConfigError::WeightsDoNotSumToOne(sum));
        }
        let t = &self.thresholds;
        if !(0.0..=100.0).contains(&t.amber_min)
            || !(0.0..=100.0).contains(&t.green_min)
            || t.amber_min >= t.green_min
        {
            return Err(ComplianceConfigError::ThresholdsNotMonotonic {
                green_min: t.green_min,
                amber_min: t.amber_min,
            });
        }
        if !(0.0..=100.0).contains(&self.neutral_score) {
            return Err(ComplianceConfigError::NeutralScoreOutOfRange(self.neutral_score));
        }
        if self.snapshot_window_days < 1 {
            return Err(ComplianceConfigError::WindowTooShort(self.snapshot_window_days));
        }
        Ok(())
    }
}

/// Errors raised when a scorer configuration is internally inconsistent.
#[derive(Debug, Clone, PartialEq)]
pub enum ComplianceConfigError {
    WeightOutOfRange(f64),
    WeightsDoNotSumToOne(f64),
    ThresholdsNotMonotonic { green_min: f64, amber_min: f64 },
    NeutralScoreOutOfRange(f64),
    WindowTooShort(i64),
}

impl fmt::Display for ComplianceConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceConfigError::WeightOutOfRange(value) => {
                write!(f, "category weight {value} is outside [0, 1]")
            }
            ComplianceConfigError::WeightsDoNotSumToOne(sum) => {
                write!(f, "category weights sum to {sum}, expected 1.0")
            }
            ComplianceConfigError::ThresholdsNotMonotonic { green_min, amber_min } => {
                write!(
                    f,
                    "status thresholds must satisfy 0 <= amber_min < green_min <= 100, got amber_min {amber_min}, green_min {green_min}"
                )
            }
            ComplianceConfigError::NeutralScoreOutOfRange(value) => {
                write!(f, "neutral score {value} is outside [0, 100]")
            }
            ComplianceConfigError::WindowTooShort(days) => {
                write!(f, "snapshot window of {days} days is too short")
            }
        }
    }
}

impl std::error::Error for ComplianceConfigError {}
