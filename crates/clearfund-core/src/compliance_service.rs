//! Compliance scoring: a pure function of a time window, case data, and
//! injected collaborator facts.
//!
//! The scorer performs no I/O and consults no hidden state; identical
//! inputs always produce identical snapshots, which report hashing
//! depends on.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use clearfund_domain::{
    AuditAction, CaseFile, CategoryCompliance, ComplianceCategory, ComplianceConfig,
    ComplianceInputs, ComplianceSnapshot, ComplianceTrend, DateWindow, ObligationStatus,
};
use uuid::Uuid;

use crate::error::CoreError;
use crate::time::Clock;

/// How far the overall score must move before the trend leaves `Steady`.
const TREND_TOLERANCE: f64 = 2.0;

/// Facts about the case's obligations inside the scoring window; derived
/// here rather than injected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FinancialFacts {
    considered: u32,
    completed_on_time: u32,
    completed_late: u32,
    overdue: u32,
    disputed: u32,
}

/// Stateless compliance scoring.
pub struct ComplianceService;

impl ComplianceService {
    /// Produces a snapshot for the window. `generated_at` is stamped by
    /// the caller's clock; everything else is a function of the inputs.
    pub fn snapshot(
        case: &CaseFile,
        inputs: &ComplianceInputs,
        window: DateWindow,
        config: &ComplianceConfig,
        generated_at: DateTime<Utc>,
    ) -> Result<ComplianceSnapshot, CoreError> {
        config.validate()?;

        let financial_facts = Self::financial_facts(case, inputs, window);
        let schedule = Self::score_schedule(inputs, config);
        let communication = Self::score_communication(inputs, config);
        let financial = Self::score_financial(&financial_facts, config);
        let item = Self::score_items(inputs, config);

        let weights = &config.weights;
        let overall_score = round2(
            schedule.score * weights.schedule
                + communication.score * weights.communication
                + financial.score * weights.financial
                + item.score * weights.item,
        );
        let overall_status = config.thresholds.status_for(overall_score);
        let trend = inputs.previous_overall.map(|previous| {
            let delta = overall_score - previous;
            if delta > TREND_TOLERANCE {
                ComplianceTrend::Improving
            } else if delta < -TREND_TOLERANCE {
                ComplianceTrend::Declining
            } else {
                ComplianceTrend::Steady
            }
        });

        let sched = &inputs.schedule;
        let days_monitored = if sched.days_monitored > 0 {
            sched.days_monitored
        } else {
            window.days() as u32
        };
        let on_time_rate = if sched.total_exchanges > 0 {
            Some(round4(f64::from(sched.on_time_exchanges) / f64::from(sched.total_exchanges)))
        } else {
            None
        };

        Ok(ComplianceSnapshot {
            case_id: case.case_id,
            generated_at,
            window,
            schedule,
            communication,
            financial,
            item,
            overall_score,
            overall_status,
            days_monitored,
            total_exchanges: sched.total_exchanges,
            on_time_rate,
            flagged_messages_count: inputs.communication.flagged_messages,
            overdue_obligations: financial_facts.overdue,
            disputed_items: inputs.items.disputed_items,
            trend,
        })
    }

    /// Snapshot over the rolling window ending today. `days` falls back to
    /// the configured default when absent.
    pub fn snapshot_for_days(
        case: &CaseFile,
        inputs: &ComplianceInputs,
        days: Option<i64>,
        config: &ComplianceConfig,
        clock: &dyn Clock,
    ) -> Result<ComplianceSnapshot, CoreError> {
        let days = days.unwrap_or(config.snapshot_window_days);
        if days < 1 {
            return Err(CoreError::Validation(format!(
                "snapshot window of {days} days is too short"
            )));
        }
        let window = DateWindow::trailing(clock.today(), days);
        Self::snapshot(case, inputs, window, config, clock.now())
    }

    fn financial_facts(
        case: &CaseFile,
        inputs: &ComplianceInputs,
        window: DateWindow,
    ) -> FinancialFacts {
        let mut facts = FinancialFacts {
            disputed: inputs.disputed_obligations,
            ..FinancialFacts::default()
        };
        for obligation in &case.obligations {
            let due_in_window = obligation
                .due_date
                .map(|due| window.contains(due))
                .unwrap_or(false);
            let created_in_window = window.contains(obligation.created_at.date_naive());
            if !due_in_window && !created_in_window {
                continue;
            }
            facts.considered += 1;
            if obligation.is_overdue(window.end) {
                facts.overdue += 1;
            }
            if obligation.status == ObligationStatus::Completed {
                if Self::completed_on_time(case, obligation.id, obligation.due_date) {
                    facts.completed_on_time += 1;
                } else {
                    facts.completed_late += 1;
                }
            }
        }
        facts
    }

    /// An obligation completed on time if its completion audit event is
    /// dated on or before the due date (or it has no due date).
    fn completed_on_time(
        case: &CaseFile,
        obligation_id: Uuid,
        due_date: Option<NaiveDate>,
    ) -> bool {
        let due = match due_date {
            Some(due) => due,
            None => return true,
        };
        case.audit_log
            .iter()
            .filter(|event| {
                event.obligation_id == Some(obligation_id)
                    && event.action == AuditAction::ObligationCompleted
            })
            .all(|event| event.recorded_at.date_naive() <= due)
    }

    fn score_schedule(inputs: &ComplianceInputs, config: &ComplianceConfig) -> CategoryCompliance {
        let facts = &inputs.schedule;
        let mut metrics = BTreeMap::new();
        metrics.insert("total_exchanges".into(), f64::from(facts.total_exchanges));
        metrics.insert("on_time_exchanges".into(), f64::from(facts.on_time_exchanges));
        metrics.insert("missed_exchanges".into(), f64::from(facts.missed_exchanges));

        if facts.total_exchanges == 0 {
            return Self::neutral(
                ComplianceCategory::Schedule,
                metrics,
                "no custody exchanges recorded in window",
                config,
            );
        }

        let score = clamp_score(
            100.0 - f64::from(facts.missed_exchanges) * config.penalties.missed_exchange,
        );
        let rate = f64::from(facts.on_time_exchanges) / f64::from(facts.total_exchanges);
        metrics.insert("on_time_rate".into(), round4(rate));
        let mut issues = Vec::new();
        if facts.missed_exchanges > 0 {
            issues.push(format!("{} missed custody exchanges", facts.missed_exchanges));
        }
        if rate < 0.9 {
            issues.push(format!("on-time exchange rate {:.0}% below 90%", rate * 100.0));
        }
        CategoryCompliance {
            category: ComplianceCategory::Schedule,
            status: config.thresholds.status_for(score),
            score,
            metrics,
            issues,
        }
    }

    fn score_communication(
        inputs: &ComplianceInputs,
        config: &ComplianceConfig,
    ) -> CategoryCompliance {
        let facts = &inputs.communication;
        let mut metrics = BTreeMap::new();
        metrics.insert("messages_total".into(), f64::from(facts.messages_total));
        metrics.insert("flagged_messages".into(), f64::from(facts.flagged_messages));

        if facts.messages_total == 0 {
            return Self::neutral(
                ComplianceCategory::Communication,
                metrics,
                "no messages recorded in window",
                config,
            );
        }

        let score = clamp_score(
            100.0 - f64::from(facts.flagged_messages) * config.penalties.flagged_message,
        );
        let mut issues = Vec::new();
        if facts.flagged_messages > 0 {
            issues.push(format!("{} flagged messages", facts.flagged_messages));
        }
        CategoryCompliance {
            category: ComplianceCategory::Communication,
            status: config.thresholds.status_for(score),
            score,
            metrics,
            issues,
        }
    }

    fn score_financial(facts: &FinancialFacts, config: &ComplianceConfig) -> CategoryCompliance {
        let mut metrics = BTreeMap::new();
        metrics.insert("obligations_considered".into(), f64::from(facts.considered));
        metrics.insert("completed_on_time".into(), f64::from(facts.completed_on_time));
        metrics.insert("completed_late".into(), f64::from(facts.completed_late));
        metrics.insert("overdue".into(), f64::from(facts.overdue));
        metrics.insert("disputed".into(), f64::from(facts.disputed));

        if facts.considered == 0 && facts.disputed == 0 {
            return Self::neutral(
                ComplianceCategory::Financial,
                metrics,
                "no financial obligations in window",
                config,
            );
        }

        let completed = facts.completed_on_time + facts.completed_late;
        if completed > 0 {
            metrics.insert(
                "on_time_completion_rate".into(),
                round4(f64::from(facts.completed_on_time) / f64::from(completed)),
            );
        }
        let score = clamp_score(
            100.0
                - f64::from(facts.overdue) * config.penalties.overdue_obligation
                - f64::from(facts.disputed) * config.penalties.disputed_item,
        );
        let mut issues = Vec::new();
        if facts.overdue > 0 {
            issues.push(format!("{} overdue obligations", facts.overdue));
        }
        if facts.disputed > 0 {
            issues.push(format!("{} disputed payments", facts.disputed));
        }
        if facts.completed_late > 0 {
            issues.push(format!("{} obligations completed late", facts.completed_late));
        }
        CategoryCompliance {
            category: ComplianceCategory::Financial,
            status: config.thresholds.status_for(score),
            score,
            metrics,
            issues,
        }
    }

    fn score_items(inputs: &ComplianceInputs, config: &ComplianceConfig) -> CategoryCompliance {
        let facts = &inputs.items;
        let mut metrics = BTreeMap::new();
        metrics.insert("exchanges_recorded".into(), f64::from(facts.exchanges_recorded));
        metrics.insert("returned_on_time".into(), f64::from(facts.returned_on_time));
        metrics.insert("disputed_items".into(), f64::from(facts.disputed_items));

        if facts.exchanges_recorded == 0 {
            return Self::neutral(
                ComplianceCategory::Item,
                metrics,
                "no item exchanges recorded in window",
                config,
            );
        }

        let score = clamp_score(
            100.0 - f64::from(facts.disputed_items) * config.penalties.disputed_item,
        );
        let mut issues = Vec::new();
        if facts.disputed_items > 0 {
            issues.push(format!("{} disputed items", facts.disputed_items));
        }
        CategoryCompliance {
            category: ComplianceCategory::Item,
            status: config.thresholds.status_for(score),
            score,
            metrics,
            issues,
        }
    }

    fn neutral(
        category: ComplianceCategory,
        metrics: BTreeMap<String, f64>,
        detail: &str,
        config: &ComplianceConfig,
    ) -> CategoryCompliance {
        CategoryCompliance {
            category,
            status: config.thresholds.status_for(config.neutral_score),
            score: config.neutral_score,
            metrics,
            issues: vec![format!("Insufficient data: {detail}")],
        }
    }
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
