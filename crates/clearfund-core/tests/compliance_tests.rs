use chrono::{Duration, TimeZone, Utc};
use clearfund_core::{Clock, ComplianceService, FixedClock, NewObligation, ObligationService};
use clearfund_domain::{
    CaseFile, CommunicationFacts, ComplianceConfig, ComplianceInputs, ComplianceStatus,
    DateWindow, Money, PurposeCategory, ScheduleFacts,
};
use uuid::Uuid;

fn fixture() -> (CaseFile, FixedClock) {
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap());
    let case = CaseFile::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), clock.now());
    (case, clock)
}

fn window(clock: &FixedClock, days: i64) -> DateWindow {
    DateWindow::trailing(clock.today(), days)
}

fn obligation(case: &CaseFile, title: &str, due_in_days: i64, clock: &FixedClock) -> NewObligation {
    NewObligation {
        title: title.into(),
        purpose_category: PurposeCategory::Medical,
        total_amount: Money::from_major(100),
        petitioner_share: Money::from_major(50),
        respondent_share: Money::from_major(50),
        due_date: Some(clock.today() + Duration::days(due_in_days)),
        verification_required: false,
        receipt_required: false,
        created_by: case.petitioner_id,
    }
}

#[test]
fn empty_case_scores_neutral_green_with_insufficient_data_issues() {
    let (case, clock) = fixture();
    let snapshot = ComplianceService::snapshot(
        &case,
        &ComplianceInputs::default(),
        window(&clock, 30),
        &ComplianceConfig::default(),
        clock.now(),
    )
    .expect("snapshot");

    assert_eq!(snapshot.overall_status, ComplianceStatus::Green);
    for category in snapshot.categories() {
        assert_eq!(category.score, 100.0);
        assert!(
            category.issues.iter().any(|i| i.starts_with("Insufficient data")),
            "{} should flag missing data",
            category.category
        );
    }
}

#[test]
fn overdue_obligations_push_financial_category_down() {
    let (mut case, clock) = fixture();
    for i in 0..3 {
        let input = obligation(&case, &format!("copay {i}"), -5 - i, &clock);
        ObligationService::create(&mut case, input, &clock).expect("create");
    }

    let snapshot = ComplianceService::snapshot(
        &case,
        &ComplianceInputs::default(),
        window(&clock, 30),
        &ComplianceConfig::default(),
        clock.now(),
    )
    .expect("snapshot");

    assert_eq!(snapshot.overdue_obligations, 3);
    // 100 - 3 * 15 with the default penalty.
    assert_eq!(snapshot.financial.score, 55.0);
    assert_eq!(snapshot.financial.status, ComplianceStatus::Red);
    assert!(snapshot
        .financial
        .issues
        .iter()
        .any(|i| i.contains("3 overdue")));
}

#[test]
fn completed_on_time_obligation_keeps_financial_green() {
    let (mut case, clock) = fixture();
    let petitioner = case.petitioner_id;
    let input = obligation(&case, "therapy", 2, &clock);
    let id = ObligationService::create(&mut case, input, &clock).expect("create");
    ObligationService::fund(&mut case, id, petitioner, Money::from_major(100), None, &clock)
        .expect("fund");
    ObligationService::complete(&mut case, id, petitioner, None, None, &clock).expect("complete");

    let snapshot = ComplianceService::snapshot(
        &case,
        &ComplianceInputs::default(),
        window(&clock, 30),
        &ComplianceConfig::default(),
        clock.now(),
    )
    .expect("snapshot");
    assert_eq!(snapshot.financial.score, 100.0);
    assert_eq!(
        snapshot.financial.metrics.get("completed_on_time"),
        Some(&1.0)
    );
}

#[test]
fn overall_score_respects_configured_weights() {
    let (case, clock) = fixture();
    let inputs = ComplianceInputs {
        schedule: ScheduleFacts {
            days_monitored: 30,
            total_exchanges: 10,
            on_time_exchanges: 5,
            missed_exchanges: 5,
        },
        communication: CommunicationFacts {
            messages_total: 40,
            flagged_messages: 2,
        },
        ..ComplianceInputs::default()
    };
    let config = ComplianceConfig::default();
    let snapshot = ComplianceService::snapshot(
        &case,
        &inputs,
        window(&clock, 30),
        &config,
        clock.now(),
    )
    .expect("snapshot");

    // schedule 50 * 0.3 + communication 90 * 0.2 + financial 100 * 0.3 +
    // item 100 * 0.2 = 83.
    assert_eq!(snapshot.schedule.score, 50.0);
    assert_eq!(snapshot.communication.score, 90.0);
    assert_eq!(snapshot.overall_score, 83.0);
    assert_eq!(snapshot.overall_status, ComplianceStatus::Amber);
}

#[test]
fn invalid_weights_are_rejected_up_front() {
    let (case, clock) = fixture();
    let mut config = ComplianceConfig::default();
    config.weights.item = 0.9;
    let err = ComplianceService::snapshot(
        &case,
        &ComplianceInputs::default(),
        window(&clock, 30),
        &config,
        clock.now(),
    )
    .unwrap_err();
    assert!(matches!(err, clearfund_core::CoreError::Validation(_)));
}

#[test]
fn snapshot_for_days_defaults_to_configured_window() {
    let (case, clock) = fixture();
    let config = ComplianceConfig::default();
    let snapshot = ComplianceService::snapshot_for_days(
        &case,
        &ComplianceInputs::default(),
        None,
        &config,
        &clock,
    )
    .expect("snapshot");
    assert_eq!(snapshot.window.days(), config.snapshot_window_days);
    assert_eq!(snapshot.window.end, clock.today());

    let week = ComplianceService::snapshot_for_days(
        &case,
        &ComplianceInputs::default(),
        Some(7),
        &config,
        &clock,
    )
    .expect("weekly snapshot");
    assert_eq!(week.window.days(), 7);
}

#[test]
fn identical_inputs_yield_byte_identical_snapshots() {
    let (mut case, clock) = fixture();
    let input = obligation(&case, "copay", -2, &clock);
    ObligationService::create(&mut case, input, &clock).expect("create");
    let inputs = ComplianceInputs {
        communication: CommunicationFacts {
            messages_total: 12,
            flagged_messages: 1,
        },
        ..ComplianceInputs::default()
    };

    let render = |case: &CaseFile| {
        let snapshot = ComplianceService::snapshot(
            case,
            &inputs,
            window(&clock, 30),
            &ComplianceConfig::default(),
            clock.now(),
        )
        .expect("snapshot");
        serde_json::to_string(&snapshot).expect("serialize")
    };
    assert_eq!(render(&case), render(&case));
}
