use chrono::{TimeZone, Utc};
use clearfund_core::{
    CaseManager, Clock, CoreError, FixedClock, LedgerService, NewObligation, ObligationService,
    ReportRequest, ReportService,
};
use clearfund_domain::{
    CaseFile, ComplianceConfig, ComplianceInputs, EntryDraft, EntryType, Money, PurposeCategory,
    ReportPolicy, ReportSection, ReportType,
};
use clearfund_storage_json::JsonCaseStorage;
use tempfile::tempdir;
use uuid::Uuid;

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap())
}

fn storage(dir: &std::path::Path) -> JsonCaseStorage {
    JsonCaseStorage::new(dir.join("cases"), dir.join("backups")).expect("create storage")
}

#[test]
fn save_and_load_named_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let mut manager = CaseManager::new(Box::new(storage(temp.path())));

    let case = CaseFile::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), clock().now());
    manager.set_current(case, None);
    manager.save_as("demo-case").expect("save case");

    manager.clear();
    manager.load("demo-case").expect("load case");
    assert_eq!(manager.current_name(), Some("demo-case"));
    assert!(manager.current().is_some());
}

#[test]
fn reconcile_all_flags_and_freezes_tampered_case() {
    let temp = tempdir().expect("tempdir");
    let clock = clock();
    let manager = CaseManager::new(Box::new(storage(temp.path())));

    let mut clean = CaseFile::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), clock.now());
    let (p, r) = (clean.petitioner_id, clean.respondent_id);
    LedgerService::append(
        &mut clean,
        EntryDraft::new(
            EntryType::Obligation,
            r,
            p,
            Money::from_major(100),
            "support",
            clock.today(),
        ),
        &clock,
    )
    .expect("append");
    manager.storage().save_case("clean", &clean).expect("save clean");

    let mut tampered = clean.clone();
    tampered.case_id = Uuid::new_v4();
    tampered.entries[0].running_balance = Money::from_major(999);
    manager
        .storage()
        .save_case("tampered", &tampered)
        .expect("save tampered");

    let findings = manager.reconcile_all(&clock).expect("sweep runs");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].case_name, "tampered");

    let reloaded = manager.storage().load_case("tampered").expect("reload");
    assert!(reloaded.writes_frozen);
    let clean_reloaded = manager.storage().load_case("clean").expect("reload clean");
    assert!(!clean_reloaded.writes_frozen);
    assert!(clean_reloaded.entries[0].is_reconciled);
}

#[test]
fn verify_report_number_searches_all_cases() {
    let temp = tempdir().expect("tempdir");
    let clock = clock();
    let manager = CaseManager::new(Box::new(storage(temp.path())));

    let mut case = CaseFile::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), clock.now());
    let petitioner = case.petitioner_id;
    ObligationService::create(
        &mut case,
        NewObligation {
            title: "Soccer camp".into(),
            purpose_category: PurposeCategory::Camp,
            total_amount: Money::from_major(300),
            petitioner_share: Money::from_major(150),
            respondent_share: Money::from_major(150),
            due_date: Some(clock.today()),
            verification_required: false,
            receipt_required: false,
            created_by: petitioner,
        },
        &clock,
    )
    .expect("create obligation");
    let artifact = ReportService::generate(
        &mut case,
        ReportRequest {
            report_type: ReportType::FinancialStatement,
            title: None,
            date_range_start: clock.today(),
            date_range_end: clock.today(),
            sections: vec![ReportSection::BalanceSummary, ReportSection::Obligations],
            generated_by: petitioner,
            purpose: None,
        },
        &ComplianceInputs::default(),
        &ComplianceConfig::default(),
        &ReportPolicy::default(),
        &clock,
    )
    .expect("generate report");
    manager.storage().save_case("with-report", &case).expect("save");

    let found = manager
        .verify_report_number(&artifact.report.report_number)
        .expect("verify");
    assert!(found.is_valid);
    assert_eq!(found.content_hash.as_deref(), Some(artifact.report.content_hash.as_str()));

    let missing = manager
        .verify_report_number("CF-19990101-XXXXXX")
        .expect("verify unknown");
    assert!(!missing.is_valid);
}

#[test]
fn loading_future_schema_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let mut manager = CaseManager::new(Box::new(storage(temp.path())));

    let mut case = CaseFile::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), clock().now());
    case.schema_version = clearfund_domain::CURRENT_SCHEMA_VERSION + 3;
    manager.storage().save_case("future", &case).expect("save");

    let err = manager.load("future").expect_err("future schema should fail");
    match err {
        CoreError::Storage(message) => assert!(message.contains("newer"), "unexpected: {message}"),
        other => panic!("expected storage error, got {other:?}"),
    }
}
