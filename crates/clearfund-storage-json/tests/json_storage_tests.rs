use chrono::Utc;
use clearfund_core::storage::CaseStorage;
use clearfund_core::{CoreError, FixedClock, LedgerService};
use clearfund_domain::{CaseFile, EntryDraft, EntryType, Money};
use clearfund_storage_json::JsonCaseStorage;
use tempfile::tempdir;
use uuid::Uuid;

fn sample_case() -> CaseFile {
    CaseFile::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Utc::now())
}

#[test]
fn save_and_load_roundtrip_preserves_ledger() {
    let dir = tempdir().expect("tempdir");
    let storage = JsonCaseStorage::new(dir.path().join("cases"), dir.path().join("backups"))
        .expect("create storage");

    let mut case = sample_case();
    let clock = FixedClock(Utc::now());
    let petitioner = case.petitioner_id;
    let respondent = case.respondent_id;
    LedgerService::append(
        &mut case,
        EntryDraft::new(
            EntryType::Obligation,
            respondent,
            petitioner,
            Money::from_major(250),
            "June child support",
            clock.0.date_naive(),
        ),
        &clock,
    )
    .expect("append entry");

    storage.save_case("smith-v-smith", &case).expect("save case");
    let loaded = storage.load_case("smith-v-smith").expect("load case");

    assert_eq!(loaded, case);
    assert_eq!(loaded.entries[0].running_balance, Money::from_major(-250));
    let path = storage.case_path("smith-v-smith");
    assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("json"));
    assert!(path.exists());
}

#[test]
fn missing_case_is_a_typed_error() {
    let dir = tempdir().expect("tempdir");
    let storage = JsonCaseStorage::new(dir.path().join("cases"), dir.path().join("backups"))
        .expect("create storage");
    let err = storage.load_case("nope").expect_err("missing case");
    assert!(matches!(err, CoreError::CaseNotFound(_)));
}

#[test]
fn list_cases_returns_sorted_slugs() {
    let dir = tempdir().expect("tempdir");
    let storage = JsonCaseStorage::new(dir.path().join("cases"), dir.path().join("backups"))
        .expect("create storage");
    storage.save_case("Beta Case", &sample_case()).expect("save");
    storage.save_case("alpha case", &sample_case()).expect("save");

    let names = storage.list_cases().expect("list");
    assert_eq!(names, vec!["alpha_case".to_string(), "beta_case".to_string()]);
}

#[test]
fn backups_can_be_created_and_restored() {
    let dir = tempdir().expect("tempdir");
    let storage = JsonCaseStorage::new(dir.path().join("cases"), dir.path().join("backups"))
        .expect("create storage");

    let case = sample_case();
    storage.save_case("backup-case", &case).expect("save case");
    let info = storage
        .backup_case("backup-case", &case, Some("Quarter Close"))
        .expect("create backup");

    let backups = storage.list_backups("backup-case").expect("list backups");
    assert!(
        backups.iter().any(|entry| entry.id == info.id),
        "backup list should include the created backup"
    );
    assert!(info.id.contains("quarter-close"));

    let restored = storage.restore_backup(&info).expect("restore backup");
    assert_eq!(restored.case_id, case.case_id);
}

#[test]
fn retention_prunes_oldest_backups() {
    let dir = tempdir().expect("tempdir");
    let storage = JsonCaseStorage::with_retention(
        dir.path().join("cases"),
        dir.path().join("backups"),
        2,
    )
    .expect("create storage");

    let case = sample_case();
    storage.save_case("prune-case", &case).expect("save");
    for note in ["one", "two", "three"] {
        storage
            .backup_case("prune-case", &case, Some(note))
            .expect("backup");
    }
    let backups = storage.list_backups("prune-case").expect("list");
    assert!(backups.len() <= 2, "expected pruning to retention, got {}", backups.len());
}

#[test]
fn frozen_flag_survives_roundtrip() {
    let dir = tempdir().expect("tempdir");
    let storage = JsonCaseStorage::new(dir.path().join("cases"), dir.path().join("backups"))
        .expect("create storage");

    let mut case = sample_case();
    case.writes_frozen = true;
    storage.save_case("frozen", &case).expect("save");
    let loaded = storage.load_case("frozen").expect("load");
    assert!(loaded.writes_frozen);

    let metadata = storage.list_case_metadata().expect("metadata");
    assert!(metadata[0].writes_frozen);
}
