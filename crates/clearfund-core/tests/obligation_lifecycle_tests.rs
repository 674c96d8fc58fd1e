use chrono::{Duration, TimeZone, Utc};
use clearfund_core::{
    Clock, CoreError, FixedClock, LedgerService, NewObligation, ObligationService,
};
use clearfund_domain::{
    CaseFile, EntryType, Money, ObligationStatus, PageRequest, PurposeCategory,
};
use uuid::Uuid;

fn fixture() -> (CaseFile, FixedClock) {
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
    let case = CaseFile::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), clock.now());
    (case, clock)
}

fn soccer_camp(case: &CaseFile, verification_required: bool) -> NewObligation {
    NewObligation {
        title: "Soccer camp".into(),
        purpose_category: PurposeCategory::Camp,
        total_amount: Money::from_major(300),
        petitioner_share: Money::from_major(150),
        respondent_share: Money::from_major(150),
        due_date: None,
        verification_required,
        receipt_required: false,
        created_by: case.petitioner_id,
    }
}

#[test]
fn full_lifecycle_open_to_completed() {
    let (mut case, clock) = fixture();
    let petitioner = case.petitioner_id;
    let respondent = case.respondent_id;
    let input = soccer_camp(&case, true);
    let id = ObligationService::create(&mut case, input, &clock)
        .expect("create obligation");

    let first = ObligationService::fund(&mut case, id, petitioner, Money::from_major(150), None, &clock)
        .expect("first funding");
    assert_eq!(first.status, ObligationStatus::PartiallyFunded);
    let funding_entries: Vec<_> = case
        .entries
        .iter()
        .filter(|entry| entry.entry_type == EntryType::Funding)
        .collect();
    assert_eq!(funding_entries.len(), 1);
    assert_eq!(funding_entries[0].amount, Money::from_major(150));

    let second =
        ObligationService::fund(&mut case, id, respondent, Money::from_major(150), None, &clock)
            .expect("second funding");
    assert_eq!(second.status, ObligationStatus::Funded);
    assert_eq!(second.amount_funded, Money::from_major(300));

    ObligationService::verify(&mut case, id, petitioner, None, &clock).expect("verify");
    assert_eq!(case.obligation(id).unwrap().status, ObligationStatus::Verified);
    assert_eq!(
        case.obligation(id).unwrap().amount_verified,
        Money::from_major(300)
    );

    ObligationService::complete(&mut case, id, petitioner, None, None, &clock).expect("complete");
    let obligation = case.obligation(id).unwrap();
    assert_eq!(obligation.status, ObligationStatus::Completed);
    assert_eq!(obligation.amount_funded, Money::from_major(300));

    // Ledger sum for this obligation equals the total funded.
    let obligation_total = LedgerService::entries_for_obligation(&case, id)
        .iter()
        .fold(Money::ZERO, |acc, entry| acc.saturating_add(entry.amount));
    assert_eq!(obligation_total, Money::from_major(300));

    // Both parties funded their own share, so nobody owes anybody.
    assert_eq!(case.entries.last().unwrap().running_balance, Money::ZERO);
}

#[test]
fn shares_must_sum_to_total() {
    let (mut case, clock) = fixture();
    let mut input = soccer_camp(&case, false);
    input.respondent_share = Money::from_major(100);
    let err = ObligationService::create(&mut case, input, &clock).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert!(case.obligations.is_empty());
}

#[test]
fn overfunding_is_rejected_without_side_effects() {
    let (mut case, clock) = fixture();
    let petitioner = case.petitioner_id;
    let input = soccer_camp(&case, false);
    let id = ObligationService::create(&mut case, input, &clock)
        .expect("create obligation");
    ObligationService::fund(&mut case, id, petitioner, Money::from_major(250), None, &clock)
        .expect("fund within remaining");

    let entries_before = case.entries.len();
    let err =
        ObligationService::fund(&mut case, id, petitioner, Money::from_major(100), None, &clock)
            .unwrap_err();
    match err {
        CoreError::Overfund { remaining, attempted, .. } => {
            assert_eq!(remaining, Money::from_major(50));
            assert_eq!(attempted, Money::from_major(100));
        }
        other => panic!("expected overfund, got {other:?}"),
    }
    assert_eq!(case.entries.len(), entries_before);
    assert_eq!(
        case.obligation(id).unwrap().amount_funded,
        Money::from_major(250)
    );
}

#[test]
fn stale_version_is_a_concurrency_conflict() {
    let (mut case, clock) = fixture();
    let petitioner = case.petitioner_id;
    let respondent = case.respondent_id;
    let input = soccer_camp(&case, false);
    let id = ObligationService::create(&mut case, input, &clock)
        .expect("create obligation");

    // Two clients read version 0; the first transition wins.
    let outcome =
        ObligationService::fund(&mut case, id, petitioner, Money::from_major(100), Some(0), &clock)
            .expect("first client");
    assert_eq!(outcome.version, 1);

    let err =
        ObligationService::fund(&mut case, id, respondent, Money::from_major(100), Some(0), &clock)
            .unwrap_err();
    assert!(matches!(err, CoreError::ConcurrencyConflict { expected: 0, found: 1, .. }));

    // The losing client re-reads and retries successfully.
    ObligationService::fund(&mut case, id, respondent, Money::from_major(100), Some(1), &clock)
        .expect("retry with fresh version");
    assert_eq!(
        case.obligation(id).unwrap().amount_funded,
        Money::from_major(200)
    );
}

#[test]
fn terminal_states_absorb_all_transitions() {
    let (mut case, clock) = fixture();
    let petitioner = case.petitioner_id;
    let input = soccer_camp(&case, false);
    let id = ObligationService::create(&mut case, input, &clock)
        .expect("create obligation");
    ObligationService::cancel(&mut case, id, petitioner, "duplicate entry", None, &clock)
        .expect("cancel");

    let fund_err =
        ObligationService::fund(&mut case, id, petitioner, Money::from_major(10), None, &clock)
            .unwrap_err();
    assert!(matches!(fund_err, CoreError::InvalidTransition { .. }));
    let cancel_err =
        ObligationService::cancel(&mut case, id, petitioner, "again", None, &clock).unwrap_err();
    assert!(matches!(cancel_err, CoreError::InvalidTransition { .. }));
    let complete_err =
        ObligationService::complete(&mut case, id, petitioner, None, None, &clock).unwrap_err();
    assert!(matches!(complete_err, CoreError::InvalidTransition { .. }));
}

#[test]
fn cancellation_is_audited_not_ledgered() {
    let (mut case, clock) = fixture();
    let respondent = case.respondent_id;
    let input = soccer_camp(&case, false);
    let id = ObligationService::create(&mut case, input, &clock)
        .expect("create obligation");
    ObligationService::cancel(&mut case, id, respondent, "camp was called off", None, &clock)
        .expect("cancel");

    assert!(case.entries.is_empty(), "cancellation moves no money");
    let event = case
        .audit_log
        .iter()
        .find(|event| event.obligation_id == Some(id))
        .expect("audit event recorded");
    assert_eq!(event.actor, Some(respondent));
    assert_eq!(event.note.as_deref(), Some("camp was called off"));
}

#[test]
fn verification_not_required_skips_verified_state() {
    let (mut case, clock) = fixture();
    let petitioner = case.petitioner_id;
    let input = soccer_camp(&case, false);
    let id = ObligationService::create(&mut case, input, &clock)
        .expect("create obligation");
    ObligationService::fund(&mut case, id, petitioner, Money::from_major(300), None, &clock)
        .expect("fund in full");

    let verify_err =
        ObligationService::verify(&mut case, id, petitioner, None, &clock).unwrap_err();
    assert!(matches!(verify_err, CoreError::InvalidTransition { .. }));

    ObligationService::complete(&mut case, id, petitioner, None, None, &clock)
        .expect("complete directly from funded");
    assert_eq!(case.obligation(id).unwrap().status, ObligationStatus::Completed);
}

#[test]
fn receipt_required_blocks_completion_until_attached() {
    let (mut case, clock) = fixture();
    let petitioner = case.petitioner_id;
    let mut input = soccer_camp(&case, false);
    input.receipt_required = true;
    let id = ObligationService::create(&mut case, input, &clock).expect("create obligation");
    ObligationService::fund(&mut case, id, petitioner, Money::from_major(300), None, &clock)
        .expect("fund in full");

    let err = ObligationService::complete(&mut case, id, petitioner, None, None, &clock)
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    ObligationService::complete(
        &mut case,
        id,
        petitioner,
        Some("receipt-0042".into()),
        None,
        &clock,
    )
    .expect("complete with receipt");
    assert_eq!(
        case.obligation(id).unwrap().receipt_reference.as_deref(),
        Some("receipt-0042")
    );
}

#[test]
fn funding_is_monotonic_across_lifecycle() {
    let (mut case, clock) = fixture();
    let petitioner = case.petitioner_id;
    let respondent = case.respondent_id;
    let input = soccer_camp(&case, false);
    let id = ObligationService::create(&mut case, input, &clock)
        .expect("create obligation");

    let mut last = Money::ZERO;
    for (funder, amount) in [
        (petitioner, 40),
        (respondent, 60),
        (petitioner, 110),
        (respondent, 90),
    ] {
        let outcome =
            ObligationService::fund(&mut case, id, funder, Money::from_major(amount), None, &clock)
                .expect("fund");
        assert!(outcome.amount_funded > last, "funded amount must grow");
        last = outcome.amount_funded;
    }
    assert_eq!(last, Money::from_major(300));
    let obligation = case.obligation(id).unwrap();
    assert_eq!(obligation.funded_by_petitioner, Money::from_major(150));
    assert_eq!(obligation.funded_by_respondent, Money::from_major(150));
}

#[test]
fn overdue_is_computed_from_due_date() {
    let (mut case, clock) = fixture();
    let mut input = soccer_camp(&case, false);
    input.due_date = Some(clock.today() - Duration::days(3));
    let id = ObligationService::create(&mut case, input, &clock).expect("create obligation");

    let listed = ObligationService::list_by_case(&case, PageRequest::default());
    assert_eq!(listed.total, 1);
    assert!(case.obligation(id).unwrap().is_overdue(clock.today()));
}
