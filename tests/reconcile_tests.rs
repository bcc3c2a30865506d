use boardwatch::{reconcile, AppError, LifecycleState, ListingChange, ListingRecord, ObservedListing, RunStamp};
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashSet;
use std::sync::Once;

// For initializing tracing once
static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

fn run_on(day: u32) -> RunStamp {
    RunStamp::new(
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        NaiveTime::from_hms_opt(8, 15, 0).unwrap(),
    )
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

fn listing(id: &str, title: &str) -> ObservedListing {
    ObservedListing {
        id: id.to_string(),
        title: title.to_string(),
        workplace_type: "Remote".to_string(),
        location: "Berlin, Germany".to_string(),
        department: "Engineering".to_string(),
        job_type: "Full time".to_string(),
        apply_link: format!("https://apply.example.com/acme/j/{}/", id),
    }
}

fn find<'a>(records: &'a [ListingRecord], id: &str) -> &'a ListingRecord {
    records.iter().find(|r| r.id == id).expect("record present")
}

#[test]
fn scenario_fresh_store_gains_active_record() {
    setup();
    let result = reconcile(&[], &[listing("A1", "Engineer")], run_on(1)).unwrap();

    assert_eq!(result.next.len(), 1);
    let rec = &result.next[0];
    assert_eq!(rec.id, "A1");
    assert_eq!(rec.title, "Engineer");
    assert_eq!(rec.first_seen_date, date(1));
    assert_eq!(rec.first_seen_time, NaiveTime::from_hms_opt(8, 15, 0).unwrap());
    assert_eq!(rec.deleted_at, None);
    assert_eq!(rec.reposted_at, None);
    assert_eq!(rec.state(), LifecycleState::Active);

    assert_eq!(result.summary.created, 1);
    assert_eq!(result.summary.changes, vec![ListingChange::Created { id: "A1".into() }]);
}

#[test]
fn scenario_delete_repost_delete_cycle() {
    setup();
    let observed = vec![listing("A1", "Engineer")];

    let day1 = reconcile(&[], &observed, run_on(1)).unwrap();

    // Scenario 2: absent on 02/06
    let day2 = reconcile(&day1.next, &[], run_on(2)).unwrap();
    let rec = find(&day2.next, "A1");
    assert_eq!(rec.deleted_at, Some(date(2)));
    assert_eq!(rec.reposted_at, None);
    assert_eq!(rec.state(), LifecycleState::Deleted);
    assert_eq!(day2.summary.deleted, 1);

    // Scenario 3: back on 05/06
    let day5 = reconcile(&day2.next, &observed, run_on(5)).unwrap();
    let rec = find(&day5.next, "A1");
    assert_eq!(rec.reposted_at, Some(date(5)));
    assert_eq!(rec.deleted_at, Some(date(2)));
    assert!(rec.is_reposted());
    assert_eq!(day5.summary.reposted, 1);

    // Scenario 4: gone again on 10/06
    let day10 = reconcile(&day5.next, &[], run_on(10)).unwrap();
    let rec = find(&day10.next, "A1");
    assert_eq!(rec.deleted_at, Some(date(10)));
    assert_eq!(rec.reposted_at, Some(date(5)));
    assert_eq!(rec.state(), LifecycleState::Deleted);

    // first-seen timestamp never moves
    assert_eq!(rec.first_seen_date, date(1));
}

#[test]
fn deleted_listing_is_not_deleted_again_while_missing() {
    setup();
    let day1 = reconcile(&[], &[listing("A1", "Engineer")], run_on(1)).unwrap();
    let day2 = reconcile(&day1.next, &[], run_on(2)).unwrap();
    let day3 = reconcile(&day2.next, &[], run_on(3)).unwrap();

    assert_eq!(find(&day3.next, "A1").deleted_at, Some(date(2)));
    assert_eq!(day3.summary.deleted, 0);
    assert_eq!(day3.summary.still_missing, 1);
}

#[test]
fn reconcile_is_idempotent_for_same_snapshot_and_date() {
    setup();
    let prior = reconcile(
        &[],
        &[listing("A1", "Engineer"), listing("B2", "Designer"), listing("C3", "Analyst")],
        run_on(1),
    )
    .unwrap()
    .next;
    let prior = reconcile(&prior, &[listing("A1", "Engineer")], run_on(2)).unwrap().next;

    let observed = vec![
        listing("A1", "Senior Engineer"),
        listing("B2", "Designer"),
        listing("D4", "Recruiter"),
    ];
    let once = reconcile(&prior, &observed, run_on(4)).unwrap();
    let twice = reconcile(&once.next, &observed, run_on(4)).unwrap();

    assert_eq!(twice.next, once.next);
    assert_eq!(twice.summary.transitions(), 0);
    assert!(twice.summary.is_noop());
    assert_eq!(twice.summary.unchanged, 3);
    assert_eq!(twice.summary.still_missing, 1);
}

#[test]
fn store_grows_monotonically_and_loses_nothing() {
    setup();
    let prior = reconcile(&[], &[listing("A1", "Engineer"), listing("B2", "Designer")], run_on(1))
        .unwrap()
        .next;

    // no new ids: equal size
    let same = reconcile(&prior, &[listing("B2", "Designer")], run_on(2)).unwrap();
    assert_eq!(same.next.len(), prior.len());

    // new ids: strictly larger, by exactly the number of new ids
    let grown = reconcile(
        &prior,
        &[listing("C3", "Analyst"), listing("D4", "Recruiter")],
        run_on(2),
    )
    .unwrap();
    assert_eq!(grown.next.len(), prior.len() + 2);

    let ids: HashSet<&str> = grown.next.iter().map(|r| r.id.as_str()).collect();
    for rec in &prior {
        assert!(ids.contains(rec.id.as_str()), "{} was dropped", rec.id);
    }
    // prior rows keep their positions
    assert_eq!(grown.next[0].id, "A1");
    assert_eq!(grown.next[1].id, "B2");
}

#[test]
fn no_record_is_deleted_and_reposted_in_one_call() {
    setup();
    let day1 = reconcile(&[], &[listing("A1", "Engineer"), listing("B2", "Designer")], run_on(1)).unwrap();
    let day2 = reconcile(&day1.next, &[listing("B2", "Designer")], run_on(2)).unwrap();
    let day3 = reconcile(&day2.next, &[listing("A1", "Engineer")], run_on(3)).unwrap();

    for rec in &day3.next {
        let both = rec.deleted_at == Some(date(3)) && rec.reposted_at == Some(date(3));
        assert!(!both, "{} transitioned twice", rec.id);
    }
    assert_eq!(find(&day3.next, "A1").reposted_at, Some(date(3)));
    assert_eq!(find(&day3.next, "B2").deleted_at, Some(date(3)));
}

#[test]
fn descriptive_fields_follow_the_board() {
    setup();
    let day1 = reconcile(&[], &[listing("A1", "Engineer")], run_on(1)).unwrap();
    let mut moved = listing("A1", "Staff Engineer");
    moved.location = "Remote, EU".to_string();
    moved.apply_link = "https://apply.example.com/acme/j/A1-new/".to_string();

    let day2 = reconcile(&day1.next, &[moved.clone()], run_on(2)).unwrap();
    let rec = find(&day2.next, "A1");
    assert_eq!(rec.title, "Staff Engineer");
    assert_eq!(rec.location, "Remote, EU");
    assert_eq!(rec.apply_link, moved.apply_link);
    assert_eq!(rec.first_seen_date, date(1));
    assert_eq!(day2.summary.refreshed, 1);
    assert_eq!(day2.summary.transitions(), 0);
}

#[test]
fn enrichment_fields_survive_reconciliation() {
    setup();
    let mut prior = reconcile(&[], &[listing("A1", "Engineer")], run_on(1)).unwrap().next;
    prior[0].description = Some("Build things".to_string());
    prior[0].posted_at = Some(date(1));

    let gone = reconcile(&prior, &[], run_on(2)).unwrap();
    let back = reconcile(&gone.next, &[listing("A1", "Engineer II")], run_on(3)).unwrap();
    let rec = find(&back.next, "A1");
    assert_eq!(rec.description.as_deref(), Some("Build things"));
    assert_eq!(rec.posted_at, Some(date(1)));
}

#[test]
fn duplicate_observed_ids_keep_first_occurrence() {
    setup();
    let observed = vec![
        listing("A1", "Engineer"),
        listing("B2", "Designer"),
        listing("A1", "Impostor"),
    ];
    let result = reconcile(&[], &observed, run_on(1)).unwrap();

    assert_eq!(result.next.len(), 2);
    assert_eq!(find(&result.next, "A1").title, "Engineer");
    assert_eq!(result.summary.duplicate_ids, vec!["A1".to_string()]);
    assert!(!result.summary.warnings.is_empty());
    assert!(result.summary.to_string().contains("duplicate ids: A1"));
}

#[test]
fn duplicate_ids_in_store_abort_the_run() {
    setup();
    let mut prior = reconcile(&[], &[listing("A1", "Engineer")], run_on(1)).unwrap().next;
    prior.push(prior[0].clone());

    let err = reconcile(&prior, &[listing("A1", "Engineer")], run_on(2)).unwrap_err();
    assert!(matches!(err, AppError::InvariantViolation(_)));
    assert!(err.is_fatal());
}

#[test]
fn same_day_repost_then_vanish_waits_for_next_day() {
    setup();
    let day1 = reconcile(&[], &[listing("A1", "Engineer")], run_on(1)).unwrap();
    let gone = reconcile(&day1.next, &[], run_on(2)).unwrap();

    // Back later the same day, then gone again within that day
    let back = reconcile(&gone.next, &[listing("A1", "Engineer")], run_on(2)).unwrap();
    let rec = find(&back.next, "A1");
    assert_eq!(rec.reposted_at, Some(date(2)));
    assert_eq!(rec.state(), LifecycleState::Active);

    let vanished = reconcile(&back.next, &[], run_on(2)).unwrap();
    assert_eq!(vanished.summary.deleted, 0);
    assert_eq!(vanished.next, back.next);

    let next_day = reconcile(&vanished.next, &[], run_on(3)).unwrap();
    assert_eq!(find(&next_day.next, "A1").deleted_at, Some(date(3)));
    assert_eq!(next_day.summary.deleted, 1);
}

#[test]
fn repost_after_older_deletion_then_vanish_same_day_is_deleted_once() {
    setup();
    let day1 = reconcile(&[], &[listing("A1", "Engineer")], run_on(1)).unwrap();
    let gone = reconcile(&day1.next, &[], run_on(2)).unwrap();
    assert_eq!(find(&gone.next, "A1").deleted_at, Some(date(2)));

    let back = reconcile(&gone.next, &[listing("A1", "Engineer")], run_on(5)).unwrap();
    assert_eq!(back.summary.reposted, 1);

    // Second run on day 5 no longer sees it
    let vanished = reconcile(&back.next, &[], run_on(5)).unwrap();
    let rec = find(&vanished.next, "A1");
    assert_eq!(rec.deleted_at, Some(date(2)));
    assert_eq!(rec.reposted_at, Some(date(5)));
    assert_eq!(rec.state(), LifecycleState::Active);
    assert_eq!(vanished.summary.deleted, 0);
    assert_eq!(vanished.summary.still_missing, 1);

    let next_day = reconcile(&vanished.next, &[], run_on(6)).unwrap();
    let rec = find(&next_day.next, "A1");
    assert_eq!(rec.deleted_at, Some(date(6)));
    assert_eq!(rec.state(), LifecycleState::Deleted);
    assert_eq!(next_day.summary.deleted, 1);

    let day7 = reconcile(&next_day.next, &[], run_on(7)).unwrap();
    assert_eq!(day7.summary.deleted, 0);
    assert_eq!(day7.next, next_day.next);
}

#[test]
fn changes_are_reported_in_ascending_id_order() {
    setup();
    let prior = reconcile(&[], &[listing("M5", "Ops"), listing("Z9", "Legal")], run_on(1))
        .unwrap()
        .next;
    let result = reconcile(
        &prior,
        &[listing("Z9", "Legal"), listing("C3", "Analyst"), listing("A1", "Engineer")],
        run_on(2),
    )
    .unwrap();

    let ids: Vec<&str> = result.summary.changes.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["A1", "C3", "M5"]);
    assert_eq!(result.summary.created, 2);
    assert_eq!(result.summary.deleted, 1);
    assert_eq!(result.summary.unchanged, 1);
}
