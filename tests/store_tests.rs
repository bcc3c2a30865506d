use boardwatch::store::STORE_COLUMNS;
use boardwatch::{reconcile, AppError, CsvStore, ObservedListing, PersistentStore, RunStamp};
use chrono::{NaiveDate, NaiveTime};
use std::fs;
use tempfile::tempdir;

fn run_on(day: u32) -> RunStamp {
    RunStamp::new(
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        NaiveTime::from_hms_opt(14, 5, 0).unwrap(),
    )
}

#[test]
fn missing_store_loads_empty() {
    let dir = tempdir().unwrap();
    let store = CsvStore::new(dir.path().join("never_written.csv"));
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn saved_store_uses_fixed_columns_and_day_first_dates() {
    let dir = tempdir().unwrap();
    let store = CsvStore::new(dir.path().join("jobs.csv"));

    let observed = vec![ObservedListing::new("A1", "Engineer", "https://apply.example.com/acme/j/A1/")];
    let day1 = reconcile(&[], &observed, run_on(1)).unwrap();
    let mut records = reconcile(&day1.next, &[], run_on(2)).unwrap().next;
    records[0].description = Some("Line one\nLine, two".to_string());
    store.save(&records).unwrap();

    let raw = fs::read_to_string(store.path()).unwrap();
    let mut lines = raw.lines();
    assert_eq!(lines.next().unwrap(), STORE_COLUMNS.join(","));
    assert!(raw.contains("01/06/2024,14:05,A1,,02/06/2024,,Engineer,"));
    assert!(!raw.to_lowercase().contains("nan"));

    let loaded = store.load().unwrap();
    assert_eq!(loaded, records);
}

#[test]
fn empty_store_still_writes_header() {
    let dir = tempdir().unwrap();
    let store = CsvStore::new(dir.path().join("nested").join("jobs.csv"));
    store.save(&[]).unwrap();

    let raw = fs::read_to_string(store.path()).unwrap();
    assert_eq!(raw.trim_end(), STORE_COLUMNS.join(","));
    assert!(store.load().unwrap().is_empty());
    assert!(!dir.path().join("nested").join("jobs.csv.tmp").exists());
}

#[test]
fn legacy_store_without_posted_at_column_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.csv");
    fs::write(
        &path,
        "Scraping Date,Scraping Time,ID,Deleted at,Reposted at,Job Title,Workplace Type,Location,Department,Job Type,Apply Link,Description,Requirements,Benefits\n\
         03/02/2025,09:12,7F3A,,,Data Annotator,Remote,Anywhere,Ops,Contract,https://apply.example.com/acme/j/7F3A/,,,\n",
    )
    .unwrap();

    let store = CsvStore::new(&path);
    let records = store.load().unwrap();
    assert_eq!(records.len(), 1);
    let rec = &records[0];
    assert_eq!(rec.id, "7F3A");
    assert_eq!(rec.posted_at, None);
    assert_eq!(rec.description, None);
    assert!(rec.needs_enrichment());

    // Re-saving upgrades the file to the full column order
    store.save(&records).unwrap();
    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.starts_with(&STORE_COLUMNS.join(",")));
}

#[test]
fn corrupt_dates_are_store_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(
        &path,
        format!(
            "{}\n2025-02-03,09:12,7F3A,,,,Annotator,,,,,,,,\n",
            STORE_COLUMNS.join(",")
        ),
    )
    .unwrap();

    let err = CsvStore::new(&path).load().unwrap_err();
    assert!(matches!(err, AppError::StoreError(_)));
}

#[test]
fn store_without_id_column_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wrong.csv");
    fs::write(&path, "Title,Link\nEngineer,https://example.com\n").unwrap();

    let err = CsvStore::new(&path).load().unwrap_err();
    assert!(err.to_string().contains("missing the 'Scraping Date' column"));
}
