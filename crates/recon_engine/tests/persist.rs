use std::fs;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use recon_engine::{
    aggregate, publish_report, BlobStore, CrawlAccumulator, FsBlobStore, JsonlRecordSink,
    KeywordTaxonomy, PersistError, RecordSink, ReportContext, REPORT_KEY,
};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn jsonl_sink_appends_one_line_per_record() {
    let dir = tempdir().expect("tempdir");
    let mut sink = JsonlRecordSink::new(dir.path().join("runs").join("reports.jsonl"));

    sink.append(&json!({"run": 1})).expect("first");
    sink.append(&json!({"run": 2, "note": "line\nbreak"})).expect("second");

    let content = fs::read_to_string(sink.path()).expect("read");
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines, vec![json!({"run": 1}), json!({"run": 2, "note": "line\nbreak"})]);
}

#[test]
fn blob_store_replaces_existing_blobs() {
    let dir = tempdir().expect("tempdir");
    let store = FsBlobStore::new(dir.path());

    let first = store.put("screenshots/a.png", b"one").expect("put");
    let second = store.put("screenshots/a.png", b"two").expect("put again");

    assert_eq!(first, second);
    assert_eq!(first, dir.path().join("screenshots").join("a.png"));
    assert_eq!(fs::read(&first).expect("read"), b"two");
    let entries = fs::read_dir(dir.path().join("screenshots")).expect("dir").count();
    assert_eq!(entries, 1);
}

#[test]
fn blob_store_rejects_escaping_keys() {
    let dir = tempdir().expect("tempdir");
    let store = FsBlobStore::new(dir.path().join("blobs"));

    let err = store.put("../outside.txt", b"x").expect_err("rejected");
    assert!(matches!(err, PersistError::InvalidKey(_)));
    assert!(!dir.path().join("outside.txt").exists());
}

#[test]
fn blob_store_reports_file_in_place_of_directory() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("occupied");
    fs::write(&root, "not a directory").expect("write");
    let store = FsBlobStore::new(&root);

    let err = store.put("report.json", b"{}").expect_err("rejected");
    assert!(matches!(err, PersistError::OutputDir(_)));
}

#[test]
fn publish_report_writes_record_and_formatted_blob() {
    let dir = tempdir().expect("tempdir");
    let mut sink = JsonlRecordSink::new(dir.path().join("reports.jsonl"));
    let store = FsBlobStore::new(dir.path().join("blobs"));
    let context = ReportContext {
        platform: "Shrimp Intel".to_string(),
        url: "https://intel.example.com".to_string(),
        authenticated: false,
        credentials_present: false,
        analysis_date: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).single().expect("time"),
    };
    let report = aggregate(&context, &CrawlAccumulator::default(), &KeywordTaxonomy::builtin());

    let location = publish_report(&report, &mut sink, &store).expect("publish");

    assert_eq!(location, dir.path().join("blobs").join(REPORT_KEY));
    let blob = fs::read_to_string(&location).expect("blob");
    assert!(blob.contains("\n  \"platform\": \"Shrimp Intel\""));
    let record: serde_json::Value =
        serde_json::from_str(fs::read_to_string(sink.path()).expect("sink").trim()).expect("record");
    assert_eq!(record, serde_json::from_str::<serde_json::Value>(&blob).expect("blob json"));
    assert_eq!(record["dataSources"]["total"], 0);
}
