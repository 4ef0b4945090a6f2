//! Tests for aggregation buckets: the recomputed-total invariant, description
//! set semantics, and per-record error isolation.

use chrono::NaiveDate;

use crate::aggregate::{aggregate, AggregatedEntry, TimeEntryRecord};
use crate::errors::TranscribeError;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

fn record(project: &str, day: u32, hours: f64, description: &str) -> TimeEntryRecord {
    TimeEntryRecord {
        client: "Acme".to_string(),
        project: project.to_string(),
        work_type: "Development".to_string(),
        description: description.to_string(),
        // January 2026: the 5th is a Monday.
        date: Some(date(2026, 1, day)),
        hours,
        billable: true,
    }
}

#[test]
fn total_hours_is_always_the_slot_sum() {
    let mut entry = AggregatedEntry::new("Acme", "Website", "Development", true);
    entry
        .fold(&record("Website", 5, 3.0, "build"))
        .expect("record has a date");
    entry
        .fold(&record("Website", 7, 2.5, "review"))
        .expect("record has a date");

    assert_eq!(entry.hours_by_day[0], 3.0); // Monday
    assert_eq!(entry.hours_by_day[2], 2.5); // Wednesday
    assert_eq!(entry.total_hours, entry.hours_by_day.iter().sum::<f64>());
    assert_eq!(entry.total_hours, 5.5);
}

#[test]
fn refolding_doubles_hours_but_not_descriptions() {
    let mut entry = AggregatedEntry::new("Acme", "Website", "Development", true);
    let rec = record("Website", 5, 3.0, "build");
    entry.fold(&rec).expect("record has a date");
    entry.fold(&rec).expect("record has a date");

    // Hours are additive, not deduplicated.
    assert_eq!(entry.hours_by_day[0], 6.0);
    assert_eq!(entry.total_hours, 6.0);
    // Descriptions merge with set semantics.
    assert_eq!(entry.descriptions, vec!["build".to_string()]);
}

#[test]
fn records_group_by_client_project_work_type() {
    let mut other_client = record("Website", 6, 1.0, "");
    other_client.client = String::new();

    let records = vec![
        record("Website", 5, 3.0, "build"),
        record("Website", 6, 2.0, "more build"),
        other_client,
    ];
    let (entries, diagnostics) = aggregate(&records);
    assert!(diagnostics.is_empty());

    // A missing client is a distinct key component, not a merge.
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].client, "Acme");
    assert_eq!(entries[0].total_hours, 5.0);
    assert_eq!(
        entries[0].descriptions,
        vec!["build".to_string(), "more build".to_string()]
    );
    assert_eq!(entries[1].client, "");
    assert_eq!(entries[1].total_hours, 1.0);
}

#[test]
fn dateless_record_is_isolated_not_fatal() {
    let mut dateless = record("Website", 5, 4.0, "lost");
    dateless.date = None;

    let records = vec![dateless, record("Api", 6, 2.0, "ship")];
    let (entries, diagnostics) = aggregate(&records);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].project, "Api");
    assert_eq!(diagnostics.len(), 1);
    assert!(matches!(
        diagnostics[0],
        TranscribeError::DateParseFailure(_)
    ));
}
