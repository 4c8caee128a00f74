//! Unit tests for the aggregator.

use super::*;
use crate::constants::UNKNOWN_CATEGORY;
use crate::records::{RawRecordSet, Record, WatchedCollection};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

fn record_set(collection: WatchedCollection, values: Vec<Value>) -> RawRecordSet {
    let records: Vec<Record> = values
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();
    RawRecordSet::new(collection, records)
}

#[test]
fn test_groups_by_status_in_first_seen_order() {
    let records = record_set(
        WatchedCollection::Projects,
        vec![
            json!({"status": "pending"}),
            json!({"status": "completed"}),
            json!({"status": "completed"}),
            json!({"status": null}),
        ],
    );

    let series = aggregate(records, &AggregationSpec::group_by("status"))
        .into_series()
        .unwrap();

    assert_eq!(
        series.points(),
        &[
            SeriesPoint::new("pending", 1.0),
            SeriesPoint::new("completed", 2.0),
            SeriesPoint::new(UNKNOWN_CATEGORY, 1.0),
        ]
    );
}

#[test]
fn test_missing_and_empty_group_values_go_to_unknown() {
    let records = record_set(
        WatchedCollection::Equipment,
        vec![
            json!({"name": "scope"}),
            json!({"status": ""}),
            json!({"status": "operational"}),
        ],
    );

    let series = aggregate(records, &AggregationSpec::group_by("status"))
        .into_series()
        .unwrap();

    assert_eq!(series.value_of(UNKNOWN_CATEGORY), Some(2.0));
    assert_eq!(series.value_of("operational"), Some(1.0));
    assert_eq!(series.total(), 3.0);
}

#[test]
fn test_non_string_categories_use_json_text() {
    let records = record_set(
        WatchedCollection::Reports,
        vec![json!({"flag": true}), json!({"flag": 42}), json!({"flag": true})],
    );

    let series = aggregate(records, &AggregationSpec::group_by("flag"))
        .into_series()
        .unwrap();

    assert_eq!(series.value_of("true"), Some(2.0));
    assert_eq!(series.value_of("42"), Some(1.0));
}

#[test]
fn test_false_and_zero_are_categories_not_unknown() {
    let records = record_set(
        WatchedCollection::Equipment,
        vec![
            json!({"flag": false}),
            json!({"flag": 0}),
            json!({"flag": false}),
            json!({"flag": null}),
        ],
    );

    let series = aggregate(records, &AggregationSpec::group_by("flag"))
        .into_series()
        .unwrap();

    assert_eq!(
        series.points(),
        &[
            SeriesPoint::new("false", 2.0),
            SeriesPoint::new("0", 1.0),
            SeriesPoint::new(UNKNOWN_CATEGORY, 1.0),
        ]
    );
}

#[test]
fn test_filter_applies_before_grouping() {
    let records = record_set(
        WatchedCollection::Projects,
        vec![
            json!({"branch_id": "b1", "status": "pending"}),
            json!({"branch_id": "b2", "status": "pending"}),
            json!({"status": "completed"}),
            json!({"branch_id": "b1", "status": "completed"}),
        ],
    );

    let spec = AggregationSpec::group_by("status").where_eq("branch_id", "b1");
    let series = aggregate(records, &spec).into_series().unwrap();

    assert_eq!(
        series.points(),
        &[
            SeriesPoint::new("pending", 1.0),
            SeriesPoint::new("completed", 1.0),
        ]
    );
}

#[test]
fn test_ungrouped_returns_filtered_records() {
    let records = record_set(
        WatchedCollection::Clients,
        vec![
            json!({"id": "c1", "branch_id": "b1"}),
            json!({"id": "c2", "branch_id": "b2"}),
            json!({"id": "c3"}),
        ],
    );

    let spec = AggregationSpec::ungrouped().where_eq("branch_id", "b1");
    match aggregate(records, &spec) {
        Aggregated::Records(records) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0]["id"], json!("c1"));
        }
        other => panic!("expected records, got {:?}", other),
    }
}

#[test]
fn test_overdue_calibration_count() {
    let equipment = record_set(
        WatchedCollection::Equipment,
        vec![
            json!({"next_calibration": "2020-01-01"}),
            json!({"next_calibration": "2999-01-01"}),
            json!({"next_calibration": null}),
        ],
    );
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let spec = AggregationSpec::ungrouped().where_before("next_calibration", now);
    assert_eq!(count_matching(&equipment, &spec), 1);
}

#[test]
fn test_calibration_due_exactly_now_is_not_overdue() {
    let equipment = record_set(
        WatchedCollection::Equipment,
        vec![json!({"next_calibration": "2024-01-01"})],
    );
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let spec = AggregationSpec::ungrouped().where_before("next_calibration", now);
    assert_eq!(count_matching(&equipment, &spec), 0);
}

#[test]
fn test_empty_record_set_yields_empty_series() {
    let records = record_set(WatchedCollection::Projects, vec![]);
    let aggregated = aggregate(records, &AggregationSpec::group_by("status"));
    assert_eq!(aggregated.included_count(), 0);
    assert!(aggregated.into_series().unwrap().is_empty());
}

#[test]
fn test_sort_by_value_desc_is_stable() {
    let mut series = AggregatedSeries::from_points(vec![
        SeriesPoint::new("a", 1.0),
        SeriesPoint::new("b", 3.0),
        SeriesPoint::new("c", 1.0),
    ]);
    series.sort_by_value_desc();
    let categories: Vec<&str> = series.points().iter().map(|p| p.category.as_str()).collect();
    assert_eq!(categories, vec!["b", "a", "c"]);
}
