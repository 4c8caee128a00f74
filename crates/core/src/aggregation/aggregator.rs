use std::collections::HashMap;

use log::trace;
use serde_json::Value;

use super::{Aggregated, AggregatedSeries, AggregationSpec, SeriesPoint};
use crate::constants::UNKNOWN_CATEGORY;
use crate::records::{matches_all, RawRecordSet, Record};

/// Applies a spec to a freshly read record set.
///
/// The record set is consumed: it belongs to the cycle that fetched it and is
/// discarded once aggregated.
pub fn aggregate(records: RawRecordSet, spec: &AggregationSpec) -> Aggregated {
    match spec.group_by_field.as_deref() {
        Some(field) => Aggregated::Series(group_counts(&records, field, spec)),
        None => Aggregated::Records(
            records
                .records
                .into_iter()
                .filter(|r| matches_all(r, &spec.filter))
                .collect(),
        ),
    }
}

/// Counts included records per category of `field`, in first-seen order.
///
/// Records whose field is missing, null or the empty string land in
/// [`UNKNOWN_CATEGORY`]. Other values, `false` and `0` included, are
/// categories of their own. No included record is ever dropped.
pub fn group_counts(
    records: &RawRecordSet,
    field: &str,
    spec: &AggregationSpec,
) -> AggregatedSeries {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut points: Vec<SeriesPoint> = Vec::new();

    for record in records.iter().filter(|r| matches_all(r, &spec.filter)) {
        let category = category_of(record, field);
        match index.get(&category) {
            Some(&i) => points[i].value += 1.0,
            None => {
                index.insert(category.clone(), points.len());
                points.push(SeriesPoint::new(category, 1.0));
            }
        }
    }

    trace!(
        "Grouped {} {} record(s) by '{}' into {} categories",
        records.len(),
        records.collection,
        field,
        points.len()
    );
    AggregatedSeries::from_points(points)
}

/// Number of records passing the spec's filter. Grouping is ignored.
///
/// This is the degenerate aggregate behind scalar metrics such as
/// "equipment overdue for calibration".
pub fn count_matching(records: &RawRecordSet, spec: &AggregationSpec) -> usize {
    records
        .iter()
        .filter(|r| matches_all(r, &spec.filter))
        .count()
}

fn category_of(record: &Record, field: &str) -> String {
    match record.get(field) {
        None | Some(Value::Null) => UNKNOWN_CATEGORY.to_string(),
        Some(Value::String(s)) if s.is_empty() => UNKNOWN_CATEGORY.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
