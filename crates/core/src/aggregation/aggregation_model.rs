use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::DEFAULT_VALUE_FIELD;
use crate::records::{FieldCondition, Record};

/// Declarative description of one aggregation.
///
/// Supplied by a view and never mutated by the aggregation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationSpec {
    /// Field whose value becomes the category. `None` returns the raw
    /// filtered records instead of a series.
    pub group_by_field: Option<String>,
    /// Key under which chart bindings expose the value. Aggregated values are
    /// always occurrence counts; this field is never summed.
    pub value_field: String,
    /// Every condition must hold for a record to be included.
    pub filter: Vec<FieldCondition>,
}

impl Default for AggregationSpec {
    fn default() -> Self {
        Self {
            group_by_field: None,
            value_field: DEFAULT_VALUE_FIELD.to_string(),
            filter: Vec::new(),
        }
    }
}

impl AggregationSpec {
    /// A spec that groups by `field` and counts per category.
    pub fn group_by(field: impl Into<String>) -> Self {
        Self {
            group_by_field: Some(field.into()),
            ..Default::default()
        }
    }

    /// A spec with no grouping, used for filters and scalar counts.
    pub fn ungrouped() -> Self {
        Self::default()
    }

    pub fn with_value_field(mut self, field: impl Into<String>) -> Self {
        self.value_field = field.into();
        self
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.push(FieldCondition::equals(field, value));
        self
    }

    pub fn where_before(mut self, field: impl Into<String>, instant: DateTime<Utc>) -> Self {
        self.filter.push(FieldCondition::before(field, instant));
        self
    }

    pub fn is_grouped(&self) -> bool {
        self.group_by_field.is_some()
    }
}

/// One (category, value) pair of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub category: String,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(category: impl Into<String>, value: f64) -> Self {
        Self {
            category: category.into(),
            value,
        }
    }
}

/// Ordered (category, value) pairs ready for chart binding.
///
/// Order is whatever the producer chose; grouping yields first-seen order,
/// which is not stable across refreshes unless the caller sorts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedSeries {
    points: Vec<SeriesPoint>,
}

impl AggregatedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<SeriesPoint>) -> Self {
        Self { points }
    }

    pub fn push(&mut self, point: SeriesPoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of all values.
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    /// Value for a category, if present.
    pub fn value_of(&self, category: &str) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.category == category)
            .map(|p| p.value)
    }

    /// Sorts points by descending value, keeping first-seen order for ties.
    pub fn sort_by_value_desc(&mut self) {
        self.points.sort_by(|a, b| b.value.total_cmp(&a.value));
    }
}

/// Result of [`aggregate`](super::aggregate).
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregated {
    /// Grouped counts, produced when the spec names a group-by field.
    Series(AggregatedSeries),
    /// The filtered records themselves, when no group-by field is set.
    Records(Vec<Record>),
}

impl Aggregated {
    /// Number of records that passed the filter.
    pub fn included_count(&self) -> usize {
        match self {
            Aggregated::Series(series) => series.total() as usize,
            Aggregated::Records(records) => records.len(),
        }
    }

    pub fn into_series(self) -> Option<AggregatedSeries> {
        match self {
            Aggregated::Series(series) => Some(series),
            Aggregated::Records(_) => None,
        }
    }
}
