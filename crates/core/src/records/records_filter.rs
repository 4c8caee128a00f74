//! Field conditions used by aggregation filters and filtered store reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Record;
use crate::utils::time_utils::parse_record_date;

/// A single predicate over one record field.
///
/// Null values are treated as missing: a record whose field is null never
/// satisfies any condition on that field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum FieldCondition {
    /// Field is present and equals `value`.
    Equals { field: String, value: Value },
    /// Field holds a parseable date strictly before `instant`.
    Before {
        field: String,
        instant: DateTime<Utc>,
    },
}

impl FieldCondition {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldCondition::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn before(field: impl Into<String>, instant: DateTime<Utc>) -> Self {
        FieldCondition::Before {
            field: field.into(),
            instant,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldCondition::Equals { field, .. } | FieldCondition::Before { field, .. } => field,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let actual = match record.get(self.field()) {
            None | Some(Value::Null) => return false,
            Some(v) => v,
        };
        match self {
            FieldCondition::Equals { value, .. } => actual == value,
            FieldCondition::Before { instant, .. } => actual
                .as_str()
                .and_then(parse_record_date)
                .is_some_and(|date| date < *instant),
        }
    }
}

/// True when the record satisfies every condition. An empty list matches all.
pub fn matches_all(record: &Record, conditions: &[FieldCondition]) -> bool {
    conditions.iter().all(|c| c.matches(record))
}
