//! Collection identifiers, change events and raw record sets.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Error, Result};

/// A single record as stored: field name to JSON value.
pub type Record = Map<String, Value>;

/// One of the record collections the dashboard can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedCollection {
    Branches,
    Clients,
    Employees,
    Equipment,
    Projects,
    Reports,
}

impl WatchedCollection {
    pub const ALL: [WatchedCollection; 6] = [
        WatchedCollection::Branches,
        WatchedCollection::Clients,
        WatchedCollection::Employees,
        WatchedCollection::Equipment,
        WatchedCollection::Projects,
        WatchedCollection::Reports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchedCollection::Branches => "branches",
            WatchedCollection::Clients => "clients",
            WatchedCollection::Employees => "employees",
            WatchedCollection::Equipment => "equipment",
            WatchedCollection::Projects => "projects",
            WatchedCollection::Reports => "reports",
        }
    }
}

impl fmt::Display for WatchedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatchedCollection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        WatchedCollection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownCollection(s.to_string()))
    }
}

/// What happened to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Emitted by the change feed itself after it recovers from a connection
    /// gap. Changes committed during the gap produced no notification, so
    /// subscribers must treat this like any other change.
    Resync,
}

/// Notification that something in a collection changed.
///
/// Carries no row payload: it is a refresh trigger, never a source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub collection: WatchedCollection,
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(collection: WatchedCollection, kind: ChangeKind) -> Self {
        Self {
            collection,
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn resync(collection: WatchedCollection) -> Self {
        Self::new(collection, ChangeKind::Resync)
    }

    pub fn is_resync(&self) -> bool {
        self.kind == ChangeKind::Resync
    }
}

/// Full contents of one collection, read fresh for a single refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecordSet {
    pub collection: WatchedCollection,
    pub records: Vec<Record>,
    pub fetched_at: DateTime<Utc>,
}

impl RawRecordSet {
    pub fn new(collection: WatchedCollection, records: Vec<Record>) -> Self {
        Self {
            collection,
            records,
            fetched_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}

/// Serializes a typed value into a [`Record`].
///
/// Fails if the value does not serialize to a JSON object.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidRecord(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}
