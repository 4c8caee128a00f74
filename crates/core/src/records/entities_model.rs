//! Typed lab entities, one per watched collection.
//!
//! The aggregation layer works on untyped [`Record`]s; these types document
//! the shape of each collection and validate records on their way into the
//! store.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{Record, WatchedCollection};
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Operational,
    Maintenance,
    CalibrationDue,
    OutOfService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    OnLeave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    Admin,
    LabManager,
    Technician,
}

/// A testing facility.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub location: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Client {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub branch_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Employee {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    pub branch_id: Option<String>,
    pub phone: Option<String>,
    pub role: Option<AppRole>,
    pub status: Option<EmployeeStatus>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub equipment_type: String,
    pub branch_id: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<EquipmentStatus>,
    /// Calibration dates are `YYYY-MM-DD` or RFC 3339.
    pub last_calibration: Option<String>,
    pub next_calibration: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A test engagement run by a branch for a client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub test_type: String,
    pub branch_id: Option<String>,
    pub client_id: Option<String>,
    pub technician_id: Option<String>,
    pub status: Option<ProjectStatus>,
    pub scheduled_date: Option<String>,
    pub completed_date: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub id: String,
    pub project_id: Option<String>,
    pub summary: Option<String>,
    pub file_url: Option<String>,
    pub uploaded_at: Option<String>,
}

/// Checks that a record has the shape its collection requires.
///
/// Unknown extra fields are allowed; missing required fields and wrongly
/// typed values (e.g. an unknown project status) are rejected.
pub fn validate_record(collection: WatchedCollection, record: &Record) -> Result<()> {
    fn check<T: DeserializeOwned>(collection: WatchedCollection, record: &Record) -> Result<()> {
        serde_json::from_value::<T>(serde_json::Value::Object(record.clone()))
            .map(|_| ())
            .map_err(|e| Error::InvalidRecord(format!("{}: {}", collection, e)))
    }

    match collection {
        WatchedCollection::Branches => check::<Branch>(collection, record),
        WatchedCollection::Clients => check::<Client>(collection, record),
        WatchedCollection::Employees => check::<Employee>(collection, record),
        WatchedCollection::Equipment => check::<Equipment>(collection, record),
        WatchedCollection::Projects => check::<Project>(collection, record),
        WatchedCollection::Reports => check::<Report>(collection, record),
    }
}
