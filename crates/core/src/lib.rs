//! Labdash Core - live aggregation layer for the lab operations dashboard.
//!
//! This crate turns the six record collections of the lab business (branches,
//! clients, employees, equipment, projects, reports) into continuously
//! refreshed, chart-ready aggregates. It is database-agnostic: the record
//! store is consumed through [`records::RecordStoreTrait`], which the
//! `storage-sqlite` crate implements.
//!
//! ```text
//!  store change channel ──► ChangeFeedClient ──► RefreshCoordinator
//!                                                     │  (one task per view)
//!                                                     ▼
//!                                   read_all ──► aggregation ──► charts ──► ViewSink
//! ```

pub mod aggregation;
pub mod charts;
pub mod constants;
pub mod dashboard;
pub mod errors;
pub mod live;
pub mod records;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
