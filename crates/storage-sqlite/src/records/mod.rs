//! SQLite storage for the six lab record collections.

mod change_bus;
mod model;
mod repository;

pub use change_bus::ChangeBus;
pub use model::RecordDB;
pub use repository::SqliteRecordStore;

#[cfg(test)]
mod repository_tests;
