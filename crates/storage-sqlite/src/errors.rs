//! Storage-specific error types for SQLite operations.
//!
//! Diesel, r2d2 and rusqlite errors are wrapped here and converted to the
//! database-agnostic [`StoreError`] before leaving this crate.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use labdash_core::errors::{Error, StoreError};
use thiserror::Error;

/// Storage-specific errors that wrap Diesel and r2d2 types.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("SQLite setup failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Stored record is not valid JSON: {0}")]
    CorruptRecord(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A core error raised inside a write job. Passed through unchanged.
    #[error(transparent)]
    Core(#[from] Error),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Store(StoreError::ConnectionLost(e.to_string()))
            }
            StorageError::PoolError(e) => Error::Store(StoreError::ConnectionLost(e.to_string())),
            StorageError::QueryFailed(DieselError::NotFound) => {
                Error::Store(StoreError::NotFound("Record not found".to_string()))
            }
            StorageError::QueryFailed(e) if is_constraint_violation(&e) => {
                Error::Store(StoreError::ConstraintViolation(e.to_string()))
            }
            StorageError::QueryFailed(e) => Error::Store(StoreError::QueryFailed(e.to_string())),
            StorageError::Sqlite(e) => Error::Store(StoreError::Internal(e.to_string())),
            StorageError::MigrationFailed(e) => Error::Store(StoreError::Internal(e)),
            StorageError::CorruptRecord(e) => Error::Store(StoreError::Internal(e)),
            StorageError::Io(e) => Error::Store(StoreError::Internal(e.to_string())),
            StorageError::Core(e) => e,
        }
    }
}

fn is_constraint_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::CheckViolation,
            _
        )
    )
}

/// Extension trait for converting Diesel and r2d2 results to core results.
pub trait IntoCore<T> {
    fn into_core(self) -> labdash_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, DieselError> {
    fn into_core(self) -> labdash_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, r2d2::Error> {
    fn into_core(self) -> labdash_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_store_not_found() {
        let err: Error = StorageError::QueryFailed(DieselError::NotFound).into();
        assert!(matches!(err, Error::Store(StoreError::NotFound(_))));
    }

    #[test]
    fn test_unique_violation_maps_to_constraint_violation() {
        let unique = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("UNIQUE constraint failed: records.collection, records.id".to_string()),
        );
        let err: Error = StorageError::QueryFailed(unique).into();
        assert!(matches!(err, Error::Store(StoreError::ConstraintViolation(_))));

        let other: Error = StorageError::QueryFailed(DieselError::RollbackTransaction).into();
        assert!(matches!(other, Error::Store(StoreError::QueryFailed(_))));
    }

    #[test]
    fn test_core_errors_pass_through() {
        let err: Error = StorageError::Core(Error::InvalidRecord("no name".to_string())).into();
        assert!(matches!(err, Error::InvalidRecord(msg) if msg == "no name"));
    }
}
