//! SQLite storage implementation for Labdash.
//!
//! This crate is the only place where Diesel dependencies exist. It implements
//! [`labdash_core::records::RecordStoreTrait`] on a single `records` table and
//! contains:
//! - Database initialization, connection pooling and migrations
//! - The single-writer actor all writes go through
//! - Per-collection change channels fed by committed writes
//!
//! ```text
//!  insert/update/delete ──► WriteHandle ──► SQLite
//!                                │ (after commit)
//!                                ▼
//!                            ChangeBus ──► open_change_channel streams
//! ```

pub mod db;
pub mod errors;
pub mod records;
pub mod schema;

use std::sync::Arc;

pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};
pub use errors::{IntoCore, StorageError};
pub use records::{ChangeBus, RecordDB, SqliteRecordStore};

pub use labdash_core::errors::Error;
pub use labdash_core::Result;

/// Initializes the database at `db_path`, runs migrations and starts the
/// writer, returning a ready store.
///
/// Must be called from within a Tokio runtime.
pub fn open_record_store(
    db_path: &str,
    change_channel_capacity: usize,
) -> Result<SqliteRecordStore> {
    let db_path = init(db_path)?;
    let pool = create_pool(&db_path)?;
    run_migrations(&pool)?;
    let writer = spawn_writer(&pool)?;
    let bus = Arc::new(ChangeBus::new(change_channel_capacity));
    Ok(SqliteRecordStore::new(pool, writer, bus))
}
