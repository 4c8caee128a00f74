use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Text};
use diesel::SqliteConnection;
use labdash_core::constants::ID_FIELD;
use labdash_core::errors::{Error, StoreError};
use labdash_core::records::{
    matches_all, validate_record, ChangeEvent, ChangeKind, ChangeStream, FieldCondition,
    RawRecordSet, Record, RecordStoreTrait, WatchedCollection,
};
use labdash_core::Result;
use log::debug;
use serde_json::Value;
use uuid::Uuid;

use super::{ChangeBus, RecordDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::records;

const CREATED_AT_FIELD: &str = "created_at";
const UPDATED_AT_FIELD: &str = "updated_at";

/// Record store backed by a single SQLite table.
///
/// Reads go through the pool; writes go through the writer actor and publish
/// one change event on the [`ChangeBus`] after they commit.
pub struct SqliteRecordStore {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    bus: Arc<ChangeBus>,
}

impl SqliteRecordStore {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, bus: Arc<ChangeBus>) -> Self {
        Self { pool, writer, bus }
    }

    fn load_records(
        &self,
        collection: WatchedCollection,
        conditions: &[FieldCondition],
    ) -> Result<Vec<Record>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = records::table
            .filter(records::collection.eq(collection.as_str()))
            .order((records::created_at.asc(), records::id.asc()))
            .select(RecordDB::as_select())
            .into_boxed();

        // String equality is pushed down; everything else is filtered below.
        for condition in conditions {
            if let FieldCondition::Equals {
                field,
                value: Value::String(expected),
            } = condition
            {
                query = query.filter(
                    sql::<Bool>("json_extract(data, ")
                        .bind::<Text, _>(json_path(field))
                        .sql(") = ")
                        .bind::<Text, _>(expected.clone()),
                );
            }
        }

        let rows = query.load::<RecordDB>(&mut conn).map_err(StorageError::from)?;
        let mut loaded = Vec::with_capacity(rows.len());
        for row in rows {
            let record = row.into_record()?;
            if matches_all(&record, conditions) {
                loaded.push(record);
            }
        }
        Ok(loaded)
    }

    pub fn get(&self, collection: WatchedCollection, record_id: &str) -> Result<Record> {
        let mut conn = get_connection(&self.pool)?;
        let row = records::table
            .find((collection.as_str(), record_id))
            .select(RecordDB::as_select())
            .first::<RecordDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(row.into_record()?)
    }

    /// Inserts a record and publishes an `insert` event.
    ///
    /// A missing or empty `id` gets a fresh UUID.
    pub async fn insert(
        &self,
        collection: WatchedCollection,
        mut record: Record,
    ) -> Result<Record> {
        validate_record(collection, &record)?;

        let record_id = match record.get(ID_FIELD).and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let now = Utc::now().to_rfc3339();
        record.insert(ID_FIELD.to_string(), Value::String(record_id.clone()));
        record
            .entry(CREATED_AT_FIELD)
            .or_insert_with(|| Value::String(now.clone()));
        record.insert(UPDATED_AT_FIELD.to_string(), Value::String(now.clone()));

        let row = RecordDB::new(collection, &record_id, &record, now.clone(), now)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(records::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;

        self.publish(collection, ChangeKind::Insert);
        Ok(record)
    }

    /// Replaces a record's data and publishes an `update` event.
    ///
    /// `created_at` is kept from the stored row.
    pub async fn update(
        &self,
        collection: WatchedCollection,
        record_id: &str,
        mut record: Record,
    ) -> Result<Record> {
        record.insert(ID_FIELD.to_string(), Value::String(record_id.to_string()));
        validate_record(collection, &record)?;

        let record_id = record_id.to_string();
        let updated = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Record> {
                let existing = records::table
                    .find((collection.as_str(), record_id.as_str()))
                    .select(RecordDB::as_select())
                    .first::<RecordDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| not_found(collection, &record_id))?;

                let now = Utc::now().to_rfc3339();
                record.insert(
                    CREATED_AT_FIELD.to_string(),
                    Value::String(existing.created_at.clone()),
                );
                record.insert(UPDATED_AT_FIELD.to_string(), Value::String(now.clone()));
                let row = RecordDB::new(collection, &record_id, &record, existing.created_at, now)?;

                diesel::update(records::table.find((collection.as_str(), record_id.as_str())))
                    .set((records::data.eq(&row.data), records::updated_at.eq(&row.updated_at)))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(record)
            })
            .await?;

        self.publish(collection, ChangeKind::Update);
        Ok(updated)
    }

    /// Deletes a record and publishes a `delete` event.
    pub async fn delete(&self, collection: WatchedCollection, record_id: &str) -> Result<()> {
        let record_id = record_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let deleted =
                    diesel::delete(records::table.find((collection.as_str(), record_id.as_str())))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                if deleted == 0 {
                    return Err(not_found(collection, &record_id));
                }
                Ok(())
            })
            .await?;

        self.publish(collection, ChangeKind::Delete);
        Ok(())
    }

    fn publish(&self, collection: WatchedCollection, kind: ChangeKind) {
        let delivered = self.bus.publish(ChangeEvent::new(collection, kind));
        debug!(
            "Committed {:?} on {}, notified {} channel(s)",
            kind, collection, delivered
        );
    }
}

#[async_trait]
impl RecordStoreTrait for SqliteRecordStore {
    async fn read_all(&self, collection: WatchedCollection) -> Result<RawRecordSet> {
        let loaded = self.load_records(collection, &[])?;
        Ok(RawRecordSet::new(collection, loaded))
    }

    async fn read_filtered(
        &self,
        collection: WatchedCollection,
        conditions: &[FieldCondition],
    ) -> Result<RawRecordSet> {
        let loaded = self.load_records(collection, conditions)?;
        Ok(RawRecordSet::new(collection, loaded))
    }

    async fn open_change_channel(
        &self,
        collection: WatchedCollection,
    ) -> std::result::Result<ChangeStream, StoreError> {
        self.bus.subscribe(collection)
    }
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

fn not_found(collection: WatchedCollection, record_id: &str) -> Error {
    Error::Store(StoreError::NotFound(format!(
        "{} record '{}'",
        collection, record_id
    )))
}
