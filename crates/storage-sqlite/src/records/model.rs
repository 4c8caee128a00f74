//! Database model for stored records.

use diesel::prelude::*;
use labdash_core::constants::ID_FIELD;
use labdash_core::records::{Record, WatchedCollection};
use serde_json::Value;

use crate::errors::StorageError;

/// One row of the `records` table. `data` is the record serialized as a JSON object.
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::records)]
#[diesel(primary_key(collection, id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecordDB {
    pub collection: String,
    pub id: String,
    pub data: String,
    pub created_at: String,
    pub updated_at: String,
}

impl RecordDB {
    pub fn new(
        collection: WatchedCollection,
        id: &str,
        record: &Record,
        created_at: String,
        updated_at: String,
    ) -> Result<Self, StorageError> {
        let data = serde_json::to_string(record)
            .map_err(|e| StorageError::CorruptRecord(e.to_string()))?;
        Ok(Self {
            collection: collection.as_str().to_string(),
            id: id.to_string(),
            data,
            created_at,
            updated_at,
        })
    }

    /// Parses `data` back into a record. The row's `id` column is authoritative.
    pub fn into_record(self) -> Result<Record, StorageError> {
        match serde_json::from_str::<Value>(&self.data) {
            Ok(Value::Object(mut map)) => {
                map.insert(ID_FIELD.to_string(), Value::String(self.id));
                Ok(map)
            }
            Ok(other) => Err(StorageError::CorruptRecord(format!(
                "record {}/{} holds {} instead of an object",
                self.collection, self.id, other
            ))),
            Err(e) => Err(StorageError::CorruptRecord(format!(
                "record {}/{}: {}",
                self.collection, self.id, e
            ))),
        }
    }
}
