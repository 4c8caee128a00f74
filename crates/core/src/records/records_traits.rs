use async_trait::async_trait;
use futures::stream::BoxStream;

use super::{matches_all, ChangeEvent, FieldCondition, RawRecordSet, WatchedCollection};
use crate::errors::{Result, StoreError};

/// Stream of change notifications for one collection.
///
/// An `Err` item or the end of the stream means the channel is gone; the
/// change feed decides whether to reconnect based on the error's retry class.
pub type ChangeStream = BoxStream<'static, std::result::Result<ChangeEvent, StoreError>>;

/// Read side of the record store, as consumed by the aggregation layer.
///
/// Reads are assumed reliable-eventually; change channels are neither
/// strictly ordered nor exactly-once.
#[async_trait]
pub trait RecordStoreTrait: Send + Sync {
    /// Reads the full current contents of a collection.
    async fn read_all(&self, collection: WatchedCollection) -> Result<RawRecordSet>;

    /// Reads the records matching every condition.
    ///
    /// The default reads everything and filters in memory; stores that can
    /// push conditions into their query language should override it.
    async fn read_filtered(
        &self,
        collection: WatchedCollection,
        conditions: &[FieldCondition],
    ) -> Result<RawRecordSet> {
        let mut set = self.read_all(collection).await?;
        set.records.retain(|r| matches_all(r, conditions));
        Ok(set)
    }

    /// Opens a new, independent change channel for a collection.
    async fn open_change_channel(
        &self,
        collection: WatchedCollection,
    ) -> std::result::Result<ChangeStream, StoreError>;
}
