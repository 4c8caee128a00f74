use std::collections::HashMap;

use futures::StreamExt;
use labdash_core::errors::StoreError;
use labdash_core::records::{ChangeEvent, ChangeStream, WatchedCollection};
use log::debug;
use tokio::sync::broadcast::{self, error::RecvError};

/// Per-collection broadcast of committed changes.
///
/// Every subscriber gets its own receiver. A receiver that falls more than
/// `capacity` events behind sees its stream fail with
/// [`StoreError::ConnectionLost`], so the change feed reconnects and resyncs.
pub struct ChangeBus {
    senders: HashMap<WatchedCollection, broadcast::Sender<ChangeEvent>>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let senders = WatchedCollection::ALL
            .into_iter()
            .map(|collection| (collection, broadcast::channel(capacity).0))
            .collect();
        Self { senders }
    }

    /// Publishes an event. Returns how many channels received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let Some(sender) = self.senders.get(&event.collection) else {
            return 0;
        };
        let collection = event.collection;
        let kind = event.kind;
        // No open channel is not an error: nobody is watching.
        let delivered = sender.send(event).unwrap_or(0);
        debug!(
            "Published {:?} on {} to {} channel(s)",
            kind, collection, delivered
        );
        delivered
    }

    /// Opens a new change channel for `collection`.
    pub fn subscribe(&self, collection: WatchedCollection) -> Result<ChangeStream, StoreError> {
        let sender = self.senders.get(&collection).ok_or_else(|| {
            StoreError::Internal(format!("no change channel for {}", collection))
        })?;
        let rx = sender.subscribe();

        let stream = futures::stream::unfold(rx, move |mut rx| async move {
            match rx.recv().await {
                Ok(event) => Some((Ok(event), rx)),
                Err(RecvError::Lagged(missed)) => Some((
                    Err(StoreError::ConnectionLost(format!(
                        "{} change channel lagged, {} event(s) missed",
                        collection, missed
                    ))),
                    rx,
                )),
                Err(RecvError::Closed) => None,
            }
        });
        Ok(stream.boxed())
    }

    /// Number of open channels for `collection`.
    pub fn open_channels(&self, collection: WatchedCollection) -> usize {
        self.senders
            .get(&collection)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}
