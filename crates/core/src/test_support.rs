//! In-memory record store with scriptable failures, shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use serde_json::Value;

use crate::errors::{Error, Result, StoreError};
use crate::live::LiveConfig;
use crate::records::{
    matches_all, ChangeEvent, ChangeKind, ChangeStream, FieldCondition, RawRecordSet, Record,
    RecordStoreTrait, WatchedCollection,
};

type ChannelSender = mpsc::UnboundedSender<std::result::Result<ChangeEvent, StoreError>>;

#[derive(Default)]
pub(crate) struct ScriptedRecordStore {
    records: Mutex<HashMap<WatchedCollection, Vec<Record>>>,
    failing_reads: Mutex<HashSet<WatchedCollection>>,
    failing_filter_values: Mutex<HashSet<String>>,
    channels: Mutex<HashMap<WatchedCollection, Vec<ChannelSender>>>,
    open_failures: Mutex<VecDeque<StoreError>>,
    open_delay: Mutex<Option<Duration>>,
    opens: AtomicUsize,
    reads: AtomicUsize,
}

impl ScriptedRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a collection's contents. Each value must be a JSON object.
    pub fn set_records(&self, collection: WatchedCollection, values: Vec<Value>) {
        self.records
            .lock()
            .unwrap()
            .insert(collection, to_records(values));
    }

    pub fn fail_reads(&self, collection: WatchedCollection) {
        self.failing_reads.lock().unwrap().insert(collection);
    }

    pub fn heal_reads(&self, collection: WatchedCollection) {
        self.failing_reads.lock().unwrap().remove(&collection);
    }

    /// Makes `read_filtered` fail whenever an equality condition uses `value`.
    pub fn fail_filtered_reads_for(&self, value: &str) {
        self.failing_filter_values
            .lock()
            .unwrap()
            .insert(value.to_string());
    }

    /// The next `open_change_channel` call fails with `err`.
    pub fn queue_open_failure(&self, err: StoreError) {
        self.open_failures.lock().unwrap().push_back(err);
    }

    /// Sends a change event on every open channel of the collection.
    /// Makes every channel open take `delay` before the channel exists.
    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = Some(delay);
    }

    pub fn publish(&self, collection: WatchedCollection, kind: ChangeKind) {
        let mut channels = self.channels.lock().unwrap();
        if let Some(senders) = channels.get_mut(&collection) {
            senders.retain(|tx| !tx.is_closed());
            for tx in senders.iter() {
                let _ = tx.unbounded_send(Ok(ChangeEvent::new(collection, kind)));
            }
        }
    }

    /// Fails every open channel of the collection with `err`.
    pub fn inject_channel_error(&self, collection: WatchedCollection, err: StoreError) {
        let mut channels = self.channels.lock().unwrap();
        if let Some(senders) = channels.get_mut(&collection) {
            for tx in senders.drain(..) {
                let _ = tx.unbounded_send(Err(err.clone()));
            }
        }
    }

    /// Channels whose receiving end is still held by a subscriber.
    pub fn open_channels(&self, collection: WatchedCollection) -> usize {
        self.channels
            .lock()
            .unwrap()
            .get(&collection)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    pub fn total_open_channels(&self) -> usize {
        WatchedCollection::ALL
            .into_iter()
            .map(|c| self.open_channels(c))
            .sum()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStoreTrait for ScriptedRecordStore {
    async fn read_all(&self, collection: WatchedCollection) -> Result<RawRecordSet> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads.lock().unwrap().contains(&collection) {
            return Err(Error::Store(StoreError::QueryFailed(format!(
                "scripted failure reading {}",
                collection
            ))));
        }
        let records = self
            .records
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default();
        Ok(RawRecordSet::new(collection, records))
    }

    async fn read_filtered(
        &self,
        collection: WatchedCollection,
        conditions: &[FieldCondition],
    ) -> Result<RawRecordSet> {
        let poisoned = {
            let failing = self.failing_filter_values.lock().unwrap();
            conditions.iter().any(|c| match c {
                FieldCondition::Equals { value, .. } => value
                    .as_str()
                    .map(|s| failing.contains(s))
                    .unwrap_or(false),
                _ => false,
            })
        };
        if poisoned {
            return Err(Error::Store(StoreError::QueryFailed(
                "scripted filtered read failure".to_string(),
            )));
        }
        let mut set = self.read_all(collection).await?;
        set.records.retain(|r| matches_all(r, conditions));
        Ok(set)
    }

    async fn open_change_channel(
        &self,
        collection: WatchedCollection,
    ) -> std::result::Result<ChangeStream, StoreError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let delay = *self.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.open_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let (tx, rx) = mpsc::unbounded();
        self.channels
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(tx);
        Ok(rx.boxed())
    }
}

pub(crate) fn to_records(values: Vec<Value>) -> Vec<Record> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Object(map) => map,
            other => panic!("test record must be an object, got {}", other),
        })
        .collect()
}

/// Reconnect delays short enough for tests.
pub(crate) fn fast_config() -> LiveConfig {
    LiveConfig::default().with_reconnect_delays(Duration::from_millis(2), Duration::from_millis(10))
}

/// Polls `condition` every 5ms, panicking after two seconds.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 2s");
}

/// Gives spawned tasks time to run.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(40)).await;
}
