//! Change feed client.
//!
//! Each subscription owns one background task holding one store change
//! channel. Transient channel failures are retried with doubling backoff and
//! announced to the handler as a [`ChangeKind::Resync`] event once the channel
//! is back. Terminal failures reach the handler exactly once as an `Err`.
//!
//! [`ChangeKind::Resync`]: crate::records::ChangeKind::Resync

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::watch;

use super::LiveConfig;
use crate::errors::{ChangeFeedError, StoreError};
use crate::records::{ChangeEvent, RecordStoreTrait, WatchedCollection};

/// What a subscription handler receives.
pub type ChangeNotification = std::result::Result<ChangeEvent, ChangeFeedError>;

type ChangeHandler = Box<dyn Fn(ChangeNotification) + Send + Sync>;

const STATE_ACTIVE: u8 = 0;
const STATE_RELEASED: u8 = 1;
const STATE_TERMINATED: u8 = 2;

/// Opens and maintains per-collection change subscriptions.
pub struct ChangeFeedClient {
    store: Arc<dyn RecordStoreTrait>,
    config: LiveConfig,
    next_id: AtomicU64,
}

impl ChangeFeedClient {
    pub fn new(store: Arc<dyn RecordStoreTrait>, config: LiveConfig) -> Self {
        Self {
            store,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Subscribes `on_change` to changes of `collection`.
    ///
    /// Every call opens an independent channel, so two subscriptions to the
    /// same collection never share state. Must be called from within a Tokio
    /// runtime.
    pub fn subscribe<F>(&self, collection: WatchedCollection, on_change: F) -> SubscriptionHandle
    where
        F: Fn(ChangeNotification) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(AtomicU8::new(STATE_ACTIVE));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = watch::channel(false);

        let worker = SubscriptionWorker {
            id,
            collection,
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            state: Arc::clone(&state),
            on_change: Box::new(on_change),
            shutdown: shutdown_rx,
            ready: ready_tx,
        };
        tokio::spawn(worker.run());
        debug!("Subscription #{} opened for {}", id, collection);

        SubscriptionHandle {
            id,
            collection,
            state,
            released: AtomicBool::new(false),
            shutdown: shutdown_tx,
            ready: ready_rx,
        }
    }

    /// Releases a subscription. Idempotent.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        handle.release();
    }
}

/// Ownership of one live subscription. Dropping it releases the subscription.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: u64,
    collection: WatchedCollection,
    state: Arc<AtomicU8>,
    released: AtomicBool,
    shutdown: watch::Sender<bool>,
    ready: watch::Receiver<bool>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn collection(&self) -> WatchedCollection {
        self.collection
    }

    /// True until the handle is released or the subscription terminates.
    pub fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_ACTIVE
    }

    pub fn is_terminated(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_TERMINATED
    }

    /// Signal that resolves once the first channel open attempt has finished.
    ///
    /// Changes committed after that point are delivered, or covered by a
    /// resync if the first attempt failed.
    pub fn ready(&self) -> SubscriptionReady {
        SubscriptionReady {
            rx: self.ready.clone(),
        }
    }

    /// Stops delivery and closes the underlying channel.
    ///
    /// Returns `false` if the handle was already released. Releasing a
    /// terminated subscription is allowed and never fails.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _ = self.state.compare_exchange(
            STATE_ACTIVE,
            STATE_RELEASED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        // The worker may already be gone after a terminal failure.
        let _ = self.shutdown.send(true);
        debug!("Subscription #{} to {} released", self.id, self.collection);
        true
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// See [`SubscriptionHandle::ready`].
#[derive(Debug, Clone)]
pub struct SubscriptionReady {
    rx: watch::Receiver<bool>,
}

impl SubscriptionReady {
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits for the first open attempt. Also returns once the subscription
    /// has stopped without ever opening.
    pub async fn wait(mut self) {
        loop {
            let ready = *self.rx.borrow_and_update();
            if ready {
                return;
            }
            // Err means the worker is gone.
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

enum ChannelEnd {
    Shutdown,
    Failed(StoreError),
    Closed,
}

struct SubscriptionWorker {
    id: u64,
    collection: WatchedCollection,
    store: Arc<dyn RecordStoreTrait>,
    config: LiveConfig,
    state: Arc<AtomicU8>,
    on_change: ChangeHandler,
    shutdown: watch::Receiver<bool>,
    ready: watch::Sender<bool>,
}

impl SubscriptionWorker {
    async fn run(mut self) {
        let mut delay = self.config.reconnect_initial_delay;
        let mut recovering = false;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let opened = tokio::select! {
                _ = self.shutdown.changed() => break,
                opened = self.store.open_change_channel(self.collection) => opened,
            };
            self.ready.send_replace(true);

            match opened {
                Ok(mut stream) => {
                    delay = self.config.reconnect_initial_delay;
                    if recovering {
                        info!(
                            "Subscription #{} to {} reconnected, requesting resync",
                            self.id, self.collection
                        );
                        self.deliver(Ok(ChangeEvent::resync(self.collection)));
                    }

                    let end = loop {
                        let item = tokio::select! {
                            _ = self.shutdown.changed() => break ChannelEnd::Shutdown,
                            item = stream.next() => item,
                        };
                        match item {
                            Some(Ok(event)) => self.deliver(Ok(event)),
                            Some(Err(err)) => break ChannelEnd::Failed(err),
                            None => break ChannelEnd::Closed,
                        }
                    };

                    match end {
                        ChannelEnd::Shutdown => break,
                        ChannelEnd::Failed(err) if err.is_terminal() => {
                            self.terminate(err);
                            break;
                        }
                        ChannelEnd::Failed(err) => {
                            debug!(
                                "Subscription #{} to {} dropped: {}",
                                self.id, self.collection, err
                            );
                        }
                        ChannelEnd::Closed => {
                            debug!(
                                "Subscription #{} to {}: channel closed by store",
                                self.id, self.collection
                            );
                        }
                    }
                }
                Err(err) if err.is_terminal() => {
                    self.terminate(err);
                    break;
                }
                Err(err) => {
                    debug!(
                        "Subscription #{} failed to open {} channel: {}",
                        self.id, self.collection, err
                    );
                }
            }

            recovering = true;
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = self.config.next_delay(delay);
        }

        debug!("Subscription #{} to {} stopped", self.id, self.collection);
    }

    fn deliver(&self, notification: ChangeNotification) {
        if self.state.load(Ordering::Acquire) == STATE_ACTIVE {
            (self.on_change)(notification);
        }
    }

    fn terminate(&self, err: StoreError) {
        let won = self
            .state
            .compare_exchange(
                STATE_ACTIVE,
                STATE_TERMINATED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if won {
            warn!(
                "Subscription #{} to {} terminated: {}",
                self.id, self.collection, err
            );
            (self.on_change)(Err(ChangeFeedError::Terminated {
                collection: self.collection,
                reason: err.to_string(),
            }));
        }
    }
}
