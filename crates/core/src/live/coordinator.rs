//! Refresh coordinator.
//!
//! One task per mounted view. Cycles of a view never overlap: change events
//! that arrive while a cycle is in flight collapse into a single pending
//! follow-up cycle, started as soon as the current one finishes. Once a view
//! is unmounted nothing more reaches its sink, including the result of a
//! cycle that was in flight at the time.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, trace, warn};
use tokio::sync::{mpsc, watch};

use super::{ChangeFeedClient, LiveConfig, SubscriptionHandle, SubscriptionReady, ViewSink};
use crate::errors::{ChangeFeedError, LiveError, Result};
use crate::records::{ChangeEvent, RecordStoreTrait, WatchedCollection};

/// A dashboard view that can be kept live.
///
/// `refresh` is one complete fetch+aggregate cycle: it reads everything it
/// needs from the store and derives the output from scratch.
#[async_trait]
pub trait LiveView: Send + Sync + 'static {
    type Output: Send + 'static;

    fn name(&self) -> &str;

    /// Collections whose changes invalidate this view.
    fn collections(&self) -> BTreeSet<WatchedCollection>;

    async fn refresh(&self, store: &dyn RecordStoreTrait) -> Result<Self::Output>;
}

/// Mounts live views against a record store.
pub struct RefreshCoordinator {
    store: Arc<dyn RecordStoreTrait>,
    feed: Arc<ChangeFeedClient>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn RecordStoreTrait>, config: LiveConfig) -> Self {
        let feed = Arc::new(ChangeFeedClient::new(Arc::clone(&store), config));
        Self { store, feed }
    }

    /// Mounts `view`: subscribes to its collections, then starts the initial
    /// cycle once every change channel is open. A change committed while the
    /// initial read is running therefore still schedules a follow-up cycle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount<V: LiveView>(&self, view: V, sink: Arc<dyn ViewSink<V::Output>>) -> ViewMount {
        let view_name = view.name().to_string();
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();

        let handles: Vec<SubscriptionHandle> = view
            .collections()
            .into_iter()
            .map(|collection| {
                let tx = trigger_tx.clone();
                self.feed.subscribe(collection, move |notification| {
                    let trigger = match notification {
                        Ok(event) => Trigger::Changed(event),
                        Err(err) => Trigger::Terminated(err),
                    };
                    let _ = tx.send(trigger);
                })
            })
            .collect();

        let ready: Vec<SubscriptionReady> =
            handles.iter().map(SubscriptionHandle::ready).collect();
        let gate = Arc::new(EmitGate::default());
        let (unmounted_tx, unmounted_rx) = watch::channel(false);
        let cycles = Arc::new(AtomicU64::new(0));

        let worker = ViewWorker {
            view,
            store: Arc::clone(&self.store),
            sink,
            ready,
            triggers: trigger_rx,
            gate: Arc::clone(&gate),
            unmounted: unmounted_rx,
            cycles: Arc::clone(&cycles),
        };
        tokio::spawn(worker.run());
        debug!(
            "Mounted view '{}' with {} subscription(s)",
            view_name,
            handles.len()
        );

        ViewMount {
            view_name,
            handles,
            gate,
            unmounted: unmounted_tx,
            manual: trigger_tx,
            cycles,
        }
    }
}

/// A mounted view. Dropping it unmounts the view.
pub struct ViewMount {
    view_name: String,
    handles: Vec<SubscriptionHandle>,
    gate: Arc<EmitGate>,
    unmounted: watch::Sender<bool>,
    manual: mpsc::UnboundedSender<Trigger>,
    cycles: Arc<AtomicU64>,
}

impl ViewMount {
    pub fn view_name(&self) -> &str {
        &self.view_name
    }

    /// Requests a cycle as if a watched collection had changed.
    pub fn refresh_now(&self) {
        if !self.gate.is_closed() {
            let _ = self.manual.send(Trigger::Manual);
        }
    }

    /// Number of refresh cycles started so far.
    pub fn cycles_started(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    /// Subscriptions still delivering changes.
    pub fn active_subscriptions(&self) -> usize {
        self.handles.iter().filter(|h| h.is_active()).count()
    }

    pub fn is_unmounted(&self) -> bool {
        self.gate.is_closed()
    }

    /// Releases every subscription and discards any pending or in-flight
    /// cycle.
    pub fn unmount(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.gate.close() {
            return;
        }
        for handle in self.handles.drain(..) {
            handle.release();
        }
        let _ = self.unmounted.send(true);
        debug!("Unmounted view '{}'", self.view_name);
    }
}

impl Drop for ViewMount {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum Trigger {
    Changed(ChangeEvent),
    Manual,
    Terminated(ChangeFeedError),
}

/// Serializes "is the view still mounted" with delivery to the sink, so
/// nothing is emitted after `close` returns.
#[derive(Default)]
struct EmitGate {
    closed: Mutex<bool>,
}

impl EmitGate {
    fn emit(&self, deliver: impl FnOnce()) -> bool {
        let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return false;
        }
        deliver();
        true
    }

    /// Returns `true` if this call closed the gate.
    fn close(&self) -> bool {
        let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        !std::mem::replace(&mut *closed, true)
    }

    fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct ViewWorker<V: LiveView> {
    view: V,
    store: Arc<dyn RecordStoreTrait>,
    sink: Arc<dyn ViewSink<V::Output>>,
    ready: Vec<SubscriptionReady>,
    triggers: mpsc::UnboundedReceiver<Trigger>,
    gate: Arc<EmitGate>,
    unmounted: watch::Receiver<bool>,
    cycles: Arc<AtomicU64>,
}

impl<V: LiveView> ViewWorker<V> {
    async fn run(self) {
        let ViewWorker {
            view,
            store,
            sink,
            ready,
            mut triggers,
            gate,
            mut unmounted,
            cycles,
        } = self;
        let name = view.name().to_string();
        let mut pending = true;
        let mut triggers_open = true;

        let channels_open = join_all(ready.into_iter().map(SubscriptionReady::wait));
        let unmounted_early = tokio::select! {
            _ = unmounted.changed() => true,
            _ = channels_open => false,
        };
        if unmounted_early {
            debug!("View '{}' unmounted before its first cycle", name);
            return;
        }

        loop {
            if pending {
                if gate.is_closed() {
                    break;
                }
                pending = false;
                let cycle_no = cycles.fetch_add(1, Ordering::AcqRel) + 1;
                debug!("View '{}' starting cycle #{}", name, cycle_no);

                let outcome = {
                    let cycle = view.refresh(store.as_ref());
                    tokio::pin!(cycle);
                    loop {
                        tokio::select! {
                            biased;
                            outcome = &mut cycle => break outcome,
                            trigger = triggers.recv(), if triggers_open => match trigger {
                                Some(trigger) => {
                                    pending |= handle_trigger(&name, trigger, &gate, sink.as_ref());
                                }
                                None => triggers_open = false,
                            },
                        }
                    }
                };

                let delivered = gate.emit(|| match outcome {
                    Ok(output) => sink.on_result(output),
                    Err(err) => {
                        warn!("View '{}' cycle #{} failed: {}", name, cycle_no, err);
                        sink.on_error(LiveError::cycle_failed(&name, &err));
                    }
                });
                if !delivered {
                    debug!(
                        "View '{}' unmounted during cycle #{}, result discarded",
                        name, cycle_no
                    );
                    break;
                }
                continue;
            }

            tokio::select! {
                _ = unmounted.changed() => break,
                trigger = triggers.recv(), if triggers_open => match trigger {
                    Some(trigger) => {
                        pending |= handle_trigger(&name, trigger, &gate, sink.as_ref());
                    }
                    None => triggers_open = false,
                },
            }
        }

        debug!("View '{}' worker stopped", name);
    }
}

/// Returns whether the trigger calls for another cycle.
fn handle_trigger<T>(
    name: &str,
    trigger: Trigger,
    gate: &EmitGate,
    sink: &dyn ViewSink<T>,
) -> bool {
    match trigger {
        Trigger::Changed(event) => {
            trace!(
                "View '{}' invalidated by {:?} on {}",
                name,
                event.kind,
                event.collection
            );
            true
        }
        Trigger::Manual => true,
        Trigger::Terminated(err) => {
            warn!("View '{}' stops receiving changes: {}", name, err);
            gate.emit(|| sink.on_error(LiveError::subscription_terminated(name, &err)));
            false
        }
    }
}
