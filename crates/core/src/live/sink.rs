//! Destinations for view results and errors.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::errors::LiveError;

/// Receives the outcome of every refresh cycle of one mounted view.
///
/// Implementations must not block: they are called from the view's task.
pub trait ViewSink<T>: Send + Sync {
    fn on_result(&self, result: T);
    fn on_error(&self, error: LiveError);
}

/// One item on a [`ChannelViewSink`] receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate<T> {
    Result(T),
    Error(LiveError),
}

/// Forwards view updates to an unbounded channel.
pub struct ChannelViewSink<T> {
    tx: mpsc::UnboundedSender<ViewUpdate<T>>,
}

impl<T: Send + 'static> ChannelViewSink<T> {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ViewUpdate<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl<T: Send + 'static> ViewSink<T> for ChannelViewSink<T> {
    fn on_result(&self, result: T) {
        let _ = self.tx.send(ViewUpdate::Result(result));
    }

    fn on_error(&self, error: LiveError) {
        let _ = self.tx.send(ViewUpdate::Error(error));
    }
}

/// Sink that records everything it receives. Used in tests.
pub struct MockViewSink<T> {
    results: Arc<Mutex<Vec<T>>>,
    errors: Arc<Mutex<Vec<LiveError>>>,
}

impl<T> Default for MockViewSink<T> {
    fn default() -> Self {
        Self {
            results: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> MockViewSink<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<T> {
        self.results.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<LiveError> {
        self.errors.lock().unwrap().clone()
    }

    pub fn result_count(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }

    pub fn last_result(&self) -> Option<T> {
        self.results.lock().unwrap().last().cloned()
    }

    pub fn clear(&self) {
        self.results.lock().unwrap().clear();
        self.errors.lock().unwrap().clear();
    }
}

impl<T: Send> ViewSink<T> for MockViewSink<T> {
    fn on_result(&self, result: T) {
        self.results.lock().unwrap().push(result);
    }

    fn on_error(&self, error: LiveError) {
        self.errors.lock().unwrap().push(error);
    }
}
