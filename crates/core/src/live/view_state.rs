//! Latest-state snapshot of a mounted view.
//!
//! [`ViewStateSink`] folds results and errors into a [`ViewState`] published
//! on a `watch` channel, which is what streaming endpoints hand to clients.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use super::ViewSink;
use crate::errors::LiveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    /// No cycle has completed yet.
    Loading,
    /// `data` is the result of the latest cycle.
    Ready,
    /// The latest cycle failed; `data` is from an earlier one.
    Stale,
    /// Every cycle so far failed.
    Failed,
    /// A subscription terminated. Live updates stopped until remount.
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState<T> {
    pub status: ViewStatus,
    pub data: Option<T>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            status: ViewStatus::Loading,
            data: None,
            consecutive_failures: 0,
            last_error: None,
            updated_at: None,
        }
    }
}

impl<T> ViewState<T> {
    pub fn loading() -> Self {
        Self::default()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn apply_result(&mut self, data: T) {
        self.data = Some(data);
        self.updated_at = Some(Utc::now());
        if self.status == ViewStatus::Terminated {
            return;
        }
        self.status = ViewStatus::Ready;
        self.consecutive_failures = 0;
        self.last_error = None;
    }

    pub fn apply_error(&mut self, error: &LiveError) {
        self.last_error = Some(error.to_string());
        if error.is_terminal() {
            self.status = ViewStatus::Terminated;
            return;
        }
        self.consecutive_failures += 1;
        if self.status != ViewStatus::Terminated {
            self.status = if self.has_data() {
                ViewStatus::Stale
            } else {
                ViewStatus::Failed
            };
        }
    }
}

/// [`ViewSink`] publishing a [`ViewState`] on a watch channel.
pub struct ViewStateSink<T> {
    tx: watch::Sender<ViewState<T>>,
}

impl<T: Send + Sync + 'static> ViewStateSink<T> {
    pub fn new() -> (Self, watch::Receiver<ViewState<T>>) {
        let (tx, rx) = watch::channel(ViewState::loading());
        (Self { tx }, rx)
    }
}

impl<T: Send + Sync + 'static> ViewSink<T> for ViewStateSink<T> {
    fn on_result(&self, result: T) {
        self.tx.send_modify(|state| state.apply_result(result));
    }

    fn on_error(&self, error: LiveError) {
        self.tx.send_modify(|state| state.apply_error(&error));
    }
}
