//! Core error types for the live aggregation layer.
//!
//! Store-specific errors (Diesel, SQLite, network transports) are converted to
//! [`StoreError`] by the storage layer, which keeps this crate storage-agnostic.

use thiserror::Error;

use crate::records::WatchedCollection;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the aggregation layer.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Record store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid aggregation spec: {0}")]
    InvalidSpec(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// How a caller should react to a [`StoreError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Connection-level hiccup. Reconnecting or re-reading may succeed.
    Transient,

    /// The store refuses this client (revoked credentials, dropped schema).
    /// Retrying won't help until the caller sets things up again.
    Terminal,
}

/// Database-agnostic error type for record store operations.
///
/// All details are carried as strings so storage backends can convert their
/// own error types into this one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The connection to the store was lost or a change channel lagged.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The store rejected a read or write.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A write broke a uniqueness or integrity constraint.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Credentials were rejected or revoked.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested record does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Internal/unexpected store failure.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Classifies the error for change-channel reconnect decisions.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            StoreError::Unauthorized(_) => RetryClass::Terminal,
            StoreError::ConnectionLost(_)
            | StoreError::QueryFailed(_)
            | StoreError::ConstraintViolation(_)
            | StoreError::NotFound(_)
            | StoreError::Internal(_) => RetryClass::Transient,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.retry_class() == RetryClass::Terminal
    }
}

/// Errors delivered by the change feed to subscription handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangeFeedError {
    /// The subscription failed permanently. The handle is unusable afterwards.
    #[error("Subscription to {collection} terminated: {reason}")]
    Terminated {
        collection: WatchedCollection,
        reason: String,
    },
}

/// Errors carried on a mounted view's error channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiveError {
    /// A fetch+aggregate cycle failed. Subscriptions stay open.
    #[error("Refresh of view '{view}' failed: {message}")]
    CycleFailed { view: String, message: String },

    /// One of the view's subscriptions failed permanently; the view must be
    /// mounted again to resume live updates.
    #[error("View '{view}' lost its {collection} subscription: {reason}")]
    SubscriptionTerminated {
        view: String,
        collection: WatchedCollection,
        reason: String,
    },
}

impl LiveError {
    pub fn cycle_failed(view: &str, error: &Error) -> Self {
        LiveError::CycleFailed {
            view: view.to_string(),
            message: error.to_string(),
        }
    }

    pub fn subscription_terminated(view: &str, error: &ChangeFeedError) -> Self {
        match error {
            ChangeFeedError::Terminated { collection, reason } => {
                LiveError::SubscriptionTerminated {
                    view: view.to_string(),
                    collection: *collection,
                    reason: reason.clone(),
                }
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LiveError::SubscriptionTerminated { .. })
    }
}
