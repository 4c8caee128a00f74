//! Live module - change subscriptions and per-view refresh cycles.
//!
//! [`ChangeFeedClient`] turns store change channels into subscription
//! handles that survive transient connection loss. [`RefreshCoordinator`]
//! mounts a [`LiveView`], runs its fetch+aggregate cycle whenever a watched
//! collection changes, and delivers results and errors to a [`ViewSink`].

mod change_feed;
mod coordinator;
mod live_config;
mod sink;
mod view_state;

pub use change_feed::{
    ChangeFeedClient, ChangeNotification, SubscriptionHandle, SubscriptionReady,
};
pub use coordinator::{LiveView, RefreshCoordinator, ViewMount};
pub use live_config::LiveConfig;
pub use sink::{ChannelViewSink, MockViewSink, ViewSink, ViewUpdate};
pub use view_state::{ViewState, ViewStateSink, ViewStatus};
