//! Charts module - binds aggregated data to renderable chart and card models.
//!
//! Binding is pure: no I/O and no knowledge of subscriptions.

mod binder;
mod summary;

pub use binder::{bind, ChartKind, ChartModel, ChartPoint, PieSlice};
pub use summary::{bind_summary_cards, SummaryCard};
