//! Aggregation module - declarative grouping and counting over raw records.
//!
//! Every chart and metric on the dashboard is expressed as an
//! [`AggregationSpec`] applied by [`aggregate`] or [`count_matching`].

mod aggregation_model;
mod aggregator;

pub use aggregation_model::{Aggregated, AggregatedSeries, AggregationSpec, SeriesPoint};
pub use aggregator::{aggregate, count_matching, group_counts};

#[cfg(test)]
mod aggregator_tests;
