//! Dashboard module - the live views behind the lab operations dashboard.
//!
//! Each view is a [`LiveView`](crate::live::LiveView): it names the
//! collections it watches and derives its output from a fresh read on every
//! cycle.

mod dashboard_model;
mod views;

pub use dashboard_model::{DashboardChart, DashboardStats, DashboardSummary};
pub use views::{
    equipment_status_chart, project_status_chart, projects_by_branch_chart, ChartView, Clock,
    DashboardStatsView, GroupedCountView, ProjectsPerBranchView, SummaryCardsView,
};
