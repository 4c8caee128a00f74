use serde::{Deserialize, Serialize};

use crate::charts::{ChartModel, SummaryCard};

/// Scalar metrics behind the summary cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_projects: u64,
    pub total_clients: u64,
    pub total_equipment: u64,
    pub active_branches: u64,
    /// Equipment whose next calibration date is in the past.
    pub overdue_certifications: u64,
    /// Projects with status `completed`.
    pub completed_tests: u64,
}

/// Stats together with the cards bound from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub stats: DashboardStats,
    pub cards: Vec<SummaryCard>,
}

/// A bound chart plus the key its values are exposed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardChart {
    pub view: String,
    pub value_key: String,
    pub chart: ChartModel,
}
