use serde::{Deserialize, Serialize};

use crate::dashboard::DashboardStats;

/// A scalar metric card on the dashboard header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCard {
    pub title: String,
    pub value: u64,
    pub caption: String,
    /// Set when the caption reports something needing attention.
    pub alert: bool,
}

impl SummaryCard {
    fn new(title: &str, value: u64, caption: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            value,
            caption: caption.into(),
            alert: false,
        }
    }
}

/// Binds dashboard stats to the four header cards.
pub fn bind_summary_cards(stats: &DashboardStats) -> Vec<SummaryCard> {
    let equipment_caption = if stats.overdue_certifications > 0 {
        format!("{} overdue", stats.overdue_certifications)
    } else {
        "All up to date".to_string()
    };

    vec![
        SummaryCard::new(
            "Total Projects",
            stats.total_projects,
            format!("{} completed", stats.completed_tests),
        ),
        SummaryCard::new("Active Clients", stats.total_clients, "Across all branches"),
        SummaryCard {
            alert: stats.overdue_certifications > 0,
            ..SummaryCard::new("Equipment", stats.total_equipment, equipment_caption)
        },
        SummaryCard::new("Active Branches", stats.active_branches, "Testing facilities"),
    ]
}
