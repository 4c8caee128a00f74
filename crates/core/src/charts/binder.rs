use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregation::AggregatedSeries;
use crate::constants::CHART_PALETTE_SIZE;
use crate::errors::{Error, Result};

/// The three chart shapes the dashboard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Categorical, with percentage labels.
    Pie,
    /// Categorical.
    Bar,
    /// Ordered; points keep series order.
    Line,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChartKind::Pie => "pie",
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
        };
        f.write_str(s)
    }
}

impl FromStr for ChartKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pie" => Ok(ChartKind::Pie),
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            other => Err(Error::InvalidSpec(format!("unknown chart kind '{}'", other))),
        }
    }
}

/// A bar or line point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub category: String,
    pub value: f64,
    pub color_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieSlice {
    pub category: String,
    pub value: f64,
    /// Share of the series total, 0-100.
    pub percent: f64,
    /// `"<category> <percent>%"` with the percent rounded to an integer.
    pub label: String,
    pub color_index: usize,
}

/// Renderable chart model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChartModel {
    /// Nothing to draw. A normal state, not an error.
    Empty { kind: ChartKind },
    Pie { slices: Vec<PieSlice> },
    Bar { bars: Vec<ChartPoint> },
    Line { points: Vec<ChartPoint> },
}

impl ChartModel {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartModel::Empty { kind } => *kind,
            ChartModel::Pie { .. } => ChartKind::Pie,
            ChartModel::Bar { .. } => ChartKind::Bar,
            ChartModel::Line { .. } => ChartKind::Line,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ChartModel::Empty { .. })
    }
}

/// Binds a series to a chart of the given kind.
///
/// Categories and values pass through unchanged. Pie percentages are
/// computed here from the series total every time, never cached.
pub fn bind(series: &AggregatedSeries, kind: ChartKind) -> ChartModel {
    if series.is_empty() {
        return ChartModel::Empty { kind };
    }

    match kind {
        ChartKind::Pie => {
            let total = series.total();
            let slices = series
                .points()
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let percent = if total > 0.0 {
                        p.value / total * 100.0
                    } else {
                        0.0
                    };
                    PieSlice {
                        category: p.category.clone(),
                        value: p.value,
                        percent,
                        label: format!("{} {}%", p.category, percent.round() as i64),
                        color_index: i % CHART_PALETTE_SIZE,
                    }
                })
                .collect();
            ChartModel::Pie { slices }
        }
        ChartKind::Bar => ChartModel::Bar {
            bars: to_points(series),
        },
        ChartKind::Line => ChartModel::Line {
            points: to_points(series),
        },
    }
}

fn to_points(series: &AggregatedSeries) -> Vec<ChartPoint> {
    series
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| ChartPoint {
            category: p.category.clone(),
            value: p.value,
            color_index: i % CHART_PALETTE_SIZE,
        })
        .collect()
}
