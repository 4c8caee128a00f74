use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::warn;
use serde_json::Value;

use super::{DashboardChart, DashboardStats, DashboardSummary};
use crate::aggregation::{aggregate, count_matching, AggregatedSeries, AggregationSpec, SeriesPoint};
use crate::charts::{bind, bind_summary_cards, ChartKind};
use crate::constants::{
    BRANCH_ID_FIELD, ID_FIELD, NAME_FIELD, NEXT_CALIBRATION_FIELD, STATUS_FIELD, UNKNOWN_CATEGORY,
};
use crate::errors::{Error, Result};
use crate::live::LiveView;
use crate::records::{ProjectStatus, RawRecordSet, Record, RecordStoreTrait, WatchedCollection};

/// Source of "now" for date-relative metrics.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Counts the records of one collection per value of a field.
pub struct GroupedCountView {
    name: String,
    collection: WatchedCollection,
    spec: AggregationSpec,
}

impl GroupedCountView {
    /// Fails unless `spec` names a group-by field.
    pub fn new(
        name: impl Into<String>,
        collection: WatchedCollection,
        spec: AggregationSpec,
    ) -> Result<Self> {
        if !spec.is_grouped() {
            return Err(Error::InvalidSpec(
                "grouped count view needs a group-by field".to_string(),
            ));
        }
        Ok(Self {
            name: name.into(),
            collection,
            spec,
        })
    }

    /// Groups every record of `collection` by `field`.
    pub fn by_field(
        name: impl Into<String>,
        collection: WatchedCollection,
        field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            collection,
            spec: AggregationSpec::group_by(field),
        }
    }

    pub fn spec(&self) -> &AggregationSpec {
        &self.spec
    }
}

#[async_trait]
impl LiveView for GroupedCountView {
    type Output = AggregatedSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn collections(&self) -> BTreeSet<WatchedCollection> {
        BTreeSet::from([self.collection])
    }

    async fn refresh(&self, store: &dyn RecordStoreTrait) -> Result<AggregatedSeries> {
        let records = store.read_all(self.collection).await?;
        aggregate(records, &self.spec)
            .into_series()
            .ok_or_else(|| Error::InvalidSpec(format!("view '{}' is not grouped", self.name)))
    }
}

/// Binds the series of an inner view to a chart on every cycle.
pub struct ChartView<V> {
    inner: V,
    kind: ChartKind,
    value_key: String,
}

impl<V> ChartView<V> {
    pub fn new(inner: V, kind: ChartKind, value_key: impl Into<String>) -> Self {
        Self {
            inner,
            kind,
            value_key: value_key.into(),
        }
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }
}

#[async_trait]
impl<V> LiveView for ChartView<V>
where
    V: LiveView<Output = AggregatedSeries>,
{
    type Output = DashboardChart;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn collections(&self) -> BTreeSet<WatchedCollection> {
        self.inner.collections()
    }

    async fn refresh(&self, store: &dyn RecordStoreTrait) -> Result<DashboardChart> {
        let series = self.inner.refresh(store).await?;
        Ok(DashboardChart {
            view: self.inner.name().to_string(),
            value_key: self.value_key.clone(),
            chart: bind(&series, self.kind),
        })
    }
}

/// Project count per branch, labelled by branch name.
///
/// Reads branches, then counts each branch's projects with its own filtered
/// read. A failing per-branch read counts as zero instead of failing the view.
pub struct ProjectsPerBranchView {
    name: String,
}

impl Default for ProjectsPerBranchView {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectsPerBranchView {
    pub fn new() -> Self {
        Self {
            name: "projects-by-branch".to_string(),
        }
    }

    async fn count_for_branch(&self, store: &dyn RecordStoreTrait, branch: &Record) -> SeriesPoint {
        let branch_name = branch
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_CATEGORY)
            .to_string();

        let branch_id = match branch.get(ID_FIELD) {
            Some(id) if !id.is_null() => id.clone(),
            _ => return SeriesPoint::new(branch_name, 0.0),
        };

        let spec = AggregationSpec::ungrouped().where_eq(BRANCH_ID_FIELD, branch_id);
        match store
            .read_filtered(WatchedCollection::Projects, &spec.filter)
            .await
        {
            Ok(projects) => SeriesPoint::new(branch_name, count_matching(&projects, &spec) as f64),
            Err(err) => {
                warn!(
                    "View '{}': counting projects of branch '{}' failed, reporting 0: {}",
                    self.name, branch_name, err
                );
                SeriesPoint::new(branch_name, 0.0)
            }
        }
    }
}

#[async_trait]
impl LiveView for ProjectsPerBranchView {
    type Output = AggregatedSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn collections(&self) -> BTreeSet<WatchedCollection> {
        BTreeSet::from([WatchedCollection::Branches, WatchedCollection::Projects])
    }

    async fn refresh(&self, store: &dyn RecordStoreTrait) -> Result<AggregatedSeries> {
        let branches = store.read_all(WatchedCollection::Branches).await?;
        let points = join_all(
            branches
                .iter()
                .map(|branch| self.count_for_branch(store, branch)),
        )
        .await;
        Ok(AggregatedSeries::from_points(points))
    }
}

/// Scalar dashboard metrics over projects, clients, equipment and branches.
pub struct DashboardStatsView {
    name: String,
    clock: Clock,
}

impl Default for DashboardStatsView {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardStatsView {
    pub fn new() -> Self {
        let clock: Clock = Arc::new(Utc::now);
        Self {
            name: "dashboard-stats".to_string(),
            clock,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn watched() -> BTreeSet<WatchedCollection> {
        BTreeSet::from([
            WatchedCollection::Projects,
            WatchedCollection::Clients,
            WatchedCollection::Equipment,
            WatchedCollection::Branches,
        ])
    }

    async fn compute(&self, store: &dyn RecordStoreTrait) -> Result<DashboardStats> {
        let (projects, clients, equipment, branches) = futures::try_join!(
            store.read_all(WatchedCollection::Projects),
            store.read_all(WatchedCollection::Clients),
            store.read_all(WatchedCollection::Equipment),
            store.read_all(WatchedCollection::Branches),
        )?;

        let now = (self.clock)();
        let overdue = AggregationSpec::ungrouped().where_before(NEXT_CALIBRATION_FIELD, now);
        let completed = AggregationSpec::ungrouped()
            .where_eq(STATUS_FIELD, serde_json::to_value(ProjectStatus::Completed)?);

        Ok(DashboardStats {
            total_projects: len_of(&projects),
            total_clients: len_of(&clients),
            total_equipment: len_of(&equipment),
            active_branches: len_of(&branches),
            overdue_certifications: count_matching(&equipment, &overdue) as u64,
            completed_tests: count_matching(&projects, &completed) as u64,
        })
    }
}

fn len_of(set: &RawRecordSet) -> u64 {
    set.len() as u64
}

#[async_trait]
impl LiveView for DashboardStatsView {
    type Output = DashboardStats;

    fn name(&self) -> &str {
        &self.name
    }

    fn collections(&self) -> BTreeSet<WatchedCollection> {
        Self::watched()
    }

    async fn refresh(&self, store: &dyn RecordStoreTrait) -> Result<DashboardStats> {
        self.compute(store).await
    }
}

/// Dashboard stats bound to the header cards.
#[derive(Default)]
pub struct SummaryCardsView {
    stats: DashboardStatsView,
}

impl SummaryCardsView {
    pub fn new(stats: DashboardStatsView) -> Self {
        Self { stats }
    }
}

#[async_trait]
impl LiveView for SummaryCardsView {
    type Output = DashboardSummary;

    fn name(&self) -> &str {
        self.stats.name()
    }

    fn collections(&self) -> BTreeSet<WatchedCollection> {
        self.stats.collections()
    }

    async fn refresh(&self, store: &dyn RecordStoreTrait) -> Result<DashboardSummary> {
        let stats = self.stats.compute(store).await?;
        let cards = bind_summary_cards(&stats);
        Ok(DashboardSummary { stats, cards })
    }
}

/// Project status distribution as a pie chart.
pub fn project_status_chart() -> ChartView<GroupedCountView> {
    let view =
        GroupedCountView::by_field("project-status", WatchedCollection::Projects, STATUS_FIELD);
    let value_key = view.spec().value_field.clone();
    ChartView::new(view, ChartKind::Pie, value_key)
}

/// Equipment status distribution as a bar chart.
pub fn equipment_status_chart() -> ChartView<GroupedCountView> {
    let view =
        GroupedCountView::by_field("equipment-status", WatchedCollection::Equipment, STATUS_FIELD);
    let value_key = view.spec().value_field.clone();
    ChartView::new(view, ChartKind::Bar, value_key)
}

/// Projects per branch as a bar chart.
pub fn projects_by_branch_chart() -> ChartView<ProjectsPerBranchView> {
    ChartView::new(ProjectsPerBranchView::new(), ChartKind::Bar, "projects")
}
