use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    response::sse::{Event as SseEvent, KeepAlive, KeepAliveStream, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use labdash_core::dashboard::{
    equipment_status_chart, project_status_chart, projects_by_branch_chart, DashboardChart,
    DashboardSummary, SummaryCardsView,
};
use labdash_core::live::{LiveView, ViewMount, ViewState, ViewStateSink};
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::{wrappers::WatchStream, StreamExt};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

const VIEW_STATE_EVENT: &str = "view-state";

fn mount_view<V>(state: &AppState, view: V) -> (ViewMount, watch::Receiver<ViewState<V::Output>>)
where
    V: LiveView,
    V::Output: Sync,
{
    let (sink, rx) = ViewStateSink::new();
    let mount = state.coordinator.mount(view, Arc::new(sink));
    (mount, rx)
}

/// Turns a mounted view's state channel into SSE events. The stream owns the
/// mount, so the view is unmounted when the client disconnects.
fn view_events<T>(
    mount: ViewMount,
    rx: watch::Receiver<ViewState<T>>,
) -> impl Stream<Item = Result<SseEvent, Infallible>>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    tracing::debug!("Streaming view '{}'", mount.view_name());
    WatchStream::new(rx).filter_map(move |view_state| {
        let view_name = mount.view_name();
        match SseEvent::default()
            .event(VIEW_STATE_EVENT)
            .json_data(&view_state)
        {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                tracing::error!("Failed to encode state of view '{}': {}", view_name, err);
                None
            }
        }
    })
}

fn sse<S>(stream: S) -> Sse<KeepAliveStream<S>>
where
    S: Stream<Item = Result<SseEvent, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn stream_stats(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (mount, rx): (_, watch::Receiver<ViewState<DashboardSummary>>) =
        mount_view(&state, SummaryCardsView::default());
    sse(view_events(mount, rx))
}

async fn stream_chart(
    Path(chart): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let (mount, rx): (_, watch::Receiver<ViewState<DashboardChart>>) = match chart.as_str() {
        "project-status" => mount_view(&state, project_status_chart()),
        "equipment-status" => mount_view(&state, equipment_status_chart()),
        "projects-by-branch" => mount_view(&state, projects_by_branch_chart()),
        _ => return Err(ApiError::NotFound),
    };
    Ok(sse(view_events(mount, rx)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard/stats/stream", get(stream_stats))
        .route("/dashboard/charts/{chart}/stream", get(stream_chart))
}
