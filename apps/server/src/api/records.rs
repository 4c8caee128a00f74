use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use labdash_core::records::{Record, RecordStoreTrait, WatchedCollection};

use crate::{error::ApiResult, main_lib::AppState};

async fn list_records(
    Path(collection): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Record>>> {
    let collection: WatchedCollection = collection.parse()?;
    let set = state.store.read_all(collection).await?;
    Ok(Json(set.records))
}

async fn create_record(
    Path(collection): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(record): Json<Record>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    let collection: WatchedCollection = collection.parse()?;
    let created = state.store.insert(collection, record).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_record(
    Path((collection, id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(record): Json<Record>,
) -> ApiResult<Json<Record>> {
    let collection: WatchedCollection = collection.parse()?;
    let updated = state.store.update(collection, &id, record).await?;
    Ok(Json(updated))
}

async fn delete_record(
    Path((collection, id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    let collection: WatchedCollection = collection.parse()?;
    state.store.delete(collection, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/collections/{collection}/records",
            get(list_records).post(create_record),
        )
        .route(
            "/collections/{collection}/records/{id}",
            put(update_record).delete(delete_record),
        )
}
