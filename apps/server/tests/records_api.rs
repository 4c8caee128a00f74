use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use futures::StreamExt;
use labdash_server::{api::app_router, build_state, config::Config};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

async fn build_test_router() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        db_path: dir.path().join("labdash.db").to_str().unwrap().to_string(),
        ..Config::default()
    };
    let state = build_state(&config).await.unwrap();
    (dir, app_router(state, &config))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_is_ok() {
    let (_dir, app) = build_test_router().await;
    let response = app.oneshot(get("/api/v1/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_then_list_records() {
    let (_dir, app) = build_test_router().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/collections/branches/records",
            json!({"name": "North Lab", "location": "Oslo"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert!(created["id"].as_str().is_some_and(|id| !id.is_empty()));

    let response = app
        .oneshot(get("/api/v1/collections/branches/records"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], json!("North Lab"));
}

#[tokio::test]
async fn invalid_record_is_bad_request() {
    let (_dir, app) = build_test_router().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/collections/branches/records",
            json!({"location": "Oslo"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!(400));
}

#[tokio::test]
async fn unknown_collection_is_not_found() {
    let (_dir, app) = build_test_router().await;
    let response = app
        .oneshot(get("/api/v1/collections/invoices/records"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_and_delete_record() {
    let (_dir, app) = build_test_router().await;
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/collections/clients/records",
            json!({"id": "c1", "name": "Acme"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/collections/clients/records/c1",
            json!({"name": "Acme Corp"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], json!("Acme Corp"));

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri("/api/v1/collections/clients/records/c1")
            .body(Body::empty())
            .unwrap()
    };
    let response = app.clone().oneshot(delete()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app.oneshot(delete()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_stream_sends_view_state_events() {
    let (_dir, app) = build_test_router().await;
    let response = app
        .oneshot(get("/api/v1/dashboard/stats/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    let mut frames = response.into_body().into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(2), frames.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.contains("event: view-state"), "got {}", text);
    assert!(text.contains("\"status\""), "got {}", text);
}

#[tokio::test]
async fn unknown_chart_is_not_found() {
    let (_dir, app) = build_test_router().await;
    let response = app
        .oneshot(get("/api/v1/dashboard/charts/revenue/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_id_is_conflict() {
    let (_dir, app) = build_test_router().await;
    let create = || {
        json_request(
            "POST",
            "/api/v1/collections/clients/records",
            json!({"id": "c1", "name": "Acme"}),
        )
    };

    let response = app.clone().oneshot(create()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = app.oneshot(create()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], json!(409));
}
