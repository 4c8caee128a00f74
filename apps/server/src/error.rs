use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use labdash_core::errors::{Error as CoreError, StoreError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("Not Found")]
    NotFound,
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::Core(e) => (core_status(e), e.to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", msg);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: msg,
        });
        (status, body).into_response()
    }
}

fn core_status(error: &CoreError) -> StatusCode {
    match error {
        CoreError::UnknownCollection(_) => StatusCode::NOT_FOUND,
        CoreError::InvalidRecord(_) | CoreError::InvalidSpec(_) => StatusCode::BAD_REQUEST,
        CoreError::Store(store) => match store {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::ConstraintViolation(_) => StatusCode::CONFLICT,
            StoreError::QueryFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            StoreError::ConnectionLost(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
