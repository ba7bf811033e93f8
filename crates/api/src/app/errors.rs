use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use warden_core::{ErrorKind, ServiceError, ServiceResult};

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Client errors keep their message; internal ones were logged at the origin
/// and are reported generically.
pub fn service_error(err: ServiceError) -> Response {
    match err.kind() {
        ErrorKind::Client => {
            json_error(StatusCode::BAD_REQUEST, "invalid_request", err.public_message())
        }
        _ => json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", err.public_message()),
    }
}

pub fn forbidden() -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "insufficient permissions")
}

pub fn bad_path(message: &'static str) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_path", message)
}

/// Successful body with `status`, or the mapped error.
pub fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(e) => service_error(e),
    }
}

/// Like [`respond`], with `None` meaning the actor lacked permission.
pub fn respond_permitted<T: Serialize>(
    status: StatusCode,
    result: ServiceResult<Option<T>>,
) -> Response {
    match result {
        Ok(Some(body)) => (status, axum::Json(body)).into_response(),
        Ok(None) => forbidden(),
        Err(e) => service_error(e),
    }
}

/// `true` → 204, `false` → 403.
pub fn respond_done(result: ServiceResult<bool>) -> Response {
    match result {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => forbidden(),
        Err(e) => service_error(e),
    }
}
