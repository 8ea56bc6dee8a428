//! HTTP routes for Guildhall

pub mod health;
pub mod lists;
pub mod members;

pub use health::{health_check, readiness_check, version_info};
pub use lists::handle_lists_request;
pub use members::handle_members_request;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::GuildError;

/// API error response body
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

/// Build a successful JSON response
pub(crate) fn json_response<T: Serialize>(status: StatusCode, data: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(data).unwrap_or_default();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from(r#"{"error":"Internal error"}"#)))
                .unwrap()
        })
}

/// Build a JSON error response
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ApiError {
            error: message.to_string(),
        },
    )
}

/// Map a `GuildError` onto its HTTP status
pub(crate) fn guild_error_response(err: GuildError) -> Response<Full<Bytes>> {
    let (status, body) = err.into_status_code_and_body();
    error_response(status, &body)
}
