mod realtime;
mod route_history;

pub use realtime::*;
pub use route_history::*;

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

/// Pulls the caller's Authorization header so it can be forwarded verbatim.
pub(crate) fn authorization(headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Missing Authorization header" })),
            )
                .into_response()
        })
}

/// Mirrors the upstream response back to the caller. Vendor errors keep
/// their status and arrive wrapped; transport failures become a 500.
pub(crate) async fn forward(result: Result<reqwest::Response, reqwest::Error>) -> Response {
    let response = match result {
        Ok(response) => response,
        Err(err) => return upstream_failure(err),
    };

    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => return upstream_failure(err),
    };

    if status.is_success() {
        ([(header::CONTENT_TYPE, "application/json")], body).into_response()
    } else {
        warn!(status = status.as_u16(), "upstream returned an error");
        let status_code =
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status_code,
            Json(json!({
                "error": "Siam GPS API error",
                "status": status.as_u16(),
                "message": body,
            })),
        )
            .into_response()
    }
}

fn upstream_failure(err: reqwest::Error) -> Response {
    warn!(error = %err, "failed to reach Siam GPS");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Failed to fetch from Siam GPS",
            "message": err.to_string(),
        })),
    )
        .into_response()
}
