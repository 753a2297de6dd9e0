use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::outcome::Outcome;

/// Acknowledge an authenticated delivery the downstream handler accepted.
pub fn accepted(request_id: Option<&str>) -> Response {
    let rid = request_id.unwrap_or("n/a");
    let mut response = (
        StatusCode::OK,
        Json(json!({ "status": "accepted", "request_id": rid })),
    )
        .into_response();
    response.extensions_mut().insert(Outcome::Forwarded);
    response
}
