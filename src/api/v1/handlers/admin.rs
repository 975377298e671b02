use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::api::v1::extractors::PrincipalExtractor;

pub const ADMIN_SCOPE: &str = "admin";

/// POST /admin/ping
pub async fn ping(PrincipalExtractor(principal): PrincipalExtractor) -> impl IntoResponse {
    tracing::info!(subject = principal.subject().unwrap_or("-"), "admin ping");
    (StatusCode::OK, Json(json!({"pong": true})))
}
