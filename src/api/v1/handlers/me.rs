/*
 * Responsibility
 * - GET /me: token の subject と scope を返す
 * - scope guard は routes 側で掛ける。ここに来た時点で scope は満たされている
 */
use axum::Json;
use serde::Serialize;

use crate::api::v1::extractors::PrincipalExtractor;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub subject: Option<String>,
    pub scopes: Vec<String>,
}

pub async fn me(PrincipalExtractor(principal): PrincipalExtractor) -> Json<MeResponse> {
    Json(MeResponse {
        subject: principal.subject().map(str::to_string),
        scopes: principal.scopes().map(str::to_string).collect(),
    })
}
