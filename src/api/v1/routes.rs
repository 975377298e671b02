/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - scope が必要な範囲はここで route_layer (scope guard) を掛ける
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    admin::{ADMIN_SCOPE, ping},
    health::health,
    me::me,
};
use crate::middleware::auth::scope::{self, RequiredScopes};
use crate::state::AppState;

/// `me_scopes` guards `/me`; `/admin/*` always requires `admin`.
pub fn routes(me_scopes: RequiredScopes) -> Router<AppState> {
    let me_routes = scope::apply(Router::new().route("/me", get(me)), me_scopes);

    let admin_routes = scope::apply(
        Router::new().route("/admin/ping", post(ping)),
        RequiredScopes::new([ADMIN_SCOPE]),
    );

    Router::new()
        .route("/health", get(health))
        .merge(me_routes)
        .merge(admin_routes)
}
