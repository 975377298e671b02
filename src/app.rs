/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (HTTP 横断 / access token / scope)
 * - axum::serve() で起動
 */
use anyhow::Result;
use axum::Router;
use tracing_subscriber::EnvFilter;

use crate::{
    api,
    config::Config,
    middleware::{self, RequiredScopes, http::HttpLimits},
    services::auth::build_auth_service,
    state::AppState,
};

pub async fn run() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let auth = build_auth_service(&config)?;
    let state = AppState::new(auth);

    let app = build_router(
        state,
        config.required_scopes.clone(),
        HttpLimits::from(&config),
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(
        addr = %config.addr,
        required_scopes = %config.required_scopes,
        "listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Full pipeline: http layers → access token → scope guard → handler.
pub fn build_router(state: AppState, me_scopes: RequiredScopes, limits: HttpLimits) -> Router {
    let v1 = api::v1::routes(me_scopes);
    let v1 = middleware::auth::access::apply(v1, state.clone());

    let app = Router::new().nest("/api/v1", v1).with_state(state);
    middleware::http::apply(app, limits)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
