//! access token（JWT）検証 → Principal を extensions に入れる
//!
//! - `Authorization` が無い、もしくは Bearer 以外: 匿名のまま次へ流す。
//!   token を必須にするかは handler / extractor 側の判断。
//! - `Authorization: Bearer <jwt>` が不正: 401 + `WWW-Authenticate: Bearer error="invalid_token"`
//! - 正常: 認証済み Principal を extensions に格納して次へ。
//!
//! scope の判定はここではしない（`scope` middleware の責務）。

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Router 全体に access token 検証を掛ける。
///
/// 例：
/// ```ignore
/// let v1 = api::v1::routes(&config);
/// let v1 = middleware::auth::access::apply(v1, state.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(req.headers()) else {
        return Ok(next.run(req).await);
    };

    let principal = match state.auth.verify_principal(token) {
        Ok(principal) => principal,
        Err(err) => {
            tracing::warn!(
                error = %err,
                "access token verification failed"
            );
            return Err(AppError::Unauthorized);
        }
    };

    tracing::debug!(subject = principal.subject().unwrap_or("-"), "access token verified");

    // middleware → scope guard / extractor への受け渡し
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}
