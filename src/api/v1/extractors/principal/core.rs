use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};

use super::Principal;

/// Handler で Principal を受け取るための extractor
/// access middleware が Principal を request.extensions() に insert 済みである前提
/// 見つからない、もしくは未認証なら 401 を返す
pub struct PrincipalExtractor(pub Principal);

impl<S> FromRequestParts<S> for PrincipalExtractor
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .filter(|p| p.is_authenticated())
            .cloned()
            .map(PrincipalExtractor)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
