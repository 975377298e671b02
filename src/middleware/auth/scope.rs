//! OAuth2 scope enforcement for already-authenticated requests.
//!
//! Responsibility:
//! - access middleware が extensions に載せた `Principal` の `scope` claim を見て、
//!   必要な scope のどれか 1 つを持っていれば次の stage へ流す。
//! - 持っていなければ 403 + `WWW-Authenticate: Bearer error="insufficient_scope"` を返し、
//!   inner service は呼ばない。
//!
//! Rules:
//! - Principal が無い / 未認証ならそのまま通す（token 必須かどうかは上流の判断）。
//! - 比較は完全一致・大文字小文字区別。複数の required scope は OR。
//! - required scope が空なら、認証済みリクエストは必ず 403 になる。
//!
//! On rejection the caller's own `Origin`, `Access-Control-Request-Method` and
//! `Access-Control-Request-Headers` values are echoed back as
//! `Access-Control-Allow-Origin`, `Access-Control-Allow-Method` and
//! `Access-Control-Allow-Headers` so browsers can read the 403. No allow-list is
//! applied here; the response is already a rejection.
//!
//! 例：
//! ```ignore
//! let admin = Router::new()
//!     .route("/admin/ping", post(ping))
//!     .route_layer(RequireScope::new(["admin"]));
//! ```

use std::fmt;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Router;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, header};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::api::v1::extractors::Principal;

pub const INSUFFICIENT_SCOPE_CHALLENGE: &str = r#"Bearer error="insufficient_scope""#;

// Singular form, not the standard `access-control-allow-methods`.
pub const ACCESS_CONTROL_ALLOW_METHOD: HeaderName =
    HeaderName::from_static("access-control-allow-method");

/// Immutable set of scopes an endpoint accepts. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RequiredScopes(Arc<[String]>);

impl RequiredScopes {
    pub fn new<I, T>(scopes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self(scopes.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope)
    }

    /// True when at least one of the principal's `scope` claims is required here.
    /// No scope claims, or an empty requirement, never matches.
    pub fn is_satisfied_by(&self, principal: &Principal) -> bool {
        principal.scopes().any(|scope| self.contains(scope))
    }
}

impl fmt::Display for RequiredScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No authenticated principal; scope enforcement does not apply.
    Anonymous,
    Granted,
    InsufficientScope,
}

impl Decision {
    pub fn for_principal(scopes: &RequiredScopes, principal: Option<&Principal>) -> Self {
        match principal {
            Some(p) if p.is_authenticated() => {
                if scopes.is_satisfied_by(p) {
                    Self::Granted
                } else {
                    Self::InsufficientScope
                }
            }
            _ => Self::Anonymous,
        }
    }

    pub fn passes(self) -> bool {
        !matches!(self, Self::InsufficientScope)
    }
}

/// Apply the scope guard to every route already registered on `router`.
///
/// Uses `route_layer`, so unmatched paths still answer 404 rather than 403.
/// `router` must have at least one route.
pub fn apply<S>(router: Router<S>, scopes: RequiredScopes) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(RequireScope::from(scopes))
}

/// Layer that wraps a service with [`RequireScopeService`].
#[derive(Debug, Clone)]
pub struct RequireScope {
    scopes: RequiredScopes,
}

impl RequireScope {
    pub fn new<I, T>(scopes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            scopes: RequiredScopes::new(scopes),
        }
    }

    pub fn scopes(&self) -> &RequiredScopes {
        &self.scopes
    }
}

impl From<RequiredScopes> for RequireScope {
    fn from(scopes: RequiredScopes) -> Self {
        Self { scopes }
    }
}

impl<S> Layer<S> for RequireScope {
    type Service = RequireScopeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireScopeService {
            inner,
            scopes: self.scopes.clone(),
        }
    }
}

/// Service produced by [`RequireScope`].
#[derive(Debug, Clone)]
pub struct RequireScopeService<S> {
    inner: S,
    scopes: RequiredScopes,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequireScopeService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Default,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, ResBody, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let principal = req.extensions().get::<Principal>();
        let decision = Decision::for_principal(&self.scopes, principal);

        match decision {
            Decision::Anonymous => {
                tracing::trace!("no authenticated principal, scope check skipped");
            }
            Decision::Granted => {
                tracing::debug!(required = %self.scopes, "scope check passed");
            }
            Decision::InsufficientScope => {
                tracing::info!(
                    subject = principal.and_then(Principal::subject).unwrap_or("-"),
                    required = %self.scopes,
                    "insufficient scope"
                );
                return ResponseFuture::Rejected {
                    fut: ready(Ok(insufficient_scope_response(req.headers()))),
                };
            }
        }

        ResponseFuture::Inner {
            fut: self.inner.call(req),
        }
    }
}

pin_project! {
    /// Future for [`RequireScopeService`].
    #[project = ResponseFutureProj]
    pub enum ResponseFuture<F, B, E> {
        Inner { #[pin] fut: F },
        Rejected { fut: Ready<Result<Response<B>, E>> },
    }
}

impl<F, B, E> Future for ResponseFuture<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ResponseFutureProj::Inner { fut } => fut.poll(cx),
            ResponseFutureProj::Rejected { fut } => Pin::new(fut).poll(cx),
        }
    }
}

/// 403 response for a request whose principal lacks every required scope.
pub fn insufficient_scope_response<B: Default>(request_headers: &HeaderMap) -> Response<B> {
    let mut res = Response::new(B::default());
    *res.status_mut() = StatusCode::FORBIDDEN;

    let headers = res.headers_mut();
    headers.append(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(INSUFFICIENT_SCOPE_CHALLENGE),
    );
    mirror_cors_headers(request_headers, headers);

    res
}

fn mirror_cors_headers(request: &HeaderMap, response: &mut HeaderMap) {
    mirror(request, response, &header::ORIGIN, &header::ACCESS_CONTROL_ALLOW_ORIGIN);
    mirror(
        request,
        response,
        &header::ACCESS_CONTROL_REQUEST_METHOD,
        &ACCESS_CONTROL_ALLOW_METHOD,
    );
    mirror(
        request,
        response,
        &header::ACCESS_CONTROL_REQUEST_HEADERS,
        &header::ACCESS_CONTROL_ALLOW_HEADERS,
    );
}

// Every value is copied verbatim and in order; an absent header adds nothing.
fn mirror(request: &HeaderMap, response: &mut HeaderMap, from: &HeaderName, to: &HeaderName) {
    for value in request.get_all(from) {
        response.append(to, value.clone());
    }
}
