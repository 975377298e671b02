//! End-to-end: http layers → access token → scope guard → handler, in-process.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{Value, json};
use tower::ServiceExt;

use scope_guard::RequiredScopes;
use scope_guard::app::build_router;
use scope_guard::middleware::http::HttpLimits;
use scope_guard::services::auth::AuthService;
use scope_guard::state::AppState;

const SECRET: &[u8] = b"pipeline-secret-pipeline-secret!";
const ISSUER: &str = "https://issuer.test";
const AUDIENCE: &str = "api";

fn app() -> Router {
    let auth = AuthService::with_key(
        DecodingKey::from_secret(SECRET),
        AuthService::validation(Algorithm::HS256, ISSUER, AUDIENCE, 0),
    );
    build_router(
        AppState::new(Arc::new(auth)),
        RequiredScopes::new(["read"]),
        HttpLimits::default(),
    )
}

fn token(scope: Value) -> String {
    let claims = json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": "alice",
        "exp": chrono::Utc::now().timestamp() + 300,
        "scope": scope,
    });
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap()
}

fn get_me(bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::get("/api/v1/me").header(header::ORIGIN, "https://a.example");
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_open() {
    let req = Request::get("/api/v1/health").body(Body::empty()).unwrap();
    let res = app().oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn matching_scope_reaches_handler() {
    let res = app().oneshot(get_me(Some(&token(json!("read write"))))).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(header::WWW_AUTHENTICATE).is_none());
    let body = json_body(res).await;
    assert_eq!(body["subject"], "alice");
    assert_eq!(body["scopes"], json!(["read", "write"]));
}

#[tokio::test]
async fn insufficient_scope_is_forbidden_with_mirrored_origin() {
    let res = app().oneshot(get_me(Some(&token(json!("admin"))))).await.unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        r#"Bearer error="insufficient_scope""#
    );
    assert_eq!(
        res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://a.example"
    );
    assert!(res.headers().get("access-control-allow-method").is_none());
}

#[tokio::test]
async fn array_scope_claim_is_accepted() {
    let res = app().oneshot(get_me(Some(&token(json!(["write", "read"]))))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_request_passes_guard_and_handler_answers_401() {
    let res = app().oneshot(get_me(None)).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let res = app().oneshot(get_me(Some("not-a-jwt"))).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        r#"Bearer error="invalid_token""#
    );
    let body = json_body(res).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn admin_route_requires_admin_scope() {
    let post = |t: String| {
        Request::post("/api/v1/admin/ping")
            .header(header::AUTHORIZATION, format!("Bearer {t}"))
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let res = app().oneshot(post(token(json!("read")))).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.headers().get("access-control-allow-method").unwrap(), "POST");
    assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

    let res = app().oneshot(post(token(json!("admin")))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
