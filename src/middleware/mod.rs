/*
 * Responsibility
 * - middleware の公開インターフェース (re-export)
 * - auth::access (token 検証), auth::scope (scope 認可), http (横断的関心事)
 */
pub mod auth;
pub mod http;

pub use auth::{RequireScope, RequireScopeService, RequiredScopes};
