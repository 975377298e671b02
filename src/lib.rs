//! OAuth2 scope enforcement as a tower layer, plus the axum host pipeline that
//! feeds it (JWT access-token validation → `Principal` in request extensions).
//!
//! ```ignore
//! use scope_guard::RequireScope;
//!
//! let app = Router::new()
//!     .route("/orders", post(create_order))
//!     .route_layer(RequireScope::new(["orders:write"]));
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

pub use api::v1::extractors::{Claim, Principal, PrincipalExtractor, SCOPE_CLAIM};
pub use middleware::auth::scope::{Decision, insufficient_scope_response};
pub use middleware::{RequireScope, RequireScopeService, RequiredScopes};
