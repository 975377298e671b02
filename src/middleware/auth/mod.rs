pub mod access;
pub mod scope;

pub use scope::{RequireScope, RequireScopeService, RequiredScopes};
