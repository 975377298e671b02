mod principal;

pub use principal::{Claim, Principal, PrincipalExtractor, SCOPE_CLAIM};
