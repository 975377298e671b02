use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::api::v1::extractors::{Claim, Principal, SCOPE_CLAIM};

pub const ROLE_CLAIM: &str = "role";
pub const CLIENT_ID_CLAIM: &str = "client_id";

// Errors returned by access-token verification + strict claim validation.
#[derive(Debug, Error)]
pub enum AccessJwtError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("empty '{0}' claim")]
    EmptyClaim(&'static str),
}

/// `scope` claim as issued: a space-delimited string (RFC 9068) or an array with
/// one scope per element.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScopeValue {
    Delimited(String),
    List(Vec<String>),
}

impl ScopeValue {
    pub fn scopes(&self) -> Vec<&str> {
        match self {
            Self::Delimited(s) => s.split_whitespace().collect(),
            Self::List(items) => items
                .iter()
                .map(String::as_str)
                .filter(|s| !s.trim().is_empty())
                .collect(),
        }
    }
}

/// Access token (JWT) claims.
///
/// NOTE:
/// - `aud` in JWT can be either string or array; jsonwebtoken validates it via `Validation::set_audience`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    // Keep as Value to accept both string and array. Validation handles audience checks.
    #[serde(default)]
    pub aud: serde_json::Value,

    pub sub: String,
    pub exp: u64,

    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub scope: Option<ScopeValue>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl AccessTokenClaims {
    /// Flatten into principal claims: one `scope` claim per scope, one `role` per role.
    pub fn into_principal(self) -> Principal {
        let mut claims = Vec::new();

        if let Some(scope) = &self.scope {
            claims.extend(scope.scopes().into_iter().map(|s| Claim::new(SCOPE_CLAIM, s)));
        }
        for role in self.roles.unwrap_or_default() {
            claims.push(Claim::new(ROLE_CLAIM, role));
        }
        if let Some(client_id) = self.client_id {
            claims.push(Claim::new(CLIENT_ID_CLAIM, client_id));
        }

        Principal::authenticated(self.sub, claims)
    }
}

/// Access-token verifier.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct AuthService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("AuthService")
            .field("validation", &self.validation)
            .finish()
    }
}

impl AuthService {
    /// EdDSA (Ed25519) verifier from a PEM public key.
    pub fn new(
        access_public_key_pem: &str,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Result<Self, AccessJwtError> {
        let decoding_key = DecodingKey::from_ed_pem(access_public_key_pem.as_bytes())?;
        let validation = Self::validation(Algorithm::EdDSA, issuer, audience, leeway_seconds);

        Ok(Self::with_key(decoding_key, validation))
    }

    pub fn with_key(decoding_key: DecodingKey, validation: Validation) -> Self {
        Self {
            decoding_key,
            validation,
        }
    }

    /// Signature + `exp` + `iss` + `aud`, with `sub` required to be present.
    pub fn validation(
        algorithm: Algorithm,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = leeway_seconds;
        validation
    }

    // Verify and decode a JWT access token.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, AccessJwtError> {
        let data =
            jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;

        Ok(data.claims)
    }

    /// Verify, reject empty `iss` / `sub`, then build the request principal.
    ///
    /// This is the entry-point for the access middleware.
    pub fn verify_principal(&self, token: &str) -> Result<Principal, AccessJwtError> {
        let claims = self.verify(token)?;

        if claims.iss.trim().is_empty() {
            return Err(AccessJwtError::EmptyClaim("iss"));
        }
        if claims.sub.trim().is_empty() {
            return Err(AccessJwtError::EmptyClaim("sub"));
        }

        Ok(claims.into_principal())
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::{Value, json};

    use super::*;

    const SECRET: &[u8] = b"test-secret-test-secret-test-secret";
    const ISSUER: &str = "https://issuer.test";
    const AUDIENCE: &str = "api";

    fn service() -> AuthService {
        AuthService::with_key(
            DecodingKey::from_secret(SECRET),
            AuthService::validation(Algorithm::HS256, ISSUER, AUDIENCE, 0),
        )
    }

    fn mint(extra: Value) -> String {
        let mut claims = json!({
            "iss": ISSUER,
            "aud": AUDIENCE,
            "sub": "alice",
            "exp": chrono::Utc::now().timestamp() + 300,
        });
        if let (Some(base), Some(extra)) = (claims.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    #[test]
    fn space_delimited_scope_becomes_one_claim_per_scope() {
        let principal = service()
            .verify_principal(&mint(json!({ "scope": "read  write" })))
            .unwrap();

        assert!(principal.is_authenticated());
        assert_eq!(principal.subject(), Some("alice"));
        assert_eq!(principal.scopes().collect::<Vec<_>>(), vec!["read", "write"]);
    }

    #[test]
    fn array_scope_becomes_one_claim_per_element() {
        let principal = service()
            .verify_principal(&mint(json!({
                "scope": ["read", "", "admin"],
                "roles": ["ops"],
                "client_id": "cli",
            })))
            .unwrap();

        assert_eq!(principal.scopes().collect::<Vec<_>>(), vec!["read", "admin"]);
        assert_eq!(principal.find_claims(ROLE_CLAIM).collect::<Vec<_>>(), vec!["ops"]);
        assert_eq!(
            principal.find_claims(CLIENT_ID_CLAIM).collect::<Vec<_>>(),
            vec!["cli"]
        );
    }

    #[test]
    fn token_without_scope_yields_no_scope_claims() {
        let principal = service().verify_principal(&mint(json!({}))).unwrap();
        assert_eq!(principal.scopes().count(), 0);
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let err = service()
            .verify_principal(&mint(json!({ "aud": "other" })))
            .unwrap_err();
        assert!(matches!(err, AccessJwtError::Jwt(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = mint(json!({ "exp": chrono::Utc::now().timestamp() - 600 }));
        assert!(matches!(
            service().verify_principal(&token),
            Err(AccessJwtError::Jwt(_))
        ));
    }

    #[test]
    fn empty_subject_is_rejected() {
        let err = service()
            .verify_principal(&mint(json!({ "sub": "  " })))
            .unwrap_err();
        assert!(matches!(err, AccessJwtError::EmptyClaim("sub")));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(service().verify_principal("not-a-jwt").is_err());
    }
}
