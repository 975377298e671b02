/*
 * Responsibility
 * - 認証ステージが request extensions に格納する「呼び出し元の主体」の型
 * - middleware (access / scope) と handler の両方がこの型だけを見る
 *
 * Notes
 * - token の検証ロジックは services/auth 側の責務
 * - extensions に Principal が無い = 匿名リクエスト
 */

/// Claim key carrying OAuth2 scopes.
pub const SCOPE_CLAIM: &str = "scope";

/// A single `(key, value)` claim on a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub key: String,
    pub value: String,
}

impl Claim {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Resolved caller identity for one request.
///
/// - `subject` は token の `sub`（匿名なら None）
/// - 同じ key の claim は複数持てる（`scope` が典型）
#[derive(Debug, Clone, Default)]
pub struct Principal {
    subject: Option<String>,
    authenticated: bool,
    claims: Vec<Claim>,
}

impl Principal {
    pub fn authenticated(subject: impl Into<String>, claims: Vec<Claim>) -> Self {
        Self {
            subject: Some(subject.into()),
            authenticated: true,
            claims,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Values of every claim stored under `key`, in insertion order.
    /// Zero results is a normal outcome.
    pub fn find_claims<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.key == key)
            .map(|c| c.value.as_str())
    }

    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.find_claims(SCOPE_CLAIM)
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_claims_returns_every_value_for_key() {
        let p = Principal::authenticated(
            "alice",
            vec![
                Claim::new("scope", "read"),
                Claim::new("role", "admin"),
                Claim::new("scope", "write"),
            ],
        );

        let scopes: Vec<_> = p.find_claims("scope").collect();
        assert_eq!(scopes, vec!["read", "write"]);
        assert_eq!(p.find_claims("missing").count(), 0);
    }

    #[test]
    fn anonymous_has_no_subject_or_claims() {
        let p = Principal::anonymous();
        assert!(!p.is_authenticated());
        assert!(p.subject().is_none());
        assert_eq!(p.scopes().count(), 0);
    }
}
