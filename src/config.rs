/*
 * Responsibility
 * - 環境変数の読み込み (Auth 設定、required scopes、HTTP limits)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::middleware::RequiredScopes;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,

    pub auth_issuer: String,
    pub auth_audience: String,
    pub access_token_leeway_seconds: u64,
    pub access_jwt_public_key_pem: String,

    /// Scopes accepted by `GET /api/v1/me`.
    pub required_scopes: RequiredScopes,

    pub request_timeout: Duration,
    pub request_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading from an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let auth_issuer = lookup("AUTH_ISSUER").ok_or(ConfigError::Missing("AUTH_ISSUER"))?;

        let auth_audience =
            lookup("AUTH_AUDIENCE").ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

        let access_token_leeway_seconds = lookup("ACCESS_TOKEN_LEEWAY_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let access_jwt_public_key_pem = lookup("ACCESS_JWT_PUBLIC_KEY_PEM")
            .ok_or(ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM"))?
            .replace("\\n", "\n");

        let required_scopes = RequiredScopes::new(
            lookup("REQUIRED_SCOPES")
                .unwrap_or_else(|| "read".to_string())
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        );

        let request_timeout = Duration::from_secs(
            lookup("REQUEST_TIMEOUT_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        );

        let request_body_limit_bytes = lookup("REQUEST_BODY_LIMIT_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        Ok(Self {
            addr,
            auth_issuer,
            auth_audience,
            access_token_leeway_seconds,
            access_jwt_public_key_pem,
            required_scopes,
            request_timeout,
            request_body_limit_bytes,
        })
    }
}
