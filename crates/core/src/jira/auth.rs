//! Authentication strategy selection.
//!
//! Picks how credentials are attached to outgoing requests. Selection is pure:
//! nothing here touches the network, so a bad credential only shows up on the
//! first real request.

use std::fmt;

use crate::error::{Error, Result};

pub const BASIC_AUTH: &str = "basic_auth";
pub const TOKEN_AUTH: &str = "token_auth";

/// Raw authentication settings as read from configuration.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub method: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("method", &self.method)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// How credentials are attached to each request.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    /// `Authorization: Basic base64(username:secret)`; the secret is a password or API token.
    Basic { username: String, secret: String },
    /// `Authorization: Bearer <token>` (personal access token).
    Token { token: String },
}

impl AuthStrategy {
    pub fn method(&self) -> &'static str {
        match self {
            AuthStrategy::Basic { .. } => BASIC_AUTH,
            AuthStrategy::Token { .. } => TOKEN_AUTH,
        }
    }
}

impl fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStrategy::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("secret", &"<redacted>")
                .finish(),
            AuthStrategy::Token { .. } => f
                .debug_struct("Token")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// Blank values count as absent; present values are kept verbatim.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn basic(config: &AuthConfig) -> Option<AuthStrategy> {
    let username = present(&config.username)?;
    // Password wins over token when both are configured.
    let secret = present(&config.password).or_else(|| present(&config.token))?;
    Some(AuthStrategy::Basic {
        username: username.to_string(),
        secret: secret.to_string(),
    })
}

fn token(config: &AuthConfig) -> Option<AuthStrategy> {
    present(&config.token).map(|token| AuthStrategy::Token {
        token: token.to_string(),
    })
}

/// Select the authentication strategy described by `config`.
///
/// Without a declared method the strategy is inferred: a username with a
/// password or token means basic auth, a lone token means token auth.
///
/// # Errors
/// Returns [`Error::Configuration`] when the declared method is unknown or
/// its credentials are incomplete.
pub fn select(config: &AuthConfig) -> Result<AuthStrategy> {
    let method = present(&config.method).map(|m| m.trim().to_ascii_lowercase());
    match method.as_deref() {
        Some(BASIC_AUTH) => basic(config).ok_or_else(|| {
            Error::Configuration(
                "basic_auth requires a username and either a password or an API token".into(),
            )
        }),
        Some(TOKEN_AUTH) => token(config)
            .ok_or_else(|| Error::Configuration("token_auth requires a token".into())),
        Some(other) => Err(Error::Configuration(format!(
            "Unknown auth method '{other}', expected '{BASIC_AUTH}' or '{TOKEN_AUTH}'"
        ))),
        None => basic(config).or_else(|| token(config)).ok_or_else(|| {
            Error::Configuration(
                "No credentials configured: set a username with a password/token, or a token"
                    .into(),
            )
        }),
    }
}
