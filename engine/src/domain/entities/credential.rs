//! Operator credential
//!
//! Passed explicitly into every backend call instead of living in ambient
//! global state.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ModerationError;

/// Bearer token plus optional expiry
#[derive(Clone, PartialEq)]
pub struct Credential {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

impl Credential {
    /// Wrap a bearer token. JWT-shaped tokens get their expiry from `exp`.
    pub fn bearer(token: impl Into<String>) -> Self {
        let token = token.into().trim().to_string();
        let expires_at = jwt_expiry(&token);
        Self { token, expires_at }
    }

    /// A credential that fails every call
    pub fn anonymous() -> Self {
        Self {
            token: String::new(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Fail with `Unauthorized` if the token is missing or expired at `now`
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ModerationError> {
        if self.token.is_empty() {
            return Err(ModerationError::Unauthorized(
                "no admin credential".to_string(),
            ));
        }
        match self.expires_at {
            Some(expires_at) if expires_at <= now => Err(ModerationError::Unauthorized(
                format!("admin credential expired at {}", expires_at),
            )),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: JwtClaims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}
