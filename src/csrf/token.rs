// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed CSRF tokens.
//!
//! ## Format
//!
//! ```text
//! base64url(json{sid, exp}) "." base64url(hmac_sha256(key, payload_b64))
//! ```
//!
//! `sid` is the session ID that is also set as the `verify_csrf` cookie; `exp`
//! is a unix timestamp in seconds. Tokens are reusable until `exp`.

use std::time::Duration;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use ring::{
    constant_time::verify_slices_are_equal,
    rand::{SecureRandom, SystemRandom},
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use super::CsrfError;
use crate::config::{CsrfConfig, MAX_CSRF_TOKEN_TTL};

type HmacSha256 = Hmac<Sha256>;

/// Request header carrying the token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Name of the session cookie paired with the token.
pub const SESSION_COOKIE: &str = "verify_csrf";

/// Longest string accepted as a token.
pub const MAX_TOKEN_LEN: usize = 512;

/// Size of a generated signing key.
const GENERATED_KEY_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sid: String,
    exp: i64,
}

/// A freshly minted token together with its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// `Set-Cookie` value carrying the session ID.
    ///
    /// `SameSite=None` because the enclave is always loaded inside a
    /// third-party frame.
    pub fn set_cookie(&self, ttl: Duration) -> String {
        format!(
            "{SESSION_COOKIE}={}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=None",
            self.session_id,
            ttl.as_secs()
        )
    }
}

/// Issues and verifies CSRF tokens with a process-wide HMAC key.
#[derive(Clone)]
pub struct CsrfTokens {
    /// Keyed HMAC state, cloned per operation
    mac: HmacSha256,
    ttl: Duration,
    require_cookie: bool,
}

impl CsrfTokens {
    /// `ttl` is capped at [`MAX_CSRF_TOKEN_TTL`].
    pub fn new(key: &[u8], ttl: Duration, require_cookie: bool) -> Result<Self, CsrfError> {
        if key.is_empty() {
            return Err(CsrfError::KeyUnavailable("empty key".to_string()));
        }
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| CsrfError::KeyUnavailable(e.to_string()))?;

        Ok(Self {
            mac,
            ttl: ttl.min(MAX_CSRF_TOKEN_TTL),
            require_cookie,
        })
    }

    /// Build from configuration, generating a random key if none is set.
    ///
    /// A generated key lives only as long as the process, so tokens do not
    /// survive restarts or validate across replicas.
    pub fn from_config(config: &CsrfConfig) -> Result<Self, CsrfError> {
        match &config.secret {
            Some(secret) => Self::new(secret, config.token_ttl, config.require_cookie),
            None => {
                let mut key = [0u8; GENERATED_KEY_LEN];
                SystemRandom::new()
                    .fill(&mut key)
                    .map_err(|_| CsrfError::KeyUnavailable("system RNG failed".to_string()))?;
                Self::new(&key, config.token_ttl, config.require_cookie)
            }
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a new random session ID.
    pub fn new_session_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Issue a token for `session_id`, expiring one TTL from now.
    pub fn issue(&self, session_id: &str) -> IssuedToken {
        self.issue_at(session_id, Utc::now())
    }

    pub fn issue_at(&self, session_id: &str, now: DateTime<Utc>) -> IssuedToken {
        let expires_at = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let claims = TokenClaims {
            sid: session_id.to_string(),
            exp: expires_at.timestamp(),
        };

        // Serializing a struct of a String and an i64 cannot fail.
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let payload_b64 = Base64UrlUnpadded::encode_string(&payload);
        let signature_b64 = Base64UrlUnpadded::encode_string(&self.sign(payload_b64.as_bytes()));

        IssuedToken {
            token: format!("{payload_b64}.{signature_b64}"),
            session_id: session_id.to_string(),
            expires_at,
        }
    }

    /// Verify a token, and its pairing with `cookie` when one is present.
    ///
    /// Returns the session ID the token was issued for.
    pub fn verify(&self, token: &str, cookie: Option<&str>) -> Result<String, CsrfError> {
        self.verify_at(token, cookie, Utc::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        cookie: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, CsrfError> {
        check_format(token)?;

        let (payload_b64, signature_b64) = token.split_once('.').ok_or(CsrfError::Malformed)?;
        let signature =
            Base64UrlUnpadded::decode_vec(signature_b64).map_err(|_| CsrfError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| CsrfError::InvalidSignature)?;

        let payload =
            Base64UrlUnpadded::decode_vec(payload_b64).map_err(|_| CsrfError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| CsrfError::Malformed)?;

        if claims.exp < now.timestamp() {
            return Err(CsrfError::Expired);
        }

        match cookie {
            Some(cookie) => {
                check_format(cookie).map_err(|_| CsrfError::CookieMismatch)?;
                verify_slices_are_equal(cookie.as_bytes(), claims.sid.as_bytes())
                    .map_err(|_| CsrfError::CookieMismatch)?;
                Ok(claims.sid)
            }
            None if self.require_cookie => Err(CsrfError::MissingCookie),
            None => Ok(claims.sid),
        }
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Allow-list format check shared by token verification and `index.js`.
///
/// Accepts 1 to [`MAX_TOKEN_LEN`] characters from `[A-Za-z0-9_.-]`.
pub fn check_format(token: &str) -> Result<(), CsrfError> {
    let allowed = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.');

    if token.is_empty() || token.len() > MAX_TOKEN_LEN || !token.bytes().all(allowed) {
        return Err(CsrfError::Malformed);
    }
    Ok(())
}
