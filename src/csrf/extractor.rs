// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for CSRF-protected and token-minting endpoints.
//!
//! ```rust,ignore
//! async fn post(CsrfProtected(session): CsrfProtected, ...) { ... }
//!
//! async fn page(session: CsrfSession, State(state): State<AppState>) -> impl IntoResponse {
//!     let issued = session.issue(&state.csrf);
//!     (state.csrf.response_headers(&issued)?, Html(PAGE))
//! }
//! ```

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        header::{CACHE_CONTROL, COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderName, HeaderValue,
    },
    response::{IntoResponseParts, ResponseParts},
};
use tracing::warn;

use super::{check_format, CsrfError, CsrfTokens, IssuedToken, CSRF_HEADER, SESSION_COOKIE};
use crate::{error::ApiError, state::AppState};

/// Extractor that requires a valid CSRF token.
///
/// Reads the token from the `x-csrf-token` header and the session from the
/// `verify_csrf` cookie. Yields the verified session ID.
pub struct CsrfProtected(pub String);

impl FromRequestParts<AppState> for CsrfProtected {
    type Rejection = CsrfError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(CSRF_HEADER)
            .ok_or(CsrfError::MissingToken)?
            .to_str()
            .map_err(|_| CsrfError::Malformed)?;

        // A cookie that is present but malformed is a mismatch, not an absence.
        let cookie = raw_session_cookie(&parts.headers);

        state
            .csrf
            .verify(token, cookie.as_deref())
            .map(CsrfProtected)
            .inspect_err(|e| warn!(error_code = e.error_code(), "CSRF check failed"))
    }
}

/// Session of the caller, if it already holds a session cookie.
///
/// Used by endpoints that mint tokens so a browser keeps one session across
/// enclave loads.
pub struct CsrfSession(pub Option<String>);

impl CsrfSession {
    /// Issue a token for the existing session, or a new one.
    pub fn issue(&self, tokens: &CsrfTokens) -> IssuedToken {
        let session_id = self.0.clone().unwrap_or_else(CsrfTokens::new_session_id);
        tokens.issue(&session_id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CsrfSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CsrfSession(session_cookie(&parts.headers)))
    }
}

/// Response headers delivering a minted token and its cookie.
pub struct CsrfHeaders {
    token: HeaderValue,
    cookie: HeaderValue,
}

impl CsrfTokens {
    pub fn response_headers(&self, issued: &IssuedToken) -> Result<CsrfHeaders, ApiError> {
        let token = HeaderValue::from_str(&issued.token)
            .map_err(|_| ApiError::internal("Failed to encode CSRF token"))?;
        let cookie = HeaderValue::from_str(&issued.set_cookie(self.ttl()))
            .map_err(|_| ApiError::internal("Failed to encode CSRF cookie"))?;

        Ok(CsrfHeaders { token, cookie })
    }
}

impl IntoResponseParts for CsrfHeaders {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let headers = res.headers_mut();
        headers.insert(HeaderName::from_static(CSRF_HEADER), self.token);
        headers.append(SET_COOKIE, self.cookie);
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        Ok(res)
    }
}

/// Value of the session cookie, when present and well-formed.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    raw_session_cookie(headers).filter(|value| check_format(value).is_ok())
}

fn raw_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}
