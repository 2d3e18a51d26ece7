// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CSRF errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// CSRF rejection reason.
///
/// Every rejection of a request maps to `403 Forbidden`. `KeyUnavailable`
/// can only happen while building the token service at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsrfError {
    /// No `x-csrf-token` header on a mutating request
    MissingToken,
    /// Token is not a well-formed signed structure
    Malformed,
    /// Token signature does not match its payload
    InvalidSignature,
    /// Token `exp` is in the past
    Expired,
    /// Session cookie does not belong to the token
    CookieMismatch,
    /// Cookie is required but was not sent
    MissingCookie,
    /// Signing key could not be created
    KeyUnavailable(String),
}

#[derive(Serialize)]
struct CsrfErrorBody {
    error: String,
    error_code: String,
}

impl CsrfError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            CsrfError::MissingToken => "missing_token",
            CsrfError::Malformed => "malformed",
            CsrfError::InvalidSignature => "invalid_signature",
            CsrfError::Expired => "expired",
            CsrfError::CookieMismatch => "cookie_mismatch",
            CsrfError::MissingCookie => "missing_cookie",
            CsrfError::KeyUnavailable(_) => "key_unavailable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CsrfError::KeyUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::FORBIDDEN,
        }
    }
}

impl std::fmt::Display for CsrfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CsrfError::MissingToken => write!(f, "CSRF token is required"),
            CsrfError::Malformed => write!(f, "CSRF token is malformed"),
            CsrfError::InvalidSignature => write!(f, "CSRF token signature is invalid"),
            CsrfError::Expired => write!(f, "CSRF token has expired"),
            CsrfError::CookieMismatch => write!(f, "CSRF token does not match the session cookie"),
            CsrfError::MissingCookie => write!(f, "CSRF session cookie is required"),
            CsrfError::KeyUnavailable(msg) => write!(f, "CSRF signing key unavailable: {msg}"),
        }
    }
}

impl std::error::Error for CsrfError {}

impl IntoResponse for CsrfError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(CsrfErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
