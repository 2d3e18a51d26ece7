// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # CSRF Protection
//!
//! Double-submit CSRF protection for the attestation endpoint.
//!
//! ## Flow
//!
//! 1. Loading the enclave (`GET /:projectId`) or `GET /attestation[/:id]`
//!    mints a signed token (`x-csrf-token` response header) and sets the
//!    `verify_csrf` session cookie.
//! 2. `POST /attestation` must carry the token in `x-csrf-token`. The token's
//!    signature and expiry are checked, and when the cookie is sent it must
//!    name the same session.
//!
//! ## Security
//!
//! - Tokens are HMAC-SHA256 signed with a process-wide key
//! - Tokens expire after a fixed TTL and are not single-use
//! - Every rejection is a `403`

pub mod error;
pub mod extractor;
pub mod token;

pub use error::CsrfError;
pub use extractor::{CsrfProtected, CsrfSession};
pub use token::{check_format, CsrfTokens, IssuedToken, CSRF_HEADER, SESSION_COOKIE};
