// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Enclave page and script.
//!
//! The page is framed by wallets. It loads `index.js` with a freshly minted
//! CSRF token; the script relays the attestation ID it receives via
//! `postMessage`, together with the sender's origin, to `POST /attestation`.

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_SECURITY_POLICY, CONTENT_TYPE},
        HeaderValue,
    },
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, instrument};
use utoipa::IntoParams;

use crate::{
    csrf::{check_format, CsrfSession},
    enclave::PolicyOutcome,
    error::ApiError,
    state::AppState,
};

const INDEX_JS: &str = r#"// Verify enclave: relays attestations from the framing dApp.
(() => {
  const script = document.currentScript
  const params = script ? new URL(script.src).searchParams : new URLSearchParams()
  const token = params.get("token")

  window.addEventListener("message", (event) => {
    const attestationId = event.data
    const origin = event.origin
    if (typeof attestationId !== "string" || !attestationId) return

    const headers = { "content-type": "application/json" }
    if (token) headers["x-csrf-token"] = token

    fetch(`${window.location.protocol}//${window.location.host}/attestation`, {
      method: "POST",
      credentials: "include",
      headers,
      body: JSON.stringify({ attestationId, origin }),
    })
  })
})()
"#;

/// Project ID and token are restricted to `[0-9a-f]` and `[A-Za-z0-9_.-]`,
/// so they are inserted without escaping.
fn index_html(token: &str, project_id: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <script src="/index.js?token={token}&amp;projectId={project_id}"></script>
  </head>
</html>
"#
    )
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct IndexJsQuery {
    /// CSRF token minted for the enclave page.
    pub token: Option<String>,
    /// Project whose frame-ancestors policy applies to the script.
    pub project_id: Option<String>,
}

fn with_policy(mut response: Response, outcome: &PolicyOutcome) -> Result<Response, ApiError> {
    if let Some(csp) = outcome.header_value() {
        let value = HeaderValue::from_str(csp)
            .map_err(|_| ApiError::internal("Failed to encode Content-Security-Policy"))?;
        response.headers_mut().insert(CONTENT_SECURITY_POLICY, value);
    }
    Ok(response)
}

/// Enclave page for a project.
///
/// Carries the project's `Content-Security-Policy: frame-ancestors` header
/// and a freshly minted CSRF token.
#[utoipa::path(
    get,
    path = "/{project_id}",
    params(
        ("project_id" = String, Path, description = "32-character lowercase hex project ID")
    ),
    tag = "Enclave",
    responses(
        (status = 200, description = "Enclave page", body = String, content_type = "text/html"),
        (status = 400, description = "Malformed project ID"),
        (status = 404, description = "Unknown project, or no verified domain in prod")
    )
)]
#[instrument(skip(session, state))]
pub async fn enclave_page(
    Path(project_id): Path<String>,
    session: CsrfSession,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let outcome = state
        .policy
        .resolve(state.projects.as_ref(), &project_id)
        .await?;
    debug!(?outcome, "Resolved enclave policy");

    let issued = session.issue(&state.csrf);
    let csrf = state.csrf.response_headers(&issued)?;
    let response = (csrf, Html(index_html(&issued.token, &project_id))).into_response();

    with_policy(response, &outcome)
}

/// Enclave script.
///
/// A present `token` must be well-formed. A present `projectId` applies that
/// project's policy, with the same errors as the enclave page.
#[utoipa::path(
    get,
    path = "/index.js",
    params(IndexJsQuery),
    tag = "Enclave",
    responses(
        (status = 200, description = "Enclave script", body = String, content_type = "application/javascript"),
        (status = 400, description = "Malformed token or project ID"),
        (status = 404, description = "Unknown project, or no verified domain in prod")
    )
)]
#[instrument(skip(state))]
pub async fn index_js(
    State(state): State<AppState>,
    Query(query): Query<IndexJsQuery>,
) -> Result<Response, ApiError> {
    if let Some(token) = &query.token {
        check_format(token).map_err(|_| ApiError::bad_request("Invalid CSRF token"))?;
    }

    let outcome = match &query.project_id {
        Some(project_id) => {
            state
                .policy
                .resolve(state.projects.as_ref(), project_id)
                .await?
        }
        None => PolicyOutcome::NoPolicy,
    };

    let response = (
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (CONTENT_TYPE, "application/javascript; charset=utf-8"),
        ],
        INDEX_JS,
    )
        .into_response();

    with_policy(response, &outcome)
}
