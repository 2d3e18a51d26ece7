// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
        },
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use tracing::{info, instrument};

use crate::{
    csrf::{CsrfProtected, CsrfSession},
    error::ApiError,
    models::{Attestation, AttestationRequest, AttestationResponse},
    scam_guard::classify_best_effort,
    state::AppState,
};

const PREFLIGHT_MAX_AGE_SECS: &str = "86400";

/// Mint a CSRF token and session cookie.
///
/// The token is returned in the `x-csrf-token` response header.
#[utoipa::path(
    get,
    path = "/attestation",
    tag = "Attestation",
    responses(
        (status = 204, description = "Token minted", headers(
            ("x-csrf-token" = String, description = "CSRF token for POST /attestation"),
            ("set-cookie" = String, description = "Session cookie bound to the token")
        ))
    )
)]
pub async fn mint_token(
    session: CsrfSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = session.issue(&state.csrf);
    Ok((state.csrf.response_headers(&issued)?, StatusCode::NO_CONTENT))
}

#[utoipa::path(
    get,
    path = "/attestation/{attestation_id}",
    params(
        ("attestation_id" = String, Path, description = "Attestation identifier")
    ),
    tag = "Attestation",
    responses(
        (status = 200, body = AttestationResponse),
        (status = 404, description = "No attestation with this ID")
    )
)]
#[instrument(skip(session, state))]
pub async fn get_attestation(
    Path(attestation_id): Path<String>,
    session: CsrfSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = session.issue(&state.csrf);
    let csrf = state.csrf.response_headers(&issued)?;

    let response = match state.attestations.get_attestation(&attestation_id).await? {
        Some(attestation) => (csrf, Json(AttestationResponse::from(attestation))).into_response(),
        None => (csrf, ApiError::not_found("Attestation not found")).into_response(),
    };

    Ok(([(ACCESS_CONTROL_ALLOW_ORIGIN, "*")], response))
}

/// CORS preflight for attestation reads. Answers identically for every ID.
#[utoipa::path(
    options,
    path = "/attestation/{attestation_id}",
    params(
        ("attestation_id" = String, Path, description = "Attestation identifier")
    ),
    tag = "Attestation",
    responses((status = 204))
)]
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "content-type"),
            (ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE_SECS),
        ],
    )
}

/// Record the origin an attestation was made from.
///
/// Requires a valid `x-csrf-token`; when the session cookie is sent it must
/// belong to the same session. An existing attestation is overwritten.
#[utoipa::path(
    post,
    path = "/attestation",
    request_body = AttestationRequest,
    params(
        ("x-csrf-token" = String, Header, description = "CSRF token minted by the enclave")
    ),
    tag = "Attestation",
    responses(
        (status = 200, description = "Attestation stored"),
        (status = 400, description = "Invalid body"),
        (status = 403, description = "CSRF check failed")
    )
)]
#[instrument(skip_all)]
pub async fn set_attestation(
    State(state): State<AppState>,
    CsrfProtected(_session): CsrfProtected,
    body: Result<Json<AttestationRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    request.validate().map_err(ApiError::bad_request)?;

    let scam_verdict = classify_best_effort(
        state.scam_guard.as_ref(),
        &request.attestation_id,
        &request.origin,
        state.config.scam_guard_timeout,
    )
    .await;

    let attestation = Attestation {
        origin: request.origin,
        scam_verdict,
        created_at: Utc::now(),
    };
    state
        .attestations
        .set_attestation(&request.attestation_id, &attestation)
        .await?;

    info!(
        attestation_id = %request.attestation_id,
        origin = %attestation.origin,
        scam_verdict = ?scam_verdict,
        "Attestation stored"
    );
    Ok(StatusCode::OK)
}
