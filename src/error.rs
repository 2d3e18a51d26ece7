// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::attestation_store::StoreError;
use crate::enclave::PolicyError;
use crate::registry::RegistryError;

/// HTTP-facing error.
///
/// The body is the plain-text message: clients match on it verbatim (e.g. the
/// invalid project ID message), so it is not wrapped in JSON.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::InvalidProjectId(_) => ApiError::bad_request(err.to_string()),
            PolicyError::UnknownProject | PolicyError::NoVerifiedDomain => {
                ApiError::not_found(err.to_string())
            }
            PolicyError::Registry(e) => e.into(),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        error!(error = %err, "Project registry lookup failed");
        ApiError::internal("Failed to look up the project")
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "Attestation store operation failed");
        ApiError::internal("Attestation store is unavailable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let internal = ApiError::internal("oops");
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn into_response_returns_plain_text_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body_bytes[..], b"bad data");
    }

    #[test]
    fn policy_errors_map_to_statuses() {
        let invalid: ApiError = PolicyError::InvalidProjectId("zz".into()).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            invalid.message,
            "Invalid URL: ProjectId should be a hex string 32 chars long"
        );

        let unknown: ApiError = PolicyError::UnknownProject.into();
        assert_eq!(unknown.status, StatusCode::NOT_FOUND);
        assert!(unknown
            .message
            .contains("Project with the provided ID doesn't exist"));

        let unverified: ApiError = PolicyError::NoVerifiedDomain.into();
        assert_eq!(unverified.status, StatusCode::NOT_FOUND);
        assert!(unverified
            .message
            .contains("Project with the provided ID doesn't have a verified domain"));
    }
}
