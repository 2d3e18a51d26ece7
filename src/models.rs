// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Domain types shared by the registry, the attestation store and the HTTP
//! layer, plus the request/response bodies of the attestation API.
//!
//! ## Project ID
//!
//! [`ProjectId`] can only be constructed from exactly 32 lowercase hex
//! characters, so any value of that type has already passed the format check
//! that runs before a registry lookup.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Length of a project ID in characters.
pub const PROJECT_ID_LEN: usize = 32;

/// Longest accepted attestation ID.
pub const MAX_ATTESTATION_ID_LEN: usize = 256;

/// Longest accepted attestation origin.
pub const MAX_ORIGIN_LEN: usize = 2048;

// =============================================================================
// Project ID
// =============================================================================

/// Message returned for any malformed project ID.
pub const INVALID_PROJECT_ID_MESSAGE: &str =
    "Invalid URL: ProjectId should be a hex string 32 chars long";

/// A project ID that failed format validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid URL: ProjectId should be a hex string 32 chars long")]
pub struct InvalidProjectId(pub String);

/// Validated 32-character lowercase hex project identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    pub fn parse(raw: &str) -> Result<Self, InvalidProjectId> {
        let well_formed = raw.len() == PROJECT_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if well_formed {
            Ok(ProjectId(raw.to_string()))
        } else {
            Err(InvalidProjectId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProjectId {
    type Err = InvalidProjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectId::parse(s)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = InvalidProjectId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProjectId::parse(&value)
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.0
    }
}

// =============================================================================
// Project
// =============================================================================

/// Project metadata as published by the project registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    /// Verified dApp origin; `None` until the owner completes verification.
    #[serde(default)]
    pub verified_domain: Option<String>,
    /// When false, the enclave is served without any frame-ancestors policy.
    #[serde(default = "default_verify_enabled")]
    pub verify_enabled: bool,
    /// Extra origin patterns appended to the policy, in registration order.
    #[serde(default)]
    pub extra_frame_ancestors: Vec<String>,
}

fn default_verify_enabled() -> bool {
    true
}

// =============================================================================
// Scam Verdict
// =============================================================================

/// Tri-state scam classification.
///
/// Serialized as a nullable boolean: `true` (scam), `false` (safe) and `null`
/// (no opinion yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum ScamVerdict {
    Scam,
    Safe,
    Unknown,
}

impl From<Option<bool>> for ScamVerdict {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => ScamVerdict::Scam,
            Some(false) => ScamVerdict::Safe,
            None => ScamVerdict::Unknown,
        }
    }
}

impl From<ScamVerdict> for Option<bool> {
    fn from(value: ScamVerdict) -> Self {
        match value {
            ScamVerdict::Scam => Some(true),
            ScamVerdict::Safe => Some(false),
            ScamVerdict::Unknown => None,
        }
    }
}

// =============================================================================
// Attestation
// =============================================================================

/// Stored attestation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub origin: String,
    pub scam_verdict: ScamVerdict,
    pub created_at: DateTime<Utc>,
}

/// Request to record an attestation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequest {
    /// Client-chosen attestation identifier.
    pub attestation_id: String,
    /// Origin the enclave was framed by.
    pub origin: String,
}

impl AttestationRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.attestation_id.trim().is_empty() {
            return Err("attestationId must not be empty");
        }
        if self.attestation_id.len() > MAX_ATTESTATION_ID_LEN {
            return Err("attestationId is too long");
        }
        if self.origin.trim().is_empty() {
            return Err("origin must not be empty");
        }
        if self.origin.len() > MAX_ORIGIN_LEN {
            return Err("origin is too long");
        }
        Ok(())
    }
}

/// Public view of an attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    pub origin: String,
    /// `true` for a known scam, `false` for a known safe origin, `null` if unknown.
    #[schema(value_type = Option<bool>)]
    pub is_scam: ScamVerdict,
}

impl From<Attestation> for AttestationResponse {
    fn from(value: Attestation) -> Self {
        Self {
            origin: value.origin,
            is_scam: value.scam_verdict,
        }
    }
}
