// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Enclave
//!
//! The verify enclave is a page embedded by wallets in an iframe. Which sites
//! may embed it is decided per project by a `Content-Security-Policy:
//! frame-ancestors` header, resolved in [`policy`].

pub mod policy;

use crate::models::InvalidProjectId;
use crate::registry::RegistryError;

pub use policy::{FrameAncestorsPolicy, PolicyOutcome};

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Invalid URL: ProjectId should be a hex string 32 chars long")]
    InvalidProjectId(String),

    #[error("Project with the provided ID doesn't exist")]
    UnknownProject,

    #[error("Project with the provided ID doesn't have a verified domain")]
    NoVerifiedDomain,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<InvalidProjectId> for PolicyError {
    fn from(err: InvalidProjectId) -> Self {
        PolicyError::InvalidProjectId(err.0)
    }
}
