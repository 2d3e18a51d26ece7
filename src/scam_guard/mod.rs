// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Scam Origin Classifier
//!
//! Tri-state reputation check for attested origins. The verdict is computed
//! once, when the attestation is written, and stored with it.
//!
//! Adapters:
//!
//! - [`data_api::DataApiScamGuard`] - remote reputation API
//! - [`denylist::DenylistScamGuard`] - configured list of scam hosts
//! - [`cached::CachedScamGuard`] - per-host TTL cache
//! - [`NoScamGuard`] - no data source; every origin is `Unknown`

pub mod cached;
pub mod data_api;
pub mod denylist;

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::models::ScamVerdict;

pub use cached::CachedScamGuard;
pub use data_api::DataApiScamGuard;
pub use denylist::DenylistScamGuard;

#[derive(Debug, thiserror::Error)]
pub enum ScamGuardError {
    #[error("scam data request failed: {0}")]
    Request(String),

    #[error("scam data response was invalid: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ScamGuard: Send + Sync + 'static {
    /// Classify the origin an attestation was made from.
    async fn classify(&self, attestation_id: &str, origin: &str)
        -> Result<ScamVerdict, ScamGuardError>;
}

/// Classifier used when no reputation source is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScamGuard;

#[async_trait]
impl ScamGuard for NoScamGuard {
    async fn classify(&self, _: &str, _: &str) -> Result<ScamVerdict, ScamGuardError> {
        Ok(ScamVerdict::Unknown)
    }
}

/// Classify without ever failing: errors and timeouts become `Unknown`.
pub async fn classify_best_effort(
    guard: &dyn ScamGuard,
    attestation_id: &str,
    origin: &str,
    timeout: Duration,
) -> ScamVerdict {
    match tokio::time::timeout(timeout, guard.classify(attestation_id, origin)).await {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(e)) => {
            warn!(error = %e, attestation_id, "Scam classification failed");
            ScamVerdict::Unknown
        }
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                attestation_id, "Scam classification timed out"
            );
            ScamVerdict::Unknown
        }
    }
}
