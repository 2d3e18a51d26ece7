// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::{
    attestation_store::AttestationStore,
    config::Config,
    csrf::{CsrfError, CsrfTokens},
    enclave::FrameAncestorsPolicy,
    registry::ProjectRegistry,
    scam_guard::ScamGuard,
};

#[cfg(test)]
use crate::{
    attestation_store::InMemoryAttestationStore, registry::StaticProjectRegistry,
    scam_guard::NoScamGuard,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub csrf: CsrfTokens,
    pub policy: Arc<FrameAncestorsPolicy>,
    pub attestations: Arc<dyn AttestationStore>,
    pub projects: Arc<dyn ProjectRegistry>,
    pub scam_guard: Arc<dyn ScamGuard>,
    /// Rendered by `GET /metrics`; `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: Config,
        attestations: Arc<dyn AttestationStore>,
        projects: Arc<dyn ProjectRegistry>,
        scam_guard: Arc<dyn ScamGuard>,
    ) -> Result<Self, CsrfError> {
        let csrf = CsrfTokens::from_config(&config.csrf)?;
        let policy = FrameAncestorsPolicy::from_config(&config);

        Ok(Self {
            config: Arc::new(config),
            csrf,
            policy: Arc::new(policy),
            attestations,
            projects,
            scam_guard,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// State with an in-memory store, no projects and no scam data.
    #[cfg(test)]
    pub fn in_memory(config: Config) -> Self {
        let csrf = CsrfTokens::from_config(&config.csrf).expect("test CSRF key");

        Self {
            policy: Arc::new(FrameAncestorsPolicy::from_config(&config)),
            config: Arc::new(config),
            csrf,
            attestations: Arc::new(InMemoryAttestationStore::new()),
            projects: Arc::new(StaticProjectRegistry::default()),
            scam_guard: Arc::new(NoScamGuard),
            metrics: None,
        }
    }

    #[cfg(test)]
    pub fn with_projects(mut self, projects: impl ProjectRegistry) -> Self {
        self.projects = Arc::new(projects);
        self
    }

    #[cfg(test)]
    pub fn with_scam_guard(mut self, scam_guard: impl ScamGuard) -> Self {
        self.scam_guard = Arc::new(scam_guard);
        self
    }
}
