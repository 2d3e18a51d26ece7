// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AttestationStore, StoreError};
use crate::models::Attestation;

/// Attestations kept in process memory for the lifetime of the server.
#[derive(Default)]
pub struct InMemoryAttestationStore {
    attestations: RwLock<HashMap<String, Attestation>>,
}

impl InMemoryAttestationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttestationStore for InMemoryAttestationStore {
    async fn set_attestation(&self, id: &str, attestation: &Attestation) -> Result<(), StoreError> {
        self.attestations
            .write()
            .await
            .insert(id.to_string(), attestation.clone());
        Ok(())
    }

    async fn get_attestation(&self, id: &str) -> Result<Option<Attestation>, StoreError> {
        Ok(self.attestations.read().await.get(id).cloned())
    }
}
