// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scam classification from a configured host list.
//!
//! A listed host matches itself and all of its subdomains. Origins that do
//! not match are handed to the fallback classifier, or reported `Safe` when
//! there is none.

use async_trait::async_trait;

use super::{ScamGuard, ScamGuardError};
use crate::{models::ScamVerdict, origin::Origin};

pub struct DenylistScamGuard {
    hosts: Vec<String>,
    fallback: Option<Box<dyn ScamGuard>>,
}

impl DenylistScamGuard {
    pub fn new(hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| Into::<String>::into(h).trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl ScamGuard) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }
}

#[async_trait]
impl ScamGuard for DenylistScamGuard {
    async fn classify(
        &self,
        attestation_id: &str,
        origin: &str,
    ) -> Result<ScamVerdict, ScamGuardError> {
        let Some(parsed) = Origin::parse(origin) else {
            return Ok(ScamVerdict::Unknown);
        };

        if self.hosts.iter().any(|host| parsed.is_within(host)) {
            return Ok(ScamVerdict::Scam);
        }

        match &self.fallback {
            Some(fallback) => fallback.classify(attestation_id, origin).await,
            None => Ok(ScamVerdict::Safe),
        }
    }
}
