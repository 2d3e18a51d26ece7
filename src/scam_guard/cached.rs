// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-host verdict cache in front of another classifier.
//!
//! Only definite verdicts (`Scam`/`Safe`) are cached; `Unknown` is retried on
//! the next attestation from that host.

use std::time::Duration;

use ::metrics::counter;
use async_trait::async_trait;
use tracing::debug;

use super::{ScamGuard, ScamGuardError};
use crate::{cache::TtlCache, models::ScamVerdict, origin::Origin};

const DEFAULT_CAPACITY: usize = 50_000;

pub struct CachedScamGuard<G> {
    inner: G,
    cache: TtlCache<String, ScamVerdict>,
}

impl<G: ScamGuard> CachedScamGuard<G> {
    pub fn new(inner: G, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(DEFAULT_CAPACITY, ttl),
        }
    }
}

#[async_trait]
impl<G: ScamGuard> ScamGuard for CachedScamGuard<G> {
    async fn classify(
        &self,
        attestation_id: &str,
        origin: &str,
    ) -> Result<ScamVerdict, ScamGuardError> {
        let Some(host) = Origin::parse(origin).map(|o| o.host) else {
            return self.inner.classify(attestation_id, origin).await;
        };

        if let Some(verdict) = self.cache.get(&host) {
            counter!("scam_guard_cache_hits").increment(1);
            debug!(host = %host, "scam verdict cache hit");
            return Ok(verdict);
        }
        counter!("scam_guard_cache_misses").increment(1);

        let verdict = self
            .inner
            .classify(attestation_id, origin)
            .await
            .inspect_err(|_| counter!("scam_guard_errors").increment(1))?;
        if verdict != ScamVerdict::Unknown {
            self.cache.put(host, verdict);
            counter!("scam_guard_cache_writes").increment(1);
        }
        Ok(verdict)
    }
}
