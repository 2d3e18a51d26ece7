// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TTL cache in front of a project registry.
//!
//! Negative lookups are cached too, so probing random project IDs does not
//! fan out to the remote registry. Registry errors are never cached.

use std::time::Duration;

use ::metrics::counter;
use async_trait::async_trait;
use tracing::debug;

use super::{ProjectRegistry, RegistryError};
use crate::{
    cache::TtlCache,
    models::{Project, ProjectId},
};

/// Max number of project IDs kept in memory.
const DEFAULT_CAPACITY: usize = 10_000;

pub struct CachedProjectRegistry<R> {
    inner: R,
    cache: TtlCache<ProjectId, Option<Project>>,
}

impl<R: ProjectRegistry> CachedProjectRegistry<R> {
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(DEFAULT_CAPACITY, ttl),
        }
    }
}

#[async_trait]
impl<R: ProjectRegistry> ProjectRegistry for CachedProjectRegistry<R> {
    async fn project_data(&self, id: &ProjectId) -> Result<Option<Project>, RegistryError> {
        if let Some(data) = self.cache.get(id) {
            counter!("project_registry_cache_hits").increment(1);
            debug!(project_id = %id, "project cache hit");
            return Ok(data);
        }
        counter!("project_registry_cache_misses").increment(1);

        let data = self
            .inner
            .project_data(id)
            .await
            .inspect_err(|_| counter!("project_registry_errors").increment(1))?;
        self.cache.put(id.clone(), data.clone());
        counter!("project_registry_cache_writes").increment(1);
        Ok(data)
    }
}
