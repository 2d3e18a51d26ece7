// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Project Registry
//!
//! Lookup of project metadata by [`ProjectId`]. The registry itself lives
//! elsewhere; this module only defines the lookup contract and its adapters:
//!
//! - [`http::HttpProjectRegistry`] - remote registry over HTTPS
//! - [`memory::StaticProjectRegistry`] - fixed set of projects (JSON file, tests)
//! - [`cached::CachedProjectRegistry`] - TTL cache in front of another registry

pub mod cached;
pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::models::{Project, ProjectId};

pub use cached::CachedProjectRegistry;
pub use http::HttpProjectRegistry;
pub use memory::StaticProjectRegistry;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("project registry request failed: {0}")]
    Request(String),

    #[error("project registry response was invalid: {0}")]
    InvalidResponse(String),

    #[error("failed to load projects: {0}")]
    Load(String),
}

#[async_trait]
pub trait ProjectRegistry: Send + Sync + 'static {
    /// `Ok(None)` when no project has this ID.
    async fn project_data(&self, id: &ProjectId) -> Result<Option<Project>, RegistryError>;
}
