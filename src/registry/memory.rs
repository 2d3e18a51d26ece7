// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed, in-process project registry.

use std::{collections::HashMap, fs, path::Path};

use async_trait::async_trait;

use super::{ProjectRegistry, RegistryError};
use crate::models::{Project, ProjectId};

#[derive(Debug, Default, Clone)]
pub struct StaticProjectRegistry {
    projects: HashMap<ProjectId, Project>,
}

impl StaticProjectRegistry {
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        Self {
            projects: projects
                .into_iter()
                .map(|project| (project.id.clone(), project))
                .collect(),
        }
    }

    /// Load a JSON array of projects.
    pub fn from_json_file(path: &Path) -> Result<Self, RegistryError> {
        let raw = fs::read(path)
            .map_err(|e| RegistryError::Load(format!("{}: {e}", path.display())))?;
        let projects: Vec<Project> = serde_json::from_slice(&raw)
            .map_err(|e| RegistryError::Load(format!("{}: {e}", path.display())))?;
        Ok(Self::new(projects))
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[async_trait]
impl ProjectRegistry for StaticProjectRegistry {
    async fn project_data(&self, id: &ProjectId) -> Result<Option<Project>, RegistryError> {
        Ok(self.projects.get(id).cloned())
    }
}
