// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote project registry client.
//!
//! `GET {base_url}/internal/project/key/{project_id}` with a bearer token.
//! `404` means the project does not exist; any other non-success status is
//! an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::instrument;

use super::{ProjectRegistry, RegistryError};
use crate::models::{Project, ProjectId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HttpProjectRegistry {
    base_url: String,
    auth_token: String,
    http: Client,
}

impl HttpProjectRegistry {
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Result<Self, RegistryError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: Into::<String>::into(base_url).trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
            http,
        })
    }
}

#[async_trait]
impl ProjectRegistry for HttpProjectRegistry {
    #[instrument(level = "debug", skip(self), fields(project_id = %id))]
    async fn project_data(&self, id: &ProjectId) -> Result<Option<Project>, RegistryError> {
        let url = format!("{}/internal/project/key/{id}", self.base_url);
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| RegistryError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RegistryError::Request(format!(
                "HTTP {} from project registry",
                response.status()
            )));
        }

        let project: Project = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

        if &project.id != id {
            return Err(RegistryError::InvalidResponse(format!(
                "asked for project {id}, got {}",
                project.id
            )));
        }

        Ok(Some(project))
    }
}
