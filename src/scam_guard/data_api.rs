// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scam classification via the data API.
//!
//! `GET {base_url}/domain?domain={host}` with an `x-api-key` header, answering
//! `{"is_scam": bool}`. A `404` means the API has no opinion on the host.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{instrument, warn};

use super::{ScamGuard, ScamGuardError};
use crate::{models::ScamVerdict, origin::Origin};

const API_KEY_HEADER: &str = "x-api-key";

/// Upper bound for a single request; callers apply their own, tighter timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct DomainResponse {
    is_scam: bool,
}

#[derive(Debug, Clone)]
pub struct DataApiScamGuard {
    base_url: String,
    api_key: String,
    http: Client,
}

impl DataApiScamGuard {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ScamGuardError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ScamGuardError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: Into::<String>::into(base_url).trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        })
    }
}

#[async_trait]
impl ScamGuard for DataApiScamGuard {
    #[instrument(level = "debug", skip(self))]
    async fn classify(
        &self,
        attestation_id: &str,
        origin: &str,
    ) -> Result<ScamVerdict, ScamGuardError> {
        let Some(parsed) = Origin::parse(origin) else {
            warn!(origin, "Origin isn't a valid URL, skipping the scam check");
            return Ok(ScamVerdict::Unknown);
        };

        let response = self
            .http
            .get(format!("{}/domain", self.base_url))
            .query(&[("domain", parsed.host.as_str())])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ScamGuardError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(ScamVerdict::Unknown);
        }
        if !response.status().is_success() {
            return Err(ScamGuardError::Request(format!(
                "HTTP {} from data API",
                response.status()
            )));
        }

        let body: DomainResponse = response
            .json()
            .await
            .map_err(|e| ScamGuardError::InvalidResponse(e.to_string()))?;

        Ok(if body.is_scam {
            ScamVerdict::Scam
        } else {
            ScamVerdict::Safe
        })
    }
}
