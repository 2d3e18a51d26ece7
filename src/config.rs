// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once from the environment at startup and threaded
//! explicitly through [`crate::state::AppState`]. Nothing below the `main`
//! entry point reads environment variables.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `ENVIRONMENT` | Deployment environment (`prod`, `staging`, `dev`, `local`) | `local` |
//! | `CSRF_SECRET` | HMAC key for CSRF tokens (at least 32 bytes) | Required in `prod` |
//! | `CSRF_TOKEN_TTL_SECS` | CSRF token lifetime, at most 30 days | `3600` |
//! | `CSRF_REQUIRE_COOKIE` | Reject tokens presented without their cookie | `false` |
//! | `PROJECT_REGISTRY_URL` | Remote project registry base URL | Optional |
//! | `PROJECT_REGISTRY_AUTH_TOKEN` | Bearer token for the remote registry | Optional |
//! | `PROJECT_REGISTRY_FILE` | JSON file with projects (static registry) | Optional |
//! | `PROJECT_CACHE_TTL_SECS` | Project lookup cache TTL | `300` |
//! | `DATA_API_URL` | Scam data API base URL | Optional |
//! | `DATA_API_KEY` | Scam data API key | Optional |
//! | `SCAM_DENYLIST` | Comma-separated scam hosts | Empty |
//! | `SCAM_GUARD_TIMEOUT_MS` | Scam classifier timeout | `1000` |
//! | `ATTESTATION_DB_PATH` | redb file for attestations | In-memory store |
//! | `DOMAIN_WHITELIST` | Comma-separated extra frame ancestors (non-prod only) | Empty |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key | Plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const ENVIRONMENT_ENV: &str = "ENVIRONMENT";
pub const CSRF_SECRET_ENV: &str = "CSRF_SECRET";
pub const CSRF_TOKEN_TTL_ENV: &str = "CSRF_TOKEN_TTL_SECS";
pub const CSRF_REQUIRE_COOKIE_ENV: &str = "CSRF_REQUIRE_COOKIE";
pub const PROJECT_REGISTRY_URL_ENV: &str = "PROJECT_REGISTRY_URL";
pub const PROJECT_REGISTRY_AUTH_TOKEN_ENV: &str = "PROJECT_REGISTRY_AUTH_TOKEN";
pub const PROJECT_REGISTRY_FILE_ENV: &str = "PROJECT_REGISTRY_FILE";
pub const PROJECT_CACHE_TTL_ENV: &str = "PROJECT_CACHE_TTL_SECS";
pub const DATA_API_URL_ENV: &str = "DATA_API_URL";
pub const DATA_API_KEY_ENV: &str = "DATA_API_KEY";
pub const SCAM_DENYLIST_ENV: &str = "SCAM_DENYLIST";
pub const SCAM_GUARD_TIMEOUT_ENV: &str = "SCAM_GUARD_TIMEOUT_MS";
pub const ATTESTATION_DB_PATH_ENV: &str = "ATTESTATION_DB_PATH";
pub const DOMAIN_WHITELIST_ENV: &str = "DOMAIN_WHITELIST";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Minimum accepted length of `CSRF_SECRET`, in bytes.
pub const MIN_CSRF_SECRET_LEN: usize = 32;

/// Upper bound for `CSRF_TOKEN_TTL_SECS` (30 days).
pub const MAX_CSRF_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CSRF_TOKEN_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_PROJECT_CACHE_TTL: Duration = Duration::from_secs(300);
const DEFAULT_SCAM_GUARD_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required in the prod environment")]
    MissingInProd(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Deployment environment the server runs in.
///
/// Selects the frame-ancestors policy table in [`crate::enclave::policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Prod,
    Staging,
    Dev,
    Local,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Prod => "prod",
            Environment::Staging => "staging",
            Environment::Dev => "dev",
            Environment::Local => "local",
        }
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Environment::Prod)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Ok(Environment::Prod),
            "staging" => Ok(Environment::Staging),
            "dev" | "development" => Ok(Environment::Dev),
            "local" => Ok(Environment::Local),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// CSRF token settings.
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// HMAC key. `None` means a random key is generated at startup.
    pub secret: Option<Vec<u8>>,
    pub token_ttl: Duration,
    /// When set, a token presented without its session cookie is rejected.
    pub require_cookie: bool,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub csrf: CsrfConfig,
    pub project_registry_url: Option<String>,
    pub project_registry_auth_token: Option<String>,
    pub project_registry_file: Option<PathBuf>,
    pub project_cache_ttl: Duration,
    pub data_api_url: Option<String>,
    pub data_api_key: Option<String>,
    pub scam_denylist: Vec<String>,
    pub scam_guard_timeout: Duration,
    pub attestation_db_path: Option<PathBuf>,
    /// Additional frame ancestors allowed outside of `prod`.
    pub domain_whitelist: Vec<String>,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment = match var(ENVIRONMENT_ENV) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: ENVIRONMENT_ENV,
                reason,
            })?,
            None => Environment::Local,
        };

        let secret = match var(CSRF_SECRET_ENV) {
            Some(secret) if secret.len() < MIN_CSRF_SECRET_LEN => {
                return Err(ConfigError::Invalid {
                    name: CSRF_SECRET_ENV,
                    reason: format!("must be at least {MIN_CSRF_SECRET_LEN} bytes"),
                })
            }
            Some(secret) => Some(secret.into_bytes()),
            None if environment.is_prod() => {
                return Err(ConfigError::MissingInProd(CSRF_SECRET_ENV))
            }
            None => None,
        };

        let token_ttl = parse_secs(var(CSRF_TOKEN_TTL_ENV), CSRF_TOKEN_TTL_ENV)?
            .unwrap_or(DEFAULT_CSRF_TOKEN_TTL);
        if token_ttl.is_zero() || token_ttl > MAX_CSRF_TOKEN_TTL {
            return Err(ConfigError::Invalid {
                name: CSRF_TOKEN_TTL_ENV,
                reason: format!(
                    "must be between 1 and {} seconds",
                    MAX_CSRF_TOKEN_TTL.as_secs()
                ),
            });
        }

        let port = match var(PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            environment,
            csrf: CsrfConfig {
                secret,
                token_ttl,
                require_cookie: parse_bool(var(CSRF_REQUIRE_COOKIE_ENV), CSRF_REQUIRE_COOKIE_ENV)?,
            },
            project_registry_url: var(PROJECT_REGISTRY_URL_ENV),
            project_registry_auth_token: var(PROJECT_REGISTRY_AUTH_TOKEN_ENV),
            project_registry_file: var(PROJECT_REGISTRY_FILE_ENV).map(PathBuf::from),
            project_cache_ttl: parse_secs(var(PROJECT_CACHE_TTL_ENV), PROJECT_CACHE_TTL_ENV)?
                .unwrap_or(DEFAULT_PROJECT_CACHE_TTL),
            data_api_url: var(DATA_API_URL_ENV),
            data_api_key: var(DATA_API_KEY_ENV),
            scam_denylist: split_list(var(SCAM_DENYLIST_ENV)),
            scam_guard_timeout: match var(SCAM_GUARD_TIMEOUT_ENV) {
                Some(raw) => Duration::from_millis(raw.trim().parse().map_err(|e| {
                    ConfigError::Invalid {
                        name: SCAM_GUARD_TIMEOUT_ENV,
                        reason: format!("{e}"),
                    }
                })?),
                None => DEFAULT_SCAM_GUARD_TIMEOUT,
            },
            attestation_db_path: var(ATTESTATION_DB_PATH_ENV).map(PathBuf::from),
            domain_whitelist: split_list(var(DOMAIN_WHITELIST_ENV)),
            tls_cert_path: var(TLS_CERT_PATH_ENV).map(PathBuf::from),
            tls_key_path: var(TLS_KEY_PATH_ENV).map(PathBuf::from),
        })
    }

    /// Defaults for the given environment with a fixed CSRF secret.
    #[cfg(test)]
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            environment,
            csrf: CsrfConfig {
                secret: Some(b"test-secret-test-secret-test-secret!".to_vec()),
                token_ttl: DEFAULT_CSRF_TOKEN_TTL,
                require_cookie: false,
            },
            project_registry_url: None,
            project_registry_auth_token: None,
            project_registry_file: None,
            project_cache_ttl: DEFAULT_PROJECT_CACHE_TTL,
            data_api_url: None,
            data_api_key: None,
            scam_denylist: Vec::new(),
            scam_guard_timeout: DEFAULT_SCAM_GUARD_TIMEOUT,
            attestation_db_path: None,
            domain_whitelist: Vec::new(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

fn parse_secs(raw: Option<String>, name: &'static str) -> Result<Option<Duration>, ConfigError> {
    raw.map(|raw| {
        raw.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::Invalid {
                name,
                reason: format!("{e}"),
            })
    })
    .transpose()
}

fn parse_bool(raw: Option<String>, name: &'static str) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no") => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{v}'"),
        }),
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
