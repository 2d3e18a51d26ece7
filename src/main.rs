// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use verify_server::{
    api::router,
    attestation_store::{AttestationStore, InMemoryAttestationStore, RedbAttestationStore},
    config::{Config, LOG_FORMAT_ENV},
    registry::{
        CachedProjectRegistry, HttpProjectRegistry, ProjectRegistry, RegistryError,
        StaticProjectRegistry,
    },
    scam_guard::{
        CachedScamGuard, DataApiScamGuard, DenylistScamGuard, NoScamGuard, ScamGuard,
        ScamGuardError,
    },
    state::AppState,
};

type BoxError = Box<dyn Error + Send + Sync>;

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// How long in-flight requests may finish after a shutdown signal.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Lifetime of a cached scam verdict for a host.
const SCAM_VERDICT_CACHE_TTL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Verify server failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(true))
            .try_init()?;
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()?;
    }
    Ok(())
}

async fn run() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    info!(environment = %config.environment, "Starting verify server");

    let projects = build_registry(&config)?;
    let scam_guard = build_scam_guard(&config)?;
    let attestations = build_attestation_store(&config)?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let tls = match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert), Some(key)) => {
            // Install the ring crypto provider for rustls before any TLS operations
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                warn!("A rustls crypto provider was already installed");
            }
            Some(RustlsConfig::from_pem_file(cert, key).await?)
        }
        (None, None) => None,
        _ => return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into()),
    };

    if config.csrf.secret.is_none() {
        warn!("CSRF_SECRET is not set; using a random per-process key");
    }

    let prometheus = verify_server::metrics::install()?;
    let state =
        AppState::new(config, attestations, projects, scam_guard)?.with_metrics(prometheus);
    let app = router(state).into_make_service();

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!(
            grace_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
            "Shutdown signal received, draining connections"
        );
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
    });

    match tls {
        Some(tls) => {
            info!(%addr, "Verify server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls).handle(handle).serve(app).await?;
        }
        None => {
            info!(%addr, "Verify server listening on http (docs at /docs)");
            axum_server::bind(addr).handle(handle).serve(app).await?;
        }
    }

    info!("Verify server stopped");
    Ok(())
}

fn build_registry(config: &Config) -> Result<Arc<dyn ProjectRegistry>, RegistryError> {
    if let Some(url) = &config.project_registry_url {
        let token = config.project_registry_auth_token.clone().unwrap_or_default();
        if token.is_empty() {
            warn!("Project registry auth token is not set");
        }
        let remote = HttpProjectRegistry::new(url.as_str(), token)?;
        info!(
            url = %url,
            cache_ttl_secs = config.project_cache_ttl.as_secs(),
            "Using remote project registry"
        );
        return Ok(Arc::new(CachedProjectRegistry::new(remote, config.project_cache_ttl)));
    }

    if let Some(path) = &config.project_registry_file {
        let registry = StaticProjectRegistry::from_json_file(path)?;
        info!(path = %path.display(), projects = registry.len(), "Loaded project registry file");
        return Ok(Arc::new(registry));
    }

    warn!("No project registry configured; every project ID is unknown");
    Ok(Arc::new(StaticProjectRegistry::default()))
}

fn build_scam_guard(config: &Config) -> Result<Arc<dyn ScamGuard>, ScamGuardError> {
    let data_api = match (&config.data_api_url, &config.data_api_key) {
        (Some(url), Some(key)) => {
            info!(url = %url, "Using data API for scam checks");
            Some(CachedScamGuard::new(
                DataApiScamGuard::new(url.as_str(), key.as_str())?,
                SCAM_VERDICT_CACHE_TTL,
            ))
        }
        (Some(_), None) => {
            warn!("DATA_API_URL is set without DATA_API_KEY; data API scam checks are disabled");
            None
        }
        _ => None,
    };

    let denylist = &config.scam_denylist;
    let guard: Arc<dyn ScamGuard> = match data_api {
        Some(api) if !denylist.is_empty() => {
            Arc::new(DenylistScamGuard::new(denylist.iter().cloned()).with_fallback(api))
        }
        Some(api) => Arc::new(api),
        None if !denylist.is_empty() => Arc::new(DenylistScamGuard::new(denylist.iter().cloned())),
        None => {
            info!("No scam data source configured; verdicts are unknown");
            Arc::new(NoScamGuard)
        }
    };
    Ok(guard)
}

fn build_attestation_store(config: &Config) -> Result<Arc<dyn AttestationStore>, BoxError> {
    match &config.attestation_db_path {
        Some(path) => {
            info!(path = %path.display(), "Using redb attestation store");
            Ok(Arc::new(RedbAttestationStore::open(path)?))
        }
        None => {
            info!("Using in-memory attestation store");
            Ok(Arc::new(InMemoryAttestationStore::new()))
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
