// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Prometheus metrics.
//!
//! Counters and histograms are emitted through the `metrics` facade and are
//! no-ops until [`install`] sets the global recorder. `GET /metrics` renders
//! the recorder's handle.
//!
//! | Metric | Kind | Labels |
//! |--------|------|--------|
//! | `latency` | histogram (seconds) | `method`, `path`, `status` |
//! | `project_registry_cache_hits` / `_misses` / `_writes` | counter | |
//! | `project_registry_errors` | counter | |
//! | `scam_guard_cache_hits` / `_misses` / `_writes` | counter | |
//! | `scam_guard_errors` | counter | |

use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use ::metrics::histogram;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// How often histogram buckets are drained into the rendered summary.
const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Install the global Prometheus recorder and start its upkeep task.
pub fn install() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            upkeep.run_upkeep();
        }
    });

    Ok(handle)
}

/// Route middleware recording request latency per method, route and status.
pub async fn record_latency(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_default();

    let started = Instant::now();
    let response = next.run(request).await;

    histogram!(
        "latency",
        "method" => method,
        "path" => path,
        "status" => response.status().as_str().to_string()
    )
    .record(started.elapsed());

    response
}

/// Run `future` with a private recorder and return its rendered output.
#[cfg(test)]
pub(crate) fn capture<F: std::future::Future>(future: F) -> (F::Output, String) {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let output = ::metrics::with_local_recorder(&recorder, || runtime.block_on(future));
    (output, handle.render())
}

/// Value of an unlabelled counter in rendered Prometheus text.
#[cfg(test)]
pub(crate) fn counter_value(rendered: &str, name: &str) -> Option<u64> {
    rendered
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once(' '))
        .find(|(metric, _)| *metric == name || *metric == format!("{name}_total"))
        .and_then(|(_, value)| value.trim().parse().ok())
}
