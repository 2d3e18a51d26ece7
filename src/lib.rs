// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verify Server - dApp Domain Verification & Attestation Service
//!
//! Wallets frame the Verify Enclave served here to learn which origin a dApp
//! request really came from. The enclave page carries a per-project
//! `frame-ancestors` policy; the origin it observes is recorded as a
//! CSRF-protected attestation that wallets read back, together with a scam
//! verdict for that origin.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `attestation_store` - attestation persistence (in-memory, redb)
//! - `csrf` - signed, session-bound CSRF tokens
//! - `enclave` - frame-ancestors policy resolution
//! - `metrics` - Prometheus recorder and request latency
//! - `registry` - project metadata lookup
//! - `scam_guard` - origin reputation checks

pub mod api;
pub mod attestation_store;
pub mod cache;
pub mod config;
pub mod csrf;
pub mod enclave;
pub mod error;
pub mod metrics;
pub mod models;
pub mod origin;
pub mod registry;
pub mod scam_guard;
pub mod state;
