// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Attestation Store
//!
//! Key-value storage of attestations by ID. A write replaces the whole record
//! for its ID in one step, so concurrent writers to the same ID leave exactly
//! one of their records behind, never a mix.
//!
//! - [`memory::InMemoryAttestationStore`] - process-local map (default)
//! - [`redb::RedbAttestationStore`] - embedded ACID database file

pub mod memory;
pub mod redb;

use async_trait::async_trait;

use crate::models::Attestation;

pub use self::memory::InMemoryAttestationStore;
pub use self::redb::RedbAttestationStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] ::redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] ::redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] ::redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] ::redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] ::redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("blocking task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait AttestationStore: Send + Sync + 'static {
    /// Insert or fully replace the attestation stored under `id`.
    async fn set_attestation(&self, id: &str, attestation: &Attestation) -> Result<(), StoreError>;

    async fn get_attestation(&self, id: &str) -> Result<Option<Attestation>, StoreError>;
}
