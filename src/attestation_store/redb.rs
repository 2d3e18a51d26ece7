// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Attestation store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `attestations`: attestation_id → serialized Attestation (JSON bytes)
//!
//! redb is synchronous, so every operation runs on the blocking pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{AttestationStore, StoreError};
use crate::models::Attestation;

const ATTESTATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("attestations");

#[derive(Clone)]
pub struct RedbAttestationStore {
    db: Arc<Database>,
}

impl RedbAttestationStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ATTESTATIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn put(db: &Database, id: &str, attestation: &Attestation) -> Result<(), StoreError> {
        let json = serde_json::to_vec(attestation)?;

        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(ATTESTATIONS)?;
            table.insert(id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn fetch(db: &Database, id: &str) -> Result<Option<Attestation>, StoreError> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(ATTESTATIONS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AttestationStore for RedbAttestationStore {
    async fn set_attestation(&self, id: &str, attestation: &Attestation) -> Result<(), StoreError> {
        let db = self.db.clone();
        let id = id.to_string();
        let attestation = attestation.clone();

        tokio::task::spawn_blocking(move || Self::put(&db, &id, &attestation))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn get_attestation(&self, id: &str) -> Result<Option<Attestation>, StoreError> {
        let db = self.db.clone();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || Self::fetch(&db, &id))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}
