// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key/value store with per-entry TTL.
//!
//! Nonce and session records live behind [`KvStore`] so the in-process map can
//! be swapped for a shared store (Redis, etc.) without touching callers.
//!
//! ## Key Layout
//!
//! ```text
//! nonce:{value}        # NonceRecord (JSON)
//! session:{token_id}   # SessionRecord (JSON)
//! identity:{address}   # IdentityRecord (JSON)
//! ```
//!
//! ## Atomicity
//!
//! `compare_and_swap` is a single critical section. Nonce consumption and
//! session revocation go through it and never through read-then-write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::clock::Clock;

/// Errors raised by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Backend(String),

    #[error("stored record could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Minimal TTL key/value interface.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a live entry. Expired entries read as absent.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Insert or overwrite an entry with the given time-to-live.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Remove an entry. Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Replace the entry only if its current bytes equal `expected`.
    ///
    /// Returns `false` (and writes nothing) when the entry is absent,
    /// expired, or holds different bytes.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
        ttl: Duration,
    ) -> StoreResult<bool>;

    /// Drop every entry whose TTL has elapsed. Returns the number removed.
    async fn purge_expired(&self) -> StoreResult<usize>;
}

/// Read and decode a JSON record.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> StoreResult<Option<(T, Vec<u8>)>> {
    match store.get(key).await? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes)?;
            Ok(Some((value, bytes)))
        }
        None => Ok(None),
    }
}

/// Encode and write a JSON record.
pub async fn set_json<T: Serialize>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> StoreResult<()> {
    let bytes = serde_json::to_vec(value)?;
    store.set(key, bytes, ttl).await
}

struct Entry {
    value: Vec<u8>,
    expires_at: DateTime<Utc>,
}

/// Process-local [`KvStore`] used for single-instance deployments and tests.
pub struct InMemoryKvStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryKvStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn expiry_for(&self, ttl: Duration) -> DateTime<Utc> {
        let now = self.clock.now();
        TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    /// Number of entries currently held, including ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let expires_at = self.expiry_for(ttl);
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        Ok(entries
            .remove(key)
            .map(|entry| entry.expires_at > now)
            .unwrap_or(false))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
        ttl: Duration,
    ) -> StoreResult<bool> {
        let now = self.clock.now();
        let expires_at = self.expiry_for(ttl);
        let mut entries = self.lock()?;
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > now && entry.value == expected => {
                entry.value = new;
                entry.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}
