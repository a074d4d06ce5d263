// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-use sign-in nonces.
//!
//! Each nonce is 32 bytes from the OS CSPRNG, hex encoded, stored under
//! `nonce:{value}`. Records outlive their acceptance window by a retention
//! grace period so that late or replayed presentations are classified as
//! expired or consumed rather than unknown.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::store::{get_json, set_json, KvStore, StoreError};

/// Default acceptance window for a nonce.
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(300);

const NONCE_BYTES: usize = 32;

/// Stored nonce state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceRecord {
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl NonceRecord {
    /// A nonce is accepted strictly before `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NonceError {
    /// The OS random source failed. This is a deployment fault and is not retried.
    #[error("secure randomness unavailable")]
    RandomnessUnavailable,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of an atomic consume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    /// Another request consumed (or replaced) the record first.
    LostRace,
}

/// Issues and consumes nonces.
pub struct NonceIssuer {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
    ttl: Duration,
}

impl NonceIssuer {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            rng: SystemRandom::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Records are kept for twice the acceptance window.
    fn retention(&self) -> Duration {
        self.ttl.saturating_mul(2)
    }

    /// Generate and persist a fresh nonce.
    pub async fn issue_nonce(&self) -> Result<NonceRecord, NonceError> {
        let value = random_hex(&self.rng, NONCE_BYTES)?;
        let issued_at = self.clock.now();
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        let record = NonceRecord {
            value,
            issued_at,
            expires_at: issued_at
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            consumed: false,
        };

        set_json(
            self.store.as_ref(),
            &nonce_key(&record.value),
            &record,
            self.retention(),
        )
        .await?;

        tracing::debug!(expires_at = %record.expires_at, "Issued sign-in nonce");
        Ok(record)
    }

    /// Current record for `value`, with its raw encoding for [`consume`](Self::consume).
    pub async fn lookup(&self, value: &str) -> Result<Option<(NonceRecord, Vec<u8>)>, NonceError> {
        Ok(get_json(self.store.as_ref(), &nonce_key(value)).await?)
    }

    /// Mark the record consumed if it is still exactly `raw`.
    pub async fn consume(
        &self,
        record: &NonceRecord,
        raw: &[u8],
    ) -> Result<ConsumeOutcome, NonceError> {
        let consumed = NonceRecord {
            consumed: true,
            ..record.clone()
        };
        let bytes = serde_json::to_vec(&consumed).map_err(StoreError::from)?;
        let swapped = self
            .store
            .compare_and_swap(&nonce_key(&record.value), raw, bytes, self.retention())
            .await?;
        Ok(if swapped {
            ConsumeOutcome::Consumed
        } else {
            ConsumeOutcome::LostRace
        })
    }
}

fn nonce_key(value: &str) -> String {
    format!("nonce:{value}")
}

/// Hex-encode `len` bytes from the CSPRNG.
pub(crate) fn random_hex(rng: &SystemRandom, len: usize) -> Result<String, NonceError> {
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| NonceError::RandomnessUnavailable)?;
    Ok(alloy::hex::encode(bytes))
}
