// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache of ledger-confirmed claims.
//!
//! RPC nodes can serve reads from a block older than the one that included a
//! user's claim. Remembering confirmed claims for one cooldown window keeps
//! the effective last-claim time from moving backwards in the meantime.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use lru::LruCache;

use crate::clock::Clock;
use crate::models::WalletAddress;

/// Cached entry: confirmed claim time + the tx that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedClaim {
    pub claimed_at: DateTime<Utc>,
    pub tx_hash: String,
}

/// In-process LRU cache keyed by canonical address.
pub struct ClaimCache {
    cache: Mutex<LruCache<WalletAddress, ConfirmedClaim>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl ClaimCache {
    /// Create a new cache.
    ///
    /// - `capacity`: Max number of addresses to remember.
    /// - `ttl`: How long a confirmed claim is remembered.
    pub fn new(capacity: usize, ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
            clock,
        }
    }

    /// Confirmed claim for `address`, if still within the TTL.
    pub fn get(&self, address: &WalletAddress) -> Option<ConfirmedClaim> {
        let mut cache = self.cache.lock().ok()?;
        let fresh = cache
            .get(address)
            .map(|entry| self.clock.now() - entry.claimed_at < self.ttl)?;
        if fresh {
            return cache.get(address).cloned();
        }
        cache.pop(address);
        None
    }

    /// Remember a confirmed claim. An older claim never replaces a newer one.
    pub fn record(&self, address: &WalletAddress, claim: ConfirmedClaim) {
        if let Ok(mut cache) = self.cache.lock() {
            let newer = cache
                .peek(address)
                .is_none_or(|existing| claim.claimed_at >= existing.claimed_at);
            if newer {
                cache.put(address.clone(), claim);
            }
        }
    }
}
