// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Store Sweeper
//!
//! Background task that periodically drops expired nonce, session, and
//! identity records from the key/value store. Expired entries already read
//! as absent; the sweep only bounds memory.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::KvStore;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct StoreSweeper {
    store: Arc<dyn KvStore>,
    interval: Duration,
}

impl StoreSweeper {
    pub fn new(store: Arc<dyn KvStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Store sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Store sweeper shutting down");
                    return;
                }
            }

            self.sweep_step().await;
        }
    }

    async fn sweep_step(&self) {
        match self.store.purge_expired().await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "Purged expired store entries"),
            Err(e) => warn!(error = %e, "Store sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::store::InMemoryKvStore;

    #[tokio::test]
    async fn sweep_removes_expired_entries_and_stops_on_cancel() {
        let clock = ManualClock::at_epoch();
        let store = Arc::new(InMemoryKvStore::new(Arc::new(clock.clone()) as Arc<dyn Clock>));
        store
            .set("short", b"a".to_vec(), Duration::from_secs(1))
            .await
            .unwrap();
        store
            .set("long", b"b".to_vec(), Duration::from_secs(3600))
            .await
            .unwrap();
        clock.advance_secs(2);

        let shutdown = CancellationToken::new();
        let sweeper = StoreSweeper::new(store.clone(), Duration::from_millis(10));
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        for _ in 0..100 {
            if store.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.len(), 1);
        assert!(store.get("long").await.unwrap().is_some());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
