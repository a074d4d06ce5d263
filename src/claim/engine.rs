// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Claim Eligibility Engine
//!
//! Computes, for an authenticated address, whether a claim is allowed right
//! now and for how much. The engine never moves tokens: the claim contract
//! alone authorizes a claim, and its answer always wins over cached state.
//!
//! ## Flow
//!
//! 1. `get_eligibility` reads last claim, participant count and balance
//! 2. `prepare_claim` validates the amount, then the cooldown, then has the
//!    ledger pre-flight `claim(amount)` and returns the call to send
//! 3. The user's wallet sends the transaction
//! 4. `record_claim` reconciles the transaction status: only a successful
//!    `claim(amount)` sent by the address to the claim contract counts
//!
//! Every ledger call is bounded by [`ClaimConfig::ledger_timeout`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{TxHash, U256};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::cache::{ClaimCache, ConfirmedClaim};
use super::phase::{
    cooldown_remaining, format_countdown, phase_info, CLAIM_COOLDOWN_SECS, MIN_CLAIM,
};
use crate::blockchain::{
    amount_to_wei, format_balance, ClaimCall, ClaimLedger, LedgerError, TxStatus, TOKEN_DECIMALS,
};
use crate::clock::Clock;
use crate::models::WalletAddress;

/// Default bound on a single ledger call.
pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of addresses in the confirmed-claim cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
pub struct ClaimConfig {
    pub ledger_timeout: Duration,
    pub cache_capacity: usize,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            ledger_timeout: DEFAULT_LEDGER_TIMEOUT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Claim eligibility for one address at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Eligibility {
    pub address: WalletAddress,
    pub can_claim: bool,
    /// Current tier maximum in whole tokens.
    pub amount: u64,
    pub min_amount: u64,
    /// Seconds until the next claim is allowed.
    pub cooldown_remaining: u64,
    /// Countdown formatted as `"{h}h {m}m {s}s"`.
    pub cooldown_display: String,
    pub phase: u64,
    pub phase_description: String,
    pub total_participants: u64,
    pub last_claim_time: Option<DateTime<Utc>>,
    pub next_claim_at: Option<DateTime<Utc>>,
    /// Reward token balance, formatted with up to 6 decimals.
    pub balance: String,
}

/// Global phase snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhaseSnapshot {
    pub total_participants: u64,
    pub phase: u64,
    pub max_claim: u64,
    pub min_claim: u64,
    pub description: String,
}

/// Outcome of reconciling a claim transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClaimStatus {
    /// The ledger confirmed the claim.
    Confirmed {
        claimed_at: DateTime<Utc>,
        next_claim_at: DateTime<Utc>,
    },
    /// The ledger has not (yet) mined the transaction.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimError {
    #[error("claim cooldown active, {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },

    #[error("amount {requested} is outside the allowed range {min}..={max}")]
    AmountOutOfRange { requested: u64, min: u64, max: u64 },

    #[error("invalid transaction hash")]
    InvalidTransactionHash,

    /// Carries the failed operation only; transport details are logged.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("ledger rejected the claim: {0}")]
    LedgerRejected(String),
}

impl ClaimError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ClaimError::CooldownActive { .. } => "cooldown_active",
            ClaimError::AmountOutOfRange { .. } => "amount_out_of_range",
            ClaimError::InvalidTransactionHash => "invalid_tx_hash",
            ClaimError::LedgerUnavailable(_) => "ledger_unavailable",
            ClaimError::LedgerRejected(_) => "ledger_rejected",
        }
    }
}

pub struct ClaimEngine {
    ledger: Arc<dyn ClaimLedger>,
    cache: ClaimCache,
    clock: Arc<dyn Clock>,
    config: ClaimConfig,
}

impl ClaimEngine {
    pub fn new(ledger: Arc<dyn ClaimLedger>, clock: Arc<dyn Clock>, config: ClaimConfig) -> Self {
        Self {
            cache: ClaimCache::new(
                config.cache_capacity,
                TimeDelta::seconds(CLAIM_COOLDOWN_SECS),
                clock.clone(),
            ),
            ledger,
            clock,
            config,
        }
    }

    /// Eligibility of `address` at the current instant.
    pub async fn get_eligibility(
        &self,
        address: &WalletAddress,
    ) -> Result<Eligibility, ClaimError> {
        let (ledger_last, participants, balance) = tokio::try_join!(
            self.ledger_call("last_claim_time", self.ledger.last_claim_time(address)),
            self.ledger_call("total_participants", self.ledger.total_participants()),
            self.ledger_call("balance_of", self.ledger.balance_of(address)),
        )?;

        let last_claim_time = self.effective_last_claim(address, ledger_last);
        let remaining = cooldown_remaining(last_claim_time, self.clock.now());
        let phase = phase_info(participants);

        Ok(Eligibility {
            address: address.clone(),
            can_claim: remaining == 0,
            amount: phase.max_claim,
            min_amount: MIN_CLAIM,
            cooldown_remaining: remaining,
            cooldown_display: format_countdown(remaining),
            phase: phase.phase,
            phase_description: phase.description,
            total_participants: participants,
            last_claim_time,
            next_claim_at: last_claim_time.map(next_claim_after),
            balance: format_balance(balance, TOKEN_DECIMALS),
        })
    }

    /// Reject `amount` if it is out of range or the cooldown is active.
    ///
    /// The amount is checked first so that an invalid request is reported as
    /// such even while the cooldown runs.
    pub async fn check_claim(
        &self,
        address: &WalletAddress,
        amount: u64,
    ) -> Result<Eligibility, ClaimError> {
        let eligibility = self.get_eligibility(address).await?;
        if amount < eligibility.min_amount || amount > eligibility.amount {
            return Err(ClaimError::AmountOutOfRange {
                requested: amount,
                min: eligibility.min_amount,
                max: eligibility.amount,
            });
        }
        if !eligibility.can_claim {
            return Err(ClaimError::CooldownActive {
                remaining_secs: eligibility.cooldown_remaining,
            });
        }
        Ok(eligibility)
    }

    /// Validate a claim and obtain the contract call the wallet must send.
    pub async fn prepare_claim(
        &self,
        address: &WalletAddress,
        amount: u64,
    ) -> Result<ClaimCall, ClaimError> {
        self.check_claim(address, amount).await?;
        let call = self
            .ledger_call("prepare_claim", self.ledger.prepare_claim(address, amount))
            .await
            .inspect_err(|e| {
                tracing::info!(
                    address = %address,
                    amount,
                    error_code = e.error_code(),
                    "Claim refused"
                );
            })?;
        tracing::info!(address = %address, amount, "Claim prepared");
        Ok(call)
    }

    /// Reconcile a claim transaction sent by `address`.
    ///
    /// Only a confirmed `claim(amount)` call from `address` to the claim
    /// contract updates the cached view.
    pub async fn record_claim(
        &self,
        address: &WalletAddress,
        tx_hash: &str,
        amount: u64,
    ) -> Result<ClaimStatus, ClaimError> {
        let tx_hash = tx_hash
            .trim()
            .parse::<TxHash>()
            .map(alloy::hex::encode_prefixed)
            .map_err(|_| ClaimError::InvalidTransactionHash)?;
        let status = self
            .ledger_call(
                "transaction_status",
                self.ledger.transaction_status(&tx_hash),
            )
            .await?;

        match status {
            TxStatus::Confirmed {
                from,
                to,
                claim_amount,
            } => {
                self.check_claim_transaction(
                    address,
                    &tx_hash,
                    amount,
                    &from,
                    to,
                    claim_amount,
                )?;
                let claimed_at = match self.cache.get(address) {
                    Some(cached) if cached.tx_hash == tx_hash => cached.claimed_at,
                    _ => self.confirmed_claim_time(address).await,
                };
                self.cache.record(
                    address,
                    ConfirmedClaim {
                        claimed_at,
                        tx_hash: tx_hash.clone(),
                    },
                );
                tracing::info!(
                    address = %address,
                    tx_hash = %tx_hash,
                    amount,
                    "Claim confirmed"
                );
                let claimed_at = self
                    .effective_last_claim(address, Some(claimed_at))
                    .unwrap_or(claimed_at);
                Ok(ClaimStatus::Confirmed {
                    claimed_at,
                    next_claim_at: next_claim_after(claimed_at),
                })
            }
            TxStatus::Failed => {
                tracing::info!(
                    address = %address,
                    tx_hash = %tx_hash,
                    "Claim transaction reverted"
                );
                Err(ClaimError::LedgerRejected(
                    "claim transaction reverted".to_string(),
                ))
            }
            TxStatus::Pending | TxStatus::Unknown => Ok(ClaimStatus::Pending),
        }
    }

    fn check_claim_transaction(
        &self,
        address: &WalletAddress,
        tx_hash: &str,
        amount: u64,
        from: &WalletAddress,
        to: Option<WalletAddress>,
        claim_amount: Option<U256>,
    ) -> Result<(), ClaimError> {
        let reason = if from != address {
            "transaction was not sent by this address"
        } else if to.as_ref() != Some(&self.ledger.claim_contract()) {
            "transaction did not call the claim contract"
        } else if claim_amount.is_none() {
            "transaction is not a claim"
        } else if claim_amount != Some(amount_to_wei(amount, TOKEN_DECIMALS)) {
            "claimed amount does not match the transaction"
        } else {
            return Ok(());
        };
        tracing::warn!(
            address = %address,
            sender = %from,
            tx_hash,
            amount,
            reason,
            "Claim transaction refused"
        );
        Err(ClaimError::LedgerRejected(reason.to_string()))
    }

    /// Current phase derived from the ledger's participant count.
    pub async fn current_phase(&self) -> Result<PhaseSnapshot, ClaimError> {
        let participants = self
            .ledger_call("total_participants", self.ledger.total_participants())
            .await?;
        let phase = phase_info(participants);
        Ok(PhaseSnapshot {
            total_participants: participants,
            phase: phase.phase,
            max_claim: phase.max_claim,
            min_claim: MIN_CLAIM,
            description: phase.description,
        })
    }

    /// Latest of the ledger's answer and a cached confirmation.
    fn effective_last_claim(
        &self,
        address: &WalletAddress,
        ledger_last: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        let cached = self.cache.get(address).map(|c| c.claimed_at);
        match (ledger_last, cached) {
            (Some(l), Some(c)) => Some(l.max(c)),
            (l, c) => l.or(c),
        }
    }

    /// The ledger's claim time when it already reflects the claim, else now.
    async fn confirmed_claim_time(&self, address: &WalletAddress) -> DateTime<Utc> {
        let now = self.clock.now();
        match self
            .ledger_call("last_claim_time", self.ledger.last_claim_time(address))
            .await
        {
            Ok(Some(t)) if (now - t).num_seconds() < CLAIM_COOLDOWN_SECS => t,
            _ => now,
        }
    }

    async fn ledger_call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, ClaimError> {
        match tokio::time::timeout(self.config.ledger_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(LedgerError::Rejected(reason))) => Err(ClaimError::LedgerRejected(reason)),
            Ok(Err(LedgerError::Unavailable(reason))) => {
                tracing::warn!(operation, error = %reason, "Ledger unavailable");
                Err(ClaimError::LedgerUnavailable(format!("{operation} failed")))
            }
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.config.ledger_timeout.as_millis() as u64,
                    "Ledger call timed out"
                );
                Err(ClaimError::LedgerUnavailable(format!(
                    "{operation} timed out"
                )))
            }
        }
    }
}

fn next_claim_after(last: DateTime<Utc>) -> DateTime<Utc> {
    last + TimeDelta::seconds(CLAIM_COOLDOWN_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::InMemoryLedger;
    use crate::clock::ManualClock;

    struct Harness {
        engine: ClaimEngine,
        ledger: Arc<InMemoryLedger>,
        clock: ManualClock,
    }

    fn harness_with(config: ClaimConfig) -> Harness {
        let clock = ManualClock::at_epoch();
        let ledger = Arc::new(InMemoryLedger::new(Arc::new(clock.clone())));
        let engine = ClaimEngine::new(ledger.clone(), Arc::new(clock.clone()), config);
        Harness {
            engine,
            ledger,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(ClaimConfig::default())
    }

    fn alice() -> WalletAddress {
        WalletAddress::parse("0x1111111111111111111111111111111111111111").unwrap()
    }

    fn bob() -> WalletAddress {
        WalletAddress::parse("0x2222222222222222222222222222222222222222").unwrap()
    }

    #[tokio::test]
    async fn new_address_in_early_phase_can_claim_fifty() {
        let h = harness();
        h.ledger.set_base_participants(100);

        let e = h.engine.get_eligibility(&alice()).await.unwrap();
        assert!(e.can_claim);
        assert_eq!(e.amount, 50);
        assert_eq!(e.min_amount, 1);
        assert_eq!(e.phase, 1);
        assert_eq!(e.cooldown_remaining, 0);
        assert_eq!(e.cooldown_display, "0h 0m 0s");
        assert_eq!(e.last_claim_time, None);
        assert_eq!(e.balance, "0");
    }

    #[tokio::test]
    async fn cooldown_boundary_is_exactly_one_day() {
        let h = harness();
        let now = h.clock.now();

        h.ledger
            .set_last_claim(&alice(), now - TimeDelta::seconds(86_399));
        let e = h.engine.get_eligibility(&alice()).await.unwrap();
        assert!(!e.can_claim);
        assert_eq!(e.cooldown_remaining, 1);
        assert_eq!(e.cooldown_display, "0h 0m 1s");

        h.ledger
            .set_last_claim(&alice(), now - TimeDelta::seconds(86_400));
        let e = h.engine.get_eligibility(&alice()).await.unwrap();
        assert!(e.can_claim);
        assert_eq!(e.cooldown_remaining, 0);
    }

    #[tokio::test]
    async fn repeated_queries_are_identical() {
        let h = harness();
        h.ledger.set_base_participants(12_345);
        h.ledger
            .set_last_claim(&alice(), h.clock.now() - TimeDelta::hours(3));

        let first = h.engine.get_eligibility(&alice()).await.unwrap();
        let second = h.engine.get_eligibility(&alice()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.phase, 3);
    }

    #[tokio::test]
    async fn amount_bounds_are_distinct_from_cooldown() {
        let h = harness();
        h.ledger.set_base_participants(6_000);

        for bad in [0, 6, 1_000] {
            let err = h.engine.check_claim(&alice(), bad).await.unwrap_err();
            assert_eq!(
                err,
                ClaimError::AmountOutOfRange {
                    requested: bad,
                    min: 1,
                    max: 5
                }
            );
        }

        h.ledger
            .set_last_claim(&alice(), h.clock.now() - TimeDelta::hours(1));
        let err = h.engine.check_claim(&alice(), 5).await.unwrap_err();
        assert_eq!(
            err,
            ClaimError::CooldownActive {
                remaining_secs: 23 * 3600
            }
        );
        // An invalid amount is reported as such even during the cooldown.
        assert!(matches!(
            h.engine.check_claim(&alice(), 9).await,
            Err(ClaimError::AmountOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn prepare_claim_returns_contract_call() {
        let h = harness();
        let call = h.engine.prepare_claim(&alice(), 50).await.unwrap();
        assert_eq!(call.amount_wei, "50000000000000000000");
        assert!(call.data.starts_with("0x"));
    }

    #[tokio::test]
    async fn unavailable_ledger_is_reported_distinctly() {
        let h = harness();
        h.ledger.set_available(false);
        assert!(matches!(
            h.engine.get_eligibility(&alice()).await,
            Err(ClaimError::LedgerUnavailable(_))
        ));
        assert!(matches!(
            h.engine.current_phase().await,
            Err(ClaimError::LedgerUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn slow_ledger_times_out() {
        let h = harness_with(ClaimConfig {
            ledger_timeout: Duration::from_millis(20),
            ..ClaimConfig::default()
        });
        h.ledger.set_latency(Some(Duration::from_millis(500)));

        let err = h.engine.get_eligibility(&alice()).await.unwrap_err();
        assert!(matches!(err, ClaimError::LedgerUnavailable(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn confirmed_claim_starts_cooldown_even_if_ledger_lags() {
        let h = harness();
        let tx = h.ledger.execute_claim(&alice(), 10);

        let status = h.engine.record_claim(&alice(), &tx, 10).await.unwrap();
        let ClaimStatus::Confirmed {
            claimed_at,
            next_claim_at,
        } = status
        else {
            panic!("expected confirmation, got {status:?}");
        };
        assert_eq!(claimed_at, h.clock.now());
        assert_eq!((next_claim_at - claimed_at).num_seconds(), 86_400);

        // A lagging node forgets the claim; the cached confirmation still holds.
        h.ledger.rewind_last_claim(&alice());
        h.clock.advance_secs(60);
        let e = h.engine.get_eligibility(&alice()).await.unwrap();
        assert!(!e.can_claim);
        assert_eq!(e.cooldown_remaining, 86_400 - 60);

        // Reconciling the same transaction again changes nothing.
        h.engine.record_claim(&alice(), &tx, 10).await.unwrap();
        let again = h.engine.get_eligibility(&alice()).await.unwrap();
        assert_eq!(again, e);
    }

    #[tokio::test]
    async fn reverted_claim_is_rejected_and_not_cached() {
        let h = harness();
        h.ledger
            .set_last_claim(&alice(), h.clock.now() - TimeDelta::hours(30));
        let tx = h.ledger.execute_claim(&alice(), 500);

        assert!(matches!(
            h.engine.record_claim(&alice(), &tx, 500).await,
            Err(ClaimError::LedgerRejected(_))
        ));
        assert!(h.engine.get_eligibility(&alice()).await.unwrap().can_claim);
    }

    #[tokio::test]
    async fn pending_or_unknown_transactions_are_pending() {
        let h = harness();
        let tx = h.ledger.submit_pending(&alice());
        assert_eq!(
            h.engine.record_claim(&alice(), &tx, 1).await.unwrap(),
            ClaimStatus::Pending
        );
        assert_eq!(
            h.engine
                .record_claim(&alice(), &format!("0x{}", "ab".repeat(32)), 1)
                .await
                .unwrap(),
            ClaimStatus::Pending
        );
        assert!(h.engine.get_eligibility(&alice()).await.unwrap().can_claim);
    }

    #[tokio::test]
    async fn claim_by_another_address_cannot_be_recorded() {
        let h = harness();
        let tx = h.ledger.execute_claim(&bob(), 1);
        assert!(matches!(
            h.engine.record_claim(&alice(), &tx, 1).await,
            Err(ClaimError::LedgerRejected(_))
        ));
        assert!(h.engine.get_eligibility(&alice()).await.unwrap().can_claim);
    }

    #[tokio::test]
    async fn transaction_to_another_contract_is_not_a_claim() {
        let h = harness();
        let tx = h.ledger.submit_pending(&alice());
        h.ledger.settle(
            &tx,
            TxStatus::Confirmed {
                from: alice(),
                to: Some(bob()),
                claim_amount: Some(amount_to_wei(50, TOKEN_DECIMALS)),
            },
        );

        let err = h.engine.record_claim(&alice(), &tx, 50).await.unwrap_err();
        assert_eq!(
            err,
            ClaimError::LedgerRejected("transaction did not call the claim contract".to_string())
        );
        assert!(h.engine.get_eligibility(&alice()).await.unwrap().can_claim);
    }

    #[tokio::test]
    async fn other_call_to_claim_contract_is_not_a_claim() {
        let h = harness();
        let tx = h.ledger.submit_pending(&alice());
        h.ledger.settle(
            &tx,
            TxStatus::Confirmed {
                from: alice(),
                to: Some(h.ledger.claim_contract()),
                claim_amount: None,
            },
        );

        assert!(matches!(
            h.engine.record_claim(&alice(), &tx, 1).await,
            Err(ClaimError::LedgerRejected(_))
        ));
        assert!(h.engine.get_eligibility(&alice()).await.unwrap().can_claim);
    }

    #[tokio::test]
    async fn recorded_amount_must_match_the_transaction() {
        let h = harness();
        h.ledger
            .set_last_claim(&alice(), h.clock.now() - TimeDelta::hours(30));
        let tx = h.ledger.execute_claim(&alice(), 10);
        h.ledger.rewind_last_claim(&alice());

        let err = h.engine.record_claim(&alice(), &tx, 50).await.unwrap_err();
        assert_eq!(
            err,
            ClaimError::LedgerRejected("claimed amount does not match the transaction".to_string())
        );
        assert!(h.engine.get_eligibility(&alice()).await.unwrap().can_claim);

        assert!(matches!(
            h.engine.record_claim(&alice(), &tx, 10).await,
            Ok(ClaimStatus::Confirmed { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_tx_hash_is_refused_before_the_ledger() {
        let h = harness();
        h.ledger.set_available(false);
        for bad in ["", "0x1234", "not-a-hash"] {
            assert_eq!(
                h.engine.record_claim(&alice(), bad, 1).await,
                Err(ClaimError::InvalidTransactionHash)
            );
        }
    }

    #[tokio::test]
    async fn tx_hash_case_does_not_matter() {
        let h = harness();
        let tx = h.ledger.execute_claim(&alice(), 3);
        let upper = format!("0x{}", tx[2..].to_ascii_uppercase());
        assert!(matches!(
            h.engine.record_claim(&alice(), &upper, 3).await,
            Ok(ClaimStatus::Confirmed { .. })
        ));
    }

    #[tokio::test]
    async fn unavailable_ledger_reports_only_the_operation() {
        let h = harness();
        h.ledger.set_available(false);
        assert_eq!(
            h.engine.current_phase().await,
            Err(ClaimError::LedgerUnavailable(
                "total_participants failed".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn phase_snapshot_tracks_participants() {
        let h = harness();
        h.ledger.set_base_participants(14_999);
        let snapshot = h.engine.current_phase().await.unwrap();
        assert_eq!(snapshot.phase, 3);
        assert_eq!(snapshot.max_claim, 5);

        h.ledger.execute_claim(&alice(), 1);
        let snapshot = h.engine.current_phase().await.unwrap();
        assert_eq!(snapshot.total_participants, 15_000);
        assert_eq!(snapshot.phase, 4);
        assert_eq!(snapshot.max_claim, 4);
    }
}
