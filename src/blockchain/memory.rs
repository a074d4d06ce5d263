// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process ledger with the claim contract's rules.
//!
//! Used by tests and local runs without an RPC node. Claims are executed
//! through [`InMemoryLedger::execute_claim`], which plays the role of the
//! user's wallet sending the prepared transaction.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{keccak256, Address, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::contracts::IClaim;
use super::ledger::{amount_to_wei, ClaimLedger, LedgerError};
use super::types::{ClaimCall, TxStatus, DEFAULT_CLAIM_CONTRACT, TOKEN_DECIMALS};
use crate::claim::phase::{cooldown_remaining, phase_info, MIN_CLAIM};
use crate::clock::Clock;
use crate::models::WalletAddress;

#[derive(Default)]
struct LedgerState {
    last_claims: HashMap<WalletAddress, DateTime<Utc>>,
    balances: HashMap<WalletAddress, U256>,
    claimers: HashSet<WalletAddress>,
    /// Participants counted before this ledger started.
    base_participants: u64,
    transactions: HashMap<String, TxStatus>,
}

pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    clock: Arc<dyn Clock>,
    claim_contract: WalletAddress,
    available: AtomicBool,
    latency: Mutex<Option<Duration>>,
    tx_counter: AtomicU64,
}

impl InMemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let claim_contract = WalletAddress::from(
            DEFAULT_CLAIM_CONTRACT
                .parse::<Address>()
                .unwrap_or(Address::ZERO),
        );
        Self {
            state: Mutex::new(LedgerState::default()),
            clock,
            claim_contract,
            available: AtomicBool::new(true),
            latency: Mutex::new(None),
            tx_counter: AtomicU64::new(0),
        }
    }

    /// Simulate an unreachable node.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut current) = self.latency.lock() {
            *current = latency;
        }
    }

    /// Participants that claimed before this ledger's history.
    pub fn set_base_participants(&self, participants: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.base_participants = participants;
        }
    }

    /// Seed a historical claim.
    pub fn set_last_claim(&self, address: &WalletAddress, at: DateTime<Utc>) {
        if let Ok(mut state) = self.state.lock() {
            state.last_claims.insert(address.clone(), at);
            state.claimers.insert(address.clone());
        }
    }

    /// Submit a claim transaction that stays pending until [`settle`](Self::settle).
    pub fn submit_pending(&self, address: &WalletAddress) -> String {
        let tx_hash = self.next_tx_hash(address);
        if let Ok(mut state) = self.state.lock() {
            state.transactions.insert(tx_hash.clone(), TxStatus::Pending);
        }
        tx_hash
    }

    /// Execute `claim(amount)` as `address`, enforcing the contract rules.
    ///
    /// A rule violation is recorded as a mined-but-reverted transaction.
    pub fn execute_claim(&self, address: &WalletAddress, amount: u64) -> String {
        let tx_hash = self.next_tx_hash(address);
        let now = self.clock.now();
        if let Ok(mut state) = self.state.lock() {
            let status = match check_contract_rules(&state, address, amount, now) {
                Ok(()) => {
                    state.last_claims.insert(address.clone(), now);
                    state.claimers.insert(address.clone());
                    let balance = state.balances.entry(address.clone()).or_default();
                    let wei = amount_to_wei(amount, TOKEN_DECIMALS);
                    *balance += wei;
                    TxStatus::Confirmed {
                        from: address.clone(),
                        to: Some(self.claim_contract.clone()),
                        claim_amount: Some(wei),
                    }
                }
                Err(_) => TxStatus::Failed,
            };
            state.transactions.insert(tx_hash.clone(), status);
        }
        tx_hash
    }

    /// Force the final status of a previously submitted transaction.
    pub fn settle(&self, tx_hash: &str, status: TxStatus) {
        if let Ok(mut state) = self.state.lock() {
            state
                .transactions
                .insert(tx_hash.to_ascii_lowercase(), status);
        }
    }

    /// Forget a confirmed claim, as a lagging node would.
    pub fn rewind_last_claim(&self, address: &WalletAddress) {
        if let Ok(mut state) = self.state.lock() {
            state.last_claims.remove(address);
        }
    }

    fn next_tx_hash(&self, address: &WalletAddress) -> String {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let mut preimage = address.to_address().to_vec();
        preimage.extend_from_slice(&n.to_be_bytes());
        alloy::hex::encode_prefixed(keccak256(preimage))
    }

    async fn enter(&self) -> Result<(), LedgerError> {
        let latency = self.latency.lock().ok().and_then(|l| *l);
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("node unreachable".to_string()))
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&LedgerState) -> T) -> Result<T, LedgerError> {
        self.state
            .lock()
            .map(|state| f(&state))
            .map_err(|_| LedgerError::Unavailable("ledger state poisoned".to_string()))
    }
}

fn check_contract_rules(
    state: &LedgerState,
    address: &WalletAddress,
    amount: u64,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    let max = phase_info(participants(state)).max_claim;
    if amount < MIN_CLAIM {
        return Err(LedgerError::Rejected(
            "amount below the contract minimum".to_string(),
        ));
    }
    if amount > max {
        return Err(LedgerError::Rejected(
            "amount above the current phase maximum".to_string(),
        ));
    }
    if cooldown_remaining(state.last_claims.get(address).copied(), now) > 0 {
        return Err(LedgerError::Rejected(
            "claim cooldown has not elapsed".to_string(),
        ));
    }
    Ok(())
}

fn participants(state: &LedgerState) -> u64 {
    state
        .base_participants
        .saturating_add(state.claimers.len() as u64)
}

#[async_trait]
impl ClaimLedger for InMemoryLedger {
    fn claim_contract(&self) -> WalletAddress {
        self.claim_contract.clone()
    }

    async fn balance_of(&self, address: &WalletAddress) -> Result<U256, LedgerError> {
        self.enter().await?;
        self.with_state(|s| s.balances.get(address).copied().unwrap_or_default())
    }

    async fn last_claim_time(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<DateTime<Utc>>, LedgerError> {
        self.enter().await?;
        self.with_state(|s| s.last_claims.get(address).copied())
    }

    async fn total_participants(&self) -> Result<u64, LedgerError> {
        self.enter().await?;
        self.with_state(participants)
    }

    async fn prepare_claim(
        &self,
        address: &WalletAddress,
        amount: u64,
    ) -> Result<ClaimCall, LedgerError> {
        self.enter().await?;
        let now = self.clock.now();
        self.with_state(|s| check_contract_rules(s, address, amount, now))??;

        let wei = amount_to_wei(amount, TOKEN_DECIMALS);
        let data = IClaim::claimCall { amount: wei }.abi_encode();
        Ok(ClaimCall {
            to: self.claim_contract.clone(),
            data: alloy::hex::encode_prefixed(data),
            amount_wei: wei.to_string(),
        })
    }

    async fn transaction_status(&self, tx_hash: &str) -> Result<TxStatus, LedgerError> {
        self.enter().await?;
        let key = tx_hash.to_ascii_lowercase();
        self.with_state(|s| s.transactions.get(&key).cloned().unwrap_or(TxStatus::Unknown))
    }
}
