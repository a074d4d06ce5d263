// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The external claim ledger.
//!
//! The claim contract is the source of truth for cooldowns, participant
//! counts and balances. This service only reads it, pre-flights claims and
//! reconciles submitted transactions.

use alloy::primitives::U256;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{ClaimCall, TxStatus};
use crate::models::WalletAddress;

/// Errors returned by a ledger backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Transport failure or node unavailable. Safe to retry after backoff.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The contract refused the operation.
    #[error("ledger rejected the claim: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait ClaimLedger: Send + Sync {
    /// Address of the claim contract claims must be sent to.
    fn claim_contract(&self) -> WalletAddress;

    /// Reward token balance in base units.
    async fn balance_of(&self, address: &WalletAddress) -> Result<U256, LedgerError>;

    /// Time of the address's last claim, `None` if it never claimed.
    async fn last_claim_time(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<DateTime<Utc>>, LedgerError>;

    /// Number of distinct addresses that have ever claimed.
    async fn total_participants(&self) -> Result<u64, LedgerError>;

    /// Simulate `claim(amount)` from `address` and return the call to send.
    async fn prepare_claim(
        &self,
        address: &WalletAddress,
        amount: u64,
    ) -> Result<ClaimCall, LedgerError>;

    /// Status of a claim transaction by its canonical `0x`-prefixed hash.
    async fn transaction_status(&self, tx_hash: &str) -> Result<TxStatus, LedgerError>;
}

/// Convert whole tokens into base units.
pub fn amount_to_wei(amount: u64, decimals: u8) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(decimals))
}

/// Format a base-unit balance with the specified number of decimals.
pub fn format_balance(balance: U256, decimals: u8) -> String {
    if balance.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = balance / divisor;
    let remainder = balance % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        // Up to 6 decimal places, truncated
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, &trimmed[..trimmed.len().min(6)])
        }
    }
}
