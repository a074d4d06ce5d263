// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC claim ledger backed by the deployed claim contract.

use alloy::{
    consensus::Transaction as _,
    network::ReceiptResponse,
    primitives::{TxHash, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    sol_types::SolCall,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::contracts::{decode_claim_amount, describe_revert, IClaim, IERC20};
use super::ledger::{amount_to_wei, ClaimLedger, LedgerError};
use super::types::*;
use crate::models::WalletAddress;

/// [`ClaimLedger`] talking to the claim and token contracts over HTTP.
pub struct AlloyClaimLedger {
    provider: DynProvider,
    contracts: ContractAddresses,
    claim: IClaim::IClaimInstance<DynProvider>,
    token: IERC20::IERC20Instance<DynProvider>,
}

impl AlloyClaimLedger {
    pub fn new(rpc_url: &str, contracts: ContractAddresses) -> Result<Self, LedgerClientError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerClientError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url).erased();
        let claim = IClaim::new(contracts.claim, provider.clone());
        let token = IERC20::new(contracts.token, provider.clone());

        Ok(Self {
            provider,
            contracts,
            claim,
            token,
        })
    }
}

#[async_trait]
impl ClaimLedger for AlloyClaimLedger {
    fn claim_contract(&self) -> WalletAddress {
        WalletAddress::from(self.contracts.claim)
    }

    async fn balance_of(&self, address: &WalletAddress) -> Result<U256, LedgerError> {
        self.token
            .balanceOf(address.to_address())
            .call()
            .await
            .map_err(rpc_error)
    }

    async fn last_claim_time(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<DateTime<Utc>>, LedgerError> {
        let raw: U256 = self
            .claim
            .lastClaimTime(address.to_address())
            .call()
            .await
            .map_err(rpc_error)?;
        if raw.is_zero() {
            return Ok(None);
        }
        let secs = u64::try_from(raw)
            .ok()
            .and_then(|s| i64::try_from(s).ok())
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .ok_or_else(|| LedgerError::Unavailable("lastClaimTime out of range".to_string()))?;
        Ok(Some(secs))
    }

    async fn total_participants(&self) -> Result<u64, LedgerError> {
        let raw: U256 = self.claim.totalUsers().call().await.map_err(rpc_error)?;
        Ok(u64::try_from(raw).unwrap_or(u64::MAX))
    }

    async fn prepare_claim(
        &self,
        address: &WalletAddress,
        amount: u64,
    ) -> Result<ClaimCall, LedgerError> {
        let wei = amount_to_wei(amount, TOKEN_DECIMALS);

        // Pre-flight from the claimant's address; a revert means the contract refuses.
        self.claim
            .claim(wei)
            .from(address.to_address())
            .call()
            .await
            .map_err(classify_call_error)?;

        let data = IClaim::claimCall { amount: wei }.abi_encode();
        Ok(ClaimCall {
            to: WalletAddress::from(self.contracts.claim),
            data: alloy::hex::encode_prefixed(data),
            amount_wei: wei.to_string(),
        })
    }

    async fn transaction_status(&self, tx_hash: &str) -> Result<TxStatus, LedgerError> {
        let hash: TxHash = tx_hash
            .parse()
            .map_err(|_| LedgerError::Rejected("invalid transaction hash".to_string()))?;

        let transaction = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .map_err(rpc_error)?;
        let Some(transaction) = transaction else {
            return Ok(TxStatus::Unknown);
        };

        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(rpc_error)?;
        Ok(match receipt {
            Some(receipt) if receipt.status() => TxStatus::Confirmed {
                from: WalletAddress::from(receipt.from()),
                to: receipt.to().map(WalletAddress::from),
                claim_amount: decode_claim_amount(transaction.input()),
            },
            Some(_) => TxStatus::Failed,
            None => TxStatus::Pending,
        })
    }
}

// The RPC URL may embed an API key; transport details stay in the log.
fn rpc_error(err: impl std::fmt::Display) -> LedgerError {
    tracing::warn!(error = %err, "Ledger RPC call failed");
    LedgerError::Unavailable("RPC request failed".to_string())
}

fn classify_call_error(err: alloy::contract::Error) -> LedgerError {
    match err.as_revert_data() {
        Some(data) => LedgerError::Rejected(describe_revert(&data)),
        None => rpc_error(err),
    }
}

/// Errors that can occur while constructing the ledger client.
#[derive(Debug, thiserror::Error)]
pub enum LedgerClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),
}
