// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::WalletAddress;

/// EVM network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// World Chain mainnet configuration.
pub const WORLD_CHAIN: NetworkConfig = NetworkConfig {
    name: "World Chain",
    chain_id: 480,
    rpc_url: "https://worldchain-mainnet.g.alchemy.com/public",
    explorer_url: "https://worldscan.org",
};

/// Default claim contract deployment on World Chain.
pub const DEFAULT_CLAIM_CONTRACT: &str = "0xfA087564057A805e47C379935DCd2889c903ec3a";

/// Default reward token deployment on World Chain.
pub const DEFAULT_TOKEN_CONTRACT: &str = "0x6B44699577d2EC9669802b3a4F8F91ecc4Aa8789";

/// Decimals of the reward token.
pub const TOKEN_DECIMALS: u8 = 18;

/// Contract addresses the ledger talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub claim: Address,
    pub token: Address,
}

/// Lifecycle of a submitted claim transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Known to the node but not yet mined.
    Pending,
    /// Mined successfully.
    Confirmed {
        from: WalletAddress,
        to: Option<WalletAddress>,
        /// Argument of `claim(amount)` in base units, `None` for any other call data.
        claim_amount: Option<U256>,
    },
    /// Mined but reverted.
    Failed,
    /// Unknown to the node.
    Unknown,
}

/// Transaction the user's wallet must send to execute a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClaimCall {
    /// Claim contract address.
    pub to: WalletAddress,
    /// ABI-encoded `claim(uint256)` calldata, hex with `0x` prefix.
    pub data: String,
    /// Claim amount in base units (18 decimals), decimal string.
    pub amount_wei: String,
}
