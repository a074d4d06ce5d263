// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claim and reward-token contract bindings.

use alloy::primitives::U256;
use alloy::sol;
use alloy::sol_types::{SolCall, SolError};

// Define the contract interfaces using alloy's sol! macro
sol! {
    #[sol(rpc)]
    interface IClaim {
        function minClaim() external view returns (uint256);
        function getCurrentMaxClaim() external view returns (uint256);
        function lastClaimTime(address user) external view returns (uint256);
        function canClaim(address user) external view returns (bool);
        function totalUsers() external view returns (uint256);
        function claim(uint256 amount) external;

        event Claimed(address indexed user, uint256 amount, uint256 timestamp);

        error InsufficientAmount(uint256 provided, uint256 minimum);
        error ExcessiveAmount(uint256 provided, uint256 maximum);
        error ClaimTooSoon(uint256 timeLeft);
        error AlreadyClaimed(address user);
    }
}

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

/// Amount argument of `claim(uint256)` call data.
pub fn decode_claim_amount(input: &[u8]) -> Option<U256> {
    IClaim::claimCall::abi_decode(input)
        .ok()
        .map(|call| call.amount)
}

/// Human-readable reason for claim-contract revert data.
pub fn describe_revert(data: &[u8]) -> String {
    let Some(selector) = data.get(..4) else {
        return "execution reverted".to_string();
    };
    if selector == &IClaim::InsufficientAmount::SELECTOR[..] {
        "amount below the contract minimum".to_string()
    } else if selector == &IClaim::ExcessiveAmount::SELECTOR[..] {
        "amount above the current phase maximum".to_string()
    } else if selector == &IClaim::ClaimTooSoon::SELECTOR[..] {
        "claim cooldown has not elapsed".to_string()
    } else if selector == &IClaim::AlreadyClaimed::SELECTOR[..] {
        "address has already claimed".to_string()
    } else {
        format!("execution reverted ({})", alloy::hex::encode_prefixed(selector))
    }
}
