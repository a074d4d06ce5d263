// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. All types derive `Serialize`
//! / `Deserialize` and `ToSchema` for JSON handling and OpenAPI docs.
//!
//! ## Wallet Address Type
//!
//! [`WalletAddress`] is the canonical subject identifier: a validated EVM
//! address stored in lower-case `0x`-prefixed form. Request bodies carry raw
//! strings so that malformed addresses surface as `400 Bad Request` from the
//! handler instead of a generic JSON rejection.
//!
//! ## Model Categories
//!
//! - **Auth**: nonce issuance, signature verification, session lookups
//! - **Claims**: eligibility, claim submission and confirmation
//! - **Identity**: proof-of-personhood verification

use std::str::FromStr;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::message::SignInMessage;
use crate::blockchain::ClaimCall;
use crate::identity::IdentityProof;

// =============================================================================
// Wallet Address Type
// =============================================================================

/// EVM wallet address in canonical lower-case form.
///
/// # Example
///
/// ```rust,ignore
/// let addr = WalletAddress::parse("0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266")?;
/// assert_eq!(addr.as_str(), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
#[schema(example = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266")]
pub struct WalletAddress(String);

/// Returned when a string is not a 20-byte hex address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid wallet address: {0}")]
pub struct AddressParseError(String);

impl WalletAddress {
    /// Parse any-case hex (with or without `0x`) into canonical form.
    pub fn parse(raw: &str) -> Result<Self, AddressParseError> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if hex.len() != 40 {
            return Err(AddressParseError(raw.to_string()));
        }
        let address =
            Address::from_str(hex).map_err(|_| AddressParseError(raw.to_string()))?;
        Ok(Self::from(address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The parsed 20-byte address.
    pub fn to_address(&self) -> Address {
        // Canonical strings are validated on construction.
        Address::from_str(&self.0).unwrap_or(Address::ZERO)
    }

    /// EIP-55 mixed-case form, as it appears in sign-in messages.
    pub fn checksummed(&self) -> String {
        self.to_address().to_checksum(None)
    }
}

impl From<Address> for WalletAddress {
    fn from(value: Address) -> Self {
        WalletAddress(alloy::hex::encode_prefixed(value))
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        WalletAddress::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Auth Models
// =============================================================================

/// A freshly issued sign-in nonce.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NonceResponse {
    /// Single-use challenge value to embed in the sign-in message.
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    /// The nonce is rejected at and after this instant.
    pub expires_at: DateTime<Utc>,
}

/// Signed sign-in message submitted for verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Address the client claims to control.
    pub claimed_address: String,
    /// 65-byte secp256k1 signature, hex encoded.
    pub signature: String,
    /// Nonce previously issued by `/v1/auth/nonce`.
    pub nonce: String,
    /// The fields the wallet signed, used to rebuild the exact message text.
    pub message: SignInMessage,
}

/// Successful verification result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub success: bool,
    /// Bearer credential for subsequent requests.
    pub session_token: String,
    pub address: WalletAddress,
    pub expires_at: DateTime<Utc>,
}

/// The session behind a bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub address: WalletAddress,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whether the address has passed identity-proof verification.
    pub identity_verified: bool,
}

/// Logout acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
}

// =============================================================================
// Claim Models
// =============================================================================

/// Request to claim `amount` whole tokens.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimRequest {
    pub amount: u64,
}

/// Claim accepted by the contract pre-flight.
///
/// The wallet sends `transaction` and reports the hash to
/// `/v1/claim/confirm`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimResponse {
    pub success: bool,
    pub amount: u64,
    pub transaction: ClaimCall,
}

/// Reconcile a claim transaction sent by the session's wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmClaimRequest {
    pub tx_hash: String,
    pub amount: u64,
}

// =============================================================================
// Identity Models
// =============================================================================

/// Identity proof produced by the user's identity wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityVerifyRequest {
    #[serde(flatten)]
    pub proof: IdentityProof,
    /// Action the proof was generated for; defaults to the configured action.
    #[serde(default)]
    pub action: Option<String>,
}

/// Identity verification outcome.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityVerifyResponse {
    pub verified: bool,
    pub action: String,
}
