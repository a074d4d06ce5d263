// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signature Verification
//!
//! Proves that the holder of a wallet key signed a specific, server-issued
//! challenge.
//!
//! ## Checks (in order)
//!
//! 1. Message fields parse into a canonical EIP-4361 message
//! 2. The nonce exists, matches the message, is unconsumed and unexpired
//! 3. The EIP-191 signature recovers to the claimed address
//! 4. Domain and URI origin match this deployment, then the chain id
//! 5. The nonce is consumed atomically; a lost race is a replay
//!
//! Only this module can produce a [`VerifiedIdentity`].

use std::sync::Arc;

use alloy::primitives::Signature;

use super::message::{ChallengeMessage, SignInMessage};
use super::nonce::{ConsumeOutcome, NonceError, NonceIssuer};
use crate::clock::Clock;
use crate::models::WalletAddress;

/// Deployment values a sign-in message must be bound to.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Expected `domain` field (host, optionally with port).
    pub domain: String,
    /// Expected origin of the `uri` field, e.g. `https://app.example.com`.
    pub origin: String,
    pub chain_id: u64,
}

/// An address whose key-holder signed a valid challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    address: WalletAddress,
}

impl VerifiedIdentity {
    pub(crate) fn new(address: WalletAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &WalletAddress {
        &self.address
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("nonce is unknown or does not match the signed message")]
    NonceMismatch,
    #[error("nonce has expired")]
    NonceExpired,
    #[error("nonce has already been used")]
    NonceAlreadyConsumed,
    #[error("signature is invalid")]
    SignatureInvalid,
    #[error("signature does not match the claimed address")]
    AddressMismatch,
    #[error("message was not issued for this origin")]
    OriginMismatch,
    #[error("message was signed for a different chain")]
    ChainMismatch,
    #[error("malformed sign-in request: {0}")]
    MalformedMessage(String),
    #[error(transparent)]
    Nonce(#[from] NonceError),
}

impl VerifyError {
    pub fn error_code(&self) -> &'static str {
        match self {
            VerifyError::NonceMismatch => "nonce_mismatch",
            VerifyError::NonceExpired => "nonce_expired",
            VerifyError::NonceAlreadyConsumed => "nonce_already_consumed",
            VerifyError::SignatureInvalid => "signature_invalid",
            VerifyError::AddressMismatch => "address_mismatch",
            VerifyError::OriginMismatch => "origin_mismatch",
            VerifyError::ChainMismatch => "chain_mismatch",
            VerifyError::MalformedMessage(_) => "malformed_message",
            VerifyError::Nonce(NonceError::RandomnessUnavailable) => "randomness_unavailable",
            VerifyError::Nonce(NonceError::Store(_)) => "store_error",
        }
    }
}

pub struct SignatureVerifier {
    config: VerifierConfig,
    nonces: Arc<NonceIssuer>,
    clock: Arc<dyn Clock>,
}

impl SignatureVerifier {
    pub fn new(config: VerifierConfig, nonces: Arc<NonceIssuer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            nonces,
            clock,
        }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify a signed sign-in message and consume its nonce.
    pub async fn verify(
        &self,
        claimed_address: &str,
        fields: &SignInMessage,
        signature: &str,
        presented_nonce: &str,
    ) -> Result<VerifiedIdentity, VerifyError> {
        let result = self
            .verify_inner(claimed_address, fields, signature, presented_nonce)
            .await;
        match &result {
            Ok(identity) => {
                tracing::info!(address = %identity.address(), "Wallet signature verified");
            }
            Err(err) => {
                tracing::info!(
                    claimed_address,
                    error_code = err.error_code(),
                    "Wallet signature rejected"
                );
            }
        }
        result
    }

    async fn verify_inner(
        &self,
        claimed_address: &str,
        fields: &SignInMessage,
        signature: &str,
        presented_nonce: &str,
    ) -> Result<VerifiedIdentity, VerifyError> {
        let claimed = WalletAddress::parse(claimed_address)
            .map_err(|e| VerifyError::MalformedMessage(e.to_string()))?;
        let message = ChallengeMessage::from_fields(fields.clone())
            .map_err(|e| VerifyError::MalformedMessage(e.to_string()))?;

        let now = self.clock.now();
        let Some((record, raw)) = self.nonces.lookup(presented_nonce).await? else {
            return Err(VerifyError::NonceMismatch);
        };
        if message.nonce() != record.value {
            return Err(VerifyError::NonceMismatch);
        }
        if record.consumed {
            return Err(VerifyError::NonceAlreadyConsumed);
        }
        if record.is_expired_at(now) || message.expiration() <= now {
            return Err(VerifyError::NonceExpired);
        }

        let recovered = recover_signer(message.text(), signature)?;
        if recovered != claimed || message.address() != &claimed {
            return Err(VerifyError::AddressMismatch);
        }

        if !message.domain().eq_ignore_ascii_case(&self.config.domain)
            || message.origin() != self.config.origin
        {
            return Err(VerifyError::OriginMismatch);
        }
        if message.chain_id() != self.config.chain_id {
            return Err(VerifyError::ChainMismatch);
        }

        match self.nonces.consume(&record, &raw).await? {
            ConsumeOutcome::Consumed => Ok(VerifiedIdentity::new(claimed)),
            ConsumeOutcome::LostRace => Err(VerifyError::NonceAlreadyConsumed),
        }
    }
}

/// Recover the EIP-191 personal-message signer.
fn recover_signer(text: &str, signature: &str) -> Result<WalletAddress, VerifyError> {
    let bytes = alloy::hex::decode(signature.trim()).map_err(|_| VerifyError::SignatureInvalid)?;
    if bytes.len() != 65 {
        return Err(VerifyError::SignatureInvalid);
    }
    let sig = Signature::from_raw(&bytes).map_err(|_| VerifyError::SignatureInvalid)?;
    let address = sig
        .recover_address_from_msg(text.as_bytes())
        .map_err(|_| VerifyError::SignatureInvalid)?;
    Ok(WalletAddress::from(address))
}
