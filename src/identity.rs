// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Proofs
//!
//! Proof-of-personhood verification through an external oracle (World ID
//! style). A proof is bound to the signed-in wallet by using its address as
//! the proof signal. Successful verifications are recorded under
//! `identity:{address}` and reported on the session endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::models::WalletAddress;
use crate::store::{get_json, set_json, KvStore, StoreError};

/// Default action identifier proofs are generated for.
pub const DEFAULT_IDENTITY_ACTION: &str = "claim-daily-vldx";

/// How long a successful verification is remembered.
const IDENTITY_RECORD_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Oracle request timeout.
const ORACLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Zero-knowledge proof produced by the user's identity app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentityProof {
    pub proof: String,
    pub nullifier_hash: String,
    pub merkle_root: String,
    /// e.g. `orb` or `device`
    pub verification_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("identity oracle unavailable: {0}")]
    Unavailable(String),
}

/// Black-box verifier of identity proofs.
#[async_trait]
pub trait IdentityOracle: Send + Sync {
    /// Whether `proof` is valid for `signal` under `action`.
    async fn verify_proof(
        &self,
        proof: &IdentityProof,
        signal: &str,
        action: &str,
    ) -> Result<bool, OracleError>;
}

#[derive(Serialize)]
struct VerifyPayload<'a> {
    nullifier_hash: &'a str,
    merkle_root: &'a str,
    proof: &'a str,
    verification_level: &'a str,
    action: &'a str,
    signal: &'a str,
}

#[derive(Deserialize)]
struct VerifyResult {
    #[serde(default)]
    success: Option<bool>,
}

/// Oracle reached over HTTPS.
#[derive(Clone)]
pub struct HttpIdentityOracle {
    verify_url: String,
    client: reqwest::Client,
}

impl HttpIdentityOracle {
    pub fn new(verify_url: impl Into<String>) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(ORACLE_TIMEOUT)
            .build()
            .map_err(|e| {
                OracleError::Unavailable(format!("failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            verify_url: verify_url.into(),
            client,
        })
    }
}

#[async_trait]
impl IdentityOracle for HttpIdentityOracle {
    async fn verify_proof(
        &self,
        proof: &IdentityProof,
        signal: &str,
        action: &str,
    ) -> Result<bool, OracleError> {
        let payload = VerifyPayload {
            nullifier_hash: &proof.nullifier_hash,
            merkle_root: &proof.merkle_root,
            proof: &proof.proof,
            verification_level: &proof.verification_level,
            action,
            signal,
        };

        let response = self
            .client
            .post(&self.verify_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Identity oracle request failed");
                OracleError::Unavailable("request failed".to_string())
            })?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(status = %status, "Identity proof rejected by oracle");
            return Ok(false);
        }
        if !status.is_success() {
            return Err(OracleError::Unavailable(format!(
                "HTTP {status} from identity oracle"
            )));
        }

        let result: VerifyResult = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "Identity oracle returned an unreadable body");
            OracleError::Unavailable("unreadable response".to_string())
        })?;
        // Only an explicit `success: true` verifies.
        Ok(result.success.unwrap_or(false))
    }
}

/// Stand-in used when no verification endpoint is configured.
pub struct UnconfiguredOracle;

#[async_trait]
impl IdentityOracle for UnconfiguredOracle {
    async fn verify_proof(
        &self,
        _proof: &IdentityProof,
        _signal: &str,
        _action: &str,
    ) -> Result<bool, OracleError> {
        Err(OracleError::Unavailable(
            "identity verification is not configured".to_string(),
        ))
    }
}

/// Stored proof of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub address: WalletAddress,
    pub nullifier_hash: String,
    pub action: String,
    pub verified_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IdentityError {
    pub fn error_code(&self) -> &'static str {
        match self {
            IdentityError::Oracle(_) => "identity_oracle_unavailable",
            IdentityError::Store(_) => "store_error",
        }
    }
}

/// Verifies proofs and remembers verified addresses.
pub struct IdentityService {
    oracle: Arc<dyn IdentityOracle>,
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    default_action: String,
}

impl IdentityService {
    pub fn new(
        oracle: Arc<dyn IdentityOracle>,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        default_action: impl Into<String>,
    ) -> Self {
        Self {
            oracle,
            store,
            clock,
            default_action: default_action.into(),
        }
    }

    pub fn default_action(&self) -> &str {
        &self.default_action
    }

    /// Verify `proof` for `address`. Returns whether the oracle accepted it.
    pub async fn verify(
        &self,
        address: &WalletAddress,
        proof: &IdentityProof,
        action: Option<&str>,
    ) -> Result<bool, IdentityError> {
        let action = action.unwrap_or(&self.default_action);
        let verified = self
            .oracle
            .verify_proof(proof, address.as_str(), action)
            .await?;

        if verified {
            let record = IdentityRecord {
                address: address.clone(),
                nullifier_hash: proof.nullifier_hash.clone(),
                action: action.to_string(),
                verified_at: self.clock.now(),
            };
            set_json(
                self.store.as_ref(),
                &identity_key(address),
                &record,
                IDENTITY_RECORD_TTL,
            )
            .await?;
            tracing::info!(address = %address, action, "Identity proof verified");
        } else {
            tracing::info!(address = %address, action, "Identity proof not verified");
        }
        Ok(verified)
    }

    pub async fn is_verified(&self, address: &WalletAddress) -> Result<bool, IdentityError> {
        Ok(get_json::<IdentityRecord>(self.store.as_ref(), &identity_key(address))
            .await?
            .is_some())
    }
}

fn identity_key(address: &WalletAddress) -> String {
    format!("identity:{address}")
}
