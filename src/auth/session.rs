// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sessions
//!
//! Bearer credentials are HS256 JWTs carrying `sub` (lower-case address),
//! `jti` (32 random bytes, hex), `iat`, `exp` and `iss`. Every token also
//! has a central [`SessionRecord`] stored under `session:{jti}`, which is
//! what makes revocation effective on the very next validation.
//!
//! ## Validation Order
//!
//! 1. Signature, issuer and required claims: failure is `Malformed`
//! 2. `exp` against the injected clock: `Expired`
//! 3. Stored record missing or revoked: `Revoked`
//!
//! Records stay readable for [`SESSION_RECORD_GRACE`] past `expires_at`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::SystemRandom;
use serde::{Deserialize, Serialize};

use super::nonce::{random_hex, NonceError};
use super::verifier::VerifiedIdentity;
use crate::clock::Clock;
use crate::models::WalletAddress;
use crate::store::{get_json, set_json, KvStore, StoreError};

/// Default absolute session lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// How long a record outlives its session.
pub const SESSION_RECORD_GRACE: Duration = Duration::from_secs(24 * 60 * 60);

/// Minimum HMAC key length accepted for signing sessions.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

const TOKEN_ID_BYTES: usize = 32;

#[derive(Clone)]
pub struct SessionConfig {
    pub signing_key: Vec<u8>,
    pub issuer: String,
    pub ttl: Duration,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("signing_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    jti: String,
    iat: i64,
    exp: i64,
    iss: String,
}

/// Central state of one issued session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub subject_address: WalletAddress,
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

/// A freshly issued bearer credential.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub address: WalletAddress,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Validated view of a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub address: WalletAddress,
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session token is malformed")]
    Malformed,
    #[error("session has expired")]
    Expired,
    #[error("session has been revoked")]
    Revoked,
    #[error("secure randomness unavailable")]
    RandomnessUnavailable,
    #[error("failed to sign session token: {0}")]
    Signing(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::Malformed => "session_malformed",
            SessionError::Expired => "session_expired",
            SessionError::Revoked => "session_revoked",
            SessionError::RandomnessUnavailable => "randomness_unavailable",
            SessionError::Signing(_) => "session_signing_failed",
            SessionError::Store(_) => "store_error",
        }
    }
}

impl From<NonceError> for SessionError {
    fn from(value: NonceError) -> Self {
        match value {
            NonceError::RandomnessUnavailable => SessionError::RandomnessUnavailable,
            NonceError::Store(e) => SessionError::Store(e),
        }
    }
}

pub struct SessionManager {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
}

impl SessionManager {
    pub fn new(config: SessionConfig, store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock instead.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(&config.signing_key),
            decoding_key: DecodingKey::from_secret(&config.signing_key),
            validation,
            config,
            store,
            clock,
            rng: SystemRandom::new(),
        }
    }

    /// Issue a session for an address that just proved key control.
    pub async fn create_session(
        &self,
        identity: VerifiedIdentity,
    ) -> Result<SessionToken, SessionError> {
        let now = self.clock.now();
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let ttl = TimeDelta::from_std(self.config.ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let token_id = random_hex(&self.rng, TOKEN_ID_BYTES)?;
        let address = identity.address().clone();

        let claims = SessionClaims {
            sub: address.to_string(),
            jti: token_id.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Signing(e.to_string()))?;

        let record = SessionRecord {
            subject_address: address.clone(),
            token_id: token_id.clone(),
            issued_at,
            expires_at,
            revoked: false,
        };
        set_json(
            self.store.as_ref(),
            &session_key(&token_id),
            &record,
            retention(&record, now),
        )
        .await?;

        tracing::info!(address = %address, expires_at = %expires_at, "Session created");
        Ok(SessionToken {
            token,
            address,
            issued_at,
            expires_at,
        })
    }

    /// Subject address of a live session.
    pub async fn validate_session(&self, token: &str) -> Result<WalletAddress, SessionError> {
        Ok(self.describe_session(token).await?.address)
    }

    /// Full view of a live session.
    pub async fn describe_session(&self, token: &str) -> Result<SessionInfo, SessionError> {
        let (record, _) = self.authenticate(token).await?;
        Ok(SessionInfo {
            address: record.subject_address,
            token_id: record.token_id,
            issued_at: record.issued_at,
            expires_at: record.expires_at,
        })
    }

    /// Revoke a session. Revoking an invalid or already revoked token succeeds.
    pub async fn revoke_session(&self, token: &str) -> Result<(), SessionError> {
        let Ok(claims) = self.decode_claims(token) else {
            return Ok(());
        };
        let key = session_key(&claims.jti);
        loop {
            let Some((record, raw)) =
                get_json::<SessionRecord>(self.store.as_ref(), &key).await?
            else {
                return Ok(());
            };
            if record.revoked {
                return Ok(());
            }
            if self.mark_revoked(&record, &raw).await? {
                tracing::info!(address = %record.subject_address, "Session revoked");
                return Ok(());
            }
        }
    }

    /// Exchange a live session for a new one. The old token is revoked.
    pub async fn refresh_session(&self, token: &str) -> Result<SessionToken, SessionError> {
        let (record, raw) = self.authenticate(token).await?;
        if !self.mark_revoked(&record, &raw).await? {
            return Err(SessionError::Revoked);
        }
        self.create_session(VerifiedIdentity::new(record.subject_address))
            .await
    }

    async fn authenticate(&self, token: &str) -> Result<(SessionRecord, Vec<u8>), SessionError> {
        let claims = self.decode_claims(token)?;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(SessionError::Expired);
        }

        let Some((record, raw)) =
            get_json::<SessionRecord>(self.store.as_ref(), &session_key(&claims.jti)).await?
        else {
            return Err(SessionError::Revoked);
        };
        if record.subject_address.as_str() != claims.sub {
            return Err(SessionError::Malformed);
        }
        if self.clock.now() >= record.expires_at {
            return Err(SessionError::Expired);
        }
        if record.revoked {
            return Err(SessionError::Revoked);
        }
        Ok((record, raw))
    }

    fn decode_claims(&self, token: &str) -> Result<SessionClaims, SessionError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Session token rejected");
                SessionError::Malformed
            })
    }

    async fn mark_revoked(&self, record: &SessionRecord, raw: &[u8]) -> Result<bool, SessionError> {
        let revoked = SessionRecord {
            revoked: true,
            ..record.clone()
        };
        let bytes = serde_json::to_vec(&revoked).map_err(StoreError::from)?;
        Ok(self
            .store
            .compare_and_swap(
                &session_key(&record.token_id),
                raw,
                bytes,
                retention(record, self.clock.now()),
            )
            .await?)
    }
}

fn session_key(token_id: &str) -> String {
    format!("session:{token_id}")
}

/// Store TTL keeping the record until `expires_at + SESSION_RECORD_GRACE`.
fn retention(record: &SessionRecord, now: DateTime<Utc>) -> Duration {
    let remaining = (record.expires_at - now).to_std().unwrap_or(Duration::ZERO);
    remaining.saturating_add(SESSION_RECORD_GRACE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::InMemoryKvStore;

    const ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn config(key: &[u8]) -> SessionConfig {
        SessionConfig {
            signing_key: key.to_vec(),
            issuer: "relational-claim".to_string(),
            ttl: DEFAULT_SESSION_TTL,
        }
    }

    fn manager() -> (SessionManager, ManualClock, Arc<InMemoryKvStore>) {
        let clock = ManualClock::at_epoch();
        let store = Arc::new(InMemoryKvStore::new(Arc::new(clock.clone())));
        let manager = SessionManager::new(
            config(b"0123456789abcdef0123456789abcdef"),
            store.clone(),
            Arc::new(clock.clone()),
        );
        (manager, clock, store)
    }

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity::new(WalletAddress::parse(ADDRESS).unwrap())
    }

    #[tokio::test]
    async fn created_session_validates_to_subject() {
        let (manager, clock, _) = manager();
        let session = manager.create_session(identity()).await.unwrap();

        assert_eq!(session.issued_at, clock.now());
        assert_eq!((session.expires_at - session.issued_at).num_days(), 7);
        assert_eq!(
            manager.validate_session(&session.token).await.unwrap().as_str(),
            ADDRESS
        );
    }

    #[tokio::test]
    async fn tokens_are_unique_per_issuance() {
        let (manager, _, _) = manager();
        let a = manager.create_session(identity()).await.unwrap();
        let b = manager.create_session(identity()).await.unwrap();
        assert_ne!(a.token, b.token);
    }

    #[tokio::test]
    async fn session_expires_at_absolute_deadline() {
        let (manager, clock, _) = manager();
        let session = manager.create_session(identity()).await.unwrap();

        clock.advance_secs(7 * 24 * 3600 - 1);
        assert!(manager.validate_session(&session.token).await.is_ok());

        clock.advance_secs(1);
        assert!(matches!(
            manager.validate_session(&session.token).await,
            Err(SessionError::Expired)
        ));

        // Long after the record is gone, the token still reads as expired.
        clock.advance_secs(30 * 24 * 3600);
        assert!(matches!(
            manager.validate_session(&session.token).await,
            Err(SessionError::Expired)
        ));
    }

    #[tokio::test]
    async fn revocation_is_immediate_and_idempotent() {
        let (manager, _, _) = manager();
        let session = manager.create_session(identity()).await.unwrap();

        manager.revoke_session(&session.token).await.unwrap();
        assert!(matches!(
            manager.validate_session(&session.token).await,
            Err(SessionError::Revoked)
        ));
        manager.revoke_session(&session.token).await.unwrap();
        manager.revoke_session("garbage").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_validations_of_revoked_token_both_fail() {
        let (manager, _, _) = manager();
        let session = manager.create_session(identity()).await.unwrap();
        manager.revoke_session(&session.token).await.unwrap();

        let (a, b) = tokio::join!(
            manager.validate_session(&session.token),
            manager.validate_session(&session.token)
        );
        assert!(matches!(a, Err(SessionError::Revoked)));
        assert!(matches!(b, Err(SessionError::Revoked)));
    }

    #[tokio::test]
    async fn expired_wins_over_revoked() {
        let (manager, clock, _) = manager();
        let session = manager.create_session(identity()).await.unwrap();
        manager.revoke_session(&session.token).await.unwrap();
        clock.advance_secs(8 * 24 * 3600);
        assert!(matches!(
            manager.validate_session(&session.token).await,
            Err(SessionError::Expired)
        ));
    }

    #[tokio::test]
    async fn forged_and_foreign_tokens_are_malformed() {
        let (manager, clock, store) = manager();
        let session = manager.create_session(identity()).await.unwrap();

        for bad in ["", "abc", "a.b.c"] {
            assert!(matches!(
                manager.validate_session(bad).await,
                Err(SessionError::Malformed)
            ));
        }

        let mut tampered = session.token.clone();
        tampered.pop();
        tampered.push(if session.token.ends_with('A') { 'B' } else { 'A' });
        assert!(matches!(
            manager.validate_session(&tampered).await,
            Err(SessionError::Malformed)
        ));

        let other = SessionManager::new(
            config(b"ffffffffffffffffffffffffffffffff"),
            store,
            Arc::new(clock),
        );
        let foreign = other.create_session(identity()).await.unwrap();
        assert!(matches!(
            manager.validate_session(&foreign.token).await,
            Err(SessionError::Malformed)
        ));
    }

    #[tokio::test]
    async fn refresh_reissues_and_revokes_old_token() {
        let (manager, clock, _) = manager();
        let old = manager.create_session(identity()).await.unwrap();
        clock.advance_secs(3600);

        let new = manager.refresh_session(&old.token).await.unwrap();
        assert_eq!(new.address, old.address);
        assert!(new.expires_at > old.expires_at);
        assert!(matches!(
            manager.validate_session(&old.token).await,
            Err(SessionError::Revoked)
        ));
        assert!(manager.validate_session(&new.token).await.is_ok());

        assert!(matches!(
            manager.refresh_session(&old.token).await,
            Err(SessionError::Revoked)
        ));
    }

    #[tokio::test]
    async fn describe_reports_record_fields() {
        let (manager, _, _) = manager();
        let session = manager.create_session(identity()).await.unwrap();
        let info = manager.describe_session(&session.token).await.unwrap();
        assert_eq!(info.address.as_str(), ADDRESS);
        assert_eq!(info.issued_at, session.issued_at);
        assert_eq!(info.expires_at, session.expires_at);
        assert_eq!(info.token_id.len(), 64);
    }

    #[test]
    fn config_debug_redacts_key() {
        let rendered = format!("{:?}", config(b"super-secret-key-material-0123456"));
        assert!(!rendered.contains("super-secret"));
    }
}
