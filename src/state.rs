// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{NonceIssuer, SessionManager, SignatureVerifier};
use crate::blockchain::ClaimLedger;
use crate::claim::ClaimEngine;
use crate::clock::Clock;
use crate::config::ServiceConfig;
use crate::identity::{IdentityOracle, IdentityService};
use crate::store::KvStore;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub nonces: Arc<NonceIssuer>,
    pub verifier: Arc<SignatureVerifier>,
    pub sessions: Arc<SessionManager>,
    pub claims: Arc<ClaimEngine>,
    pub identity: Arc<IdentityService>,
    pub ledger: Arc<dyn ClaimLedger>,
}

impl AppState {
    pub fn new(
        config: &ServiceConfig,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        ledger: Arc<dyn ClaimLedger>,
        oracle: Arc<dyn IdentityOracle>,
    ) -> Self {
        let nonces = Arc::new(NonceIssuer::new(
            store.clone(),
            clock.clone(),
            config.nonce_ttl,
        ));
        let verifier = Arc::new(SignatureVerifier::new(
            config.verifier.clone(),
            nonces.clone(),
            clock.clone(),
        ));
        let sessions = Arc::new(SessionManager::new(
            config.session.clone(),
            store.clone(),
            clock.clone(),
        ));
        let claims = Arc::new(ClaimEngine::new(
            ledger.clone(),
            clock.clone(),
            config.claim.clone(),
        ));
        let identity = Arc::new(IdentityService::new(
            oracle,
            store,
            clock,
            config.identity_action.clone(),
        ));

        Self {
            nonces,
            verifier,
            sessions,
            claims,
            identity,
            ledger,
        }
    }
}
