// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated wallets.
//!
//! Use the `Auth` extractor in handlers to require a live session:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(wallet): Auth) -> impl IntoResponse {
//!     // wallet.address is the session's subject
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Utc};

use super::AuthError;
use crate::models::WalletAddress;
use crate::state::AppState;

/// The subject of a validated bearer session.
#[derive(Debug, Clone)]
pub struct AuthenticatedWallet {
    pub address: WalletAddress,
    /// The raw bearer credential, needed for refresh.
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Extractor for authenticated wallets.
///
/// Reads `Authorization: Bearer <token>` and validates it against the
/// session store on every request, so revocation applies immediately.
pub struct Auth(pub AuthenticatedWallet);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let info = state.sessions.describe_session(token).await?;

        Ok(Auth(AuthenticatedWallet {
            address: info.address,
            token: token.to_string(),
            issued_at: info.issued_at,
            expires_at: info.expires_at,
        }))
    }
}

/// The raw bearer credential, without validating the session behind it.
///
/// Only rejects a missing or malformed `Authorization` header.
pub struct Bearer(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Bearer {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(parts).map(|token| Bearer(token.to_string()))
    }
}

/// Extract the bearer credential from the request headers.
pub(crate) fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}
