// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::json_body;
use crate::{
    auth::{Auth, Bearer, SessionToken},
    error::ApiError,
    models::{LogoutResponse, NonceResponse, SessionResponse, VerifyRequest, VerifyResponse},
    state::AppState,
};

impl From<SessionToken> for VerifyResponse {
    fn from(session: SessionToken) -> Self {
        Self {
            success: true,
            session_token: session.token,
            address: session.address,
            expires_at: session.expires_at,
        }
    }
}

/// Issue a single-use sign-in nonce.
#[utoipa::path(
    get,
    path = "/v1/auth/nonce",
    tag = "Auth",
    responses(
        (status = 200, description = "Fresh nonce", body = NonceResponse),
        (status = 500, description = "Nonce could not be issued")
    )
)]
pub async fn issue_nonce(State(state): State<AppState>) -> Result<Json<NonceResponse>, ApiError> {
    let record = state.nonces.issue_nonce().await?;
    Ok(Json(NonceResponse {
        nonce: record.value,
        issued_at: record.issued_at,
        expires_at: record.expires_at,
    }))
}

/// Verify a signed sign-in message and open a session.
#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    tag = "Auth",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Signature verified, session issued", body = VerifyResponse),
        (status = 400, description = "Malformed request or message"),
        (status = 401, description = "Nonce, signature, address, origin or chain check failed")
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let request = json_body(body)?;
    let identity = state
        .verifier
        .verify(
            &request.claimed_address,
            &request.message,
            &request.signature,
            &request.nonce,
        )
        .await?;
    let session = state.sessions.create_session(identity).await?;
    Ok(Json(session.into()))
}

/// Describe the caller's session.
#[utoipa::path(
    get,
    path = "/v1/auth/session",
    tag = "Auth",
    responses(
        (status = 200, description = "Live session", body = SessionResponse),
        (status = 401, description = "Missing, malformed, expired or revoked session")
    ),
    security(("bearer_auth" = []))
)]
pub async fn session(
    State(state): State<AppState>,
    Auth(wallet): Auth,
) -> Result<Json<SessionResponse>, ApiError> {
    let identity_verified = state.identity.is_verified(&wallet.address).await?;
    Ok(Json(SessionResponse {
        address: wallet.address,
        issued_at: wallet.issued_at,
        expires_at: wallet.expires_at,
        identity_verified,
    }))
}

/// Exchange a live session for a new one; the old token stops working.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "New session issued", body = VerifyResponse),
        (status = 401, description = "Session is not live")
    ),
    security(("bearer_auth" = []))
)]
pub async fn refresh(
    State(state): State<AppState>,
    Auth(wallet): Auth,
) -> Result<Json<VerifyResponse>, ApiError> {
    let session = state.sessions.refresh_session(&wallet.token).await?;
    Ok(Json(session.into()))
}

/// Revoke the caller's session.
///
/// Idempotent: an expired, revoked or unknown token is also a success.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Session revoked", body = LogoutResponse),
        (status = 401, description = "Missing or malformed authorization header")
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    Bearer(token): Bearer,
) -> Result<Json<LogoutResponse>, ApiError> {
    state.sessions.revoke_session(&token).await?;
    Ok(Json(LogoutResponse { success: true }))
}
