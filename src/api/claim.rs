// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use super::json_body;
use crate::{
    auth::Auth,
    claim::{ClaimStatus, Eligibility, PhaseSnapshot},
    error::ApiError,
    models::{ClaimRequest, ClaimResponse, ConfirmClaimRequest},
    state::AppState,
};

/// Claim eligibility of the signed-in wallet.
#[utoipa::path(
    get,
    path = "/v1/claim/eligibility",
    tag = "Claim",
    responses(
        (status = 200, description = "Current eligibility", body = Eligibility),
        (status = 401, description = "Session is not live"),
        (status = 503, description = "Ledger unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn eligibility(
    State(state): State<AppState>,
    Auth(wallet): Auth,
) -> Result<Json<Eligibility>, ApiError> {
    let eligibility = state.claims.get_eligibility(&wallet.address).await?;
    Ok(Json(eligibility))
}

/// Current claim phase.
#[utoipa::path(
    get,
    path = "/v1/claim/phase",
    tag = "Claim",
    responses(
        (status = 200, description = "Phase for the participant count", body = PhaseSnapshot),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn phase(State(state): State<AppState>) -> Result<Json<PhaseSnapshot>, ApiError> {
    Ok(Json(state.claims.current_phase().await?))
}

/// Validate a claim and return the contract call for the wallet to send.
#[utoipa::path(
    post,
    path = "/v1/claim",
    tag = "Claim",
    request_body = ClaimRequest,
    responses(
        (status = 200, description = "Claim passed the contract pre-flight", body = ClaimResponse),
        (status = 401, description = "Session is not live"),
        (status = 409, description = "Ledger rejected the claim"),
        (status = 422, description = "Amount outside the current phase range"),
        (status = 429, description = "Cooldown active"),
        (status = 503, description = "Ledger unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn claim(
    State(state): State<AppState>,
    Auth(wallet): Auth,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let request = json_body(body)?;
    let transaction = state
        .claims
        .prepare_claim(&wallet.address, request.amount)
        .await?;
    Ok(Json(ClaimResponse {
        success: true,
        amount: request.amount,
        transaction,
    }))
}

/// Reconcile a claim transaction sent by the signed-in wallet.
///
/// Returns `202 Accepted` while the transaction is not yet mined.
#[utoipa::path(
    post,
    path = "/v1/claim/confirm",
    tag = "Claim",
    request_body = ConfirmClaimRequest,
    responses(
        (status = 200, description = "Claim confirmed on the ledger", body = ClaimStatus),
        (status = 202, description = "Transaction still pending", body = ClaimStatus),
        (status = 400, description = "Malformed transaction hash"),
        (status = 401, description = "Session is not live"),
        (status = 409, description = "Transaction is not a matching claim by this address"),
        (status = 503, description = "Ledger unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn confirm(
    State(state): State<AppState>,
    Auth(wallet): Auth,
    body: Result<Json<ConfirmClaimRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ClaimStatus>), ApiError> {
    let request = json_body(body)?;
    let status = state
        .claims
        .record_claim(&wallet.address, &request.tx_hash, request.amount)
        .await?;
    let code = match status {
        ClaimStatus::Confirmed { .. } => StatusCode::OK,
        ClaimStatus::Pending => StatusCode::ACCEPTED,
    };
    Ok((code, Json(status)))
}
