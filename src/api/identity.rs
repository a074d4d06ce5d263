// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::json_body;
use crate::{
    auth::Auth,
    error::ApiError,
    models::{IdentityVerifyRequest, IdentityVerifyResponse},
    state::AppState,
};

/// Verify an identity proof bound to the signed-in wallet.
#[utoipa::path(
    post,
    path = "/v1/identity/verify",
    tag = "Identity",
    request_body = IdentityVerifyRequest,
    responses(
        (status = 200, description = "Oracle verdict", body = IdentityVerifyResponse),
        (status = 400, description = "Malformed proof"),
        (status = 401, description = "Session is not live"),
        (status = 503, description = "Identity oracle unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn verify_identity(
    State(state): State<AppState>,
    Auth(wallet): Auth,
    body: Result<Json<IdentityVerifyRequest>, JsonRejection>,
) -> Result<Json<IdentityVerifyResponse>, ApiError> {
    let request = json_body(body)?;
    let action = request
        .action
        .unwrap_or_else(|| state.identity.default_action().to_string());
    let verified = state
        .identity
        .verify(&wallet.address, &request.proof, Some(&action))
        .await?;
    Ok(Json(IdentityVerifyResponse { verified, action }))
}
