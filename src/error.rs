// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error mapping.
//!
//! Domain errors keep their distinct kinds all the way to the response: the
//! `error_code` field carries the kind, the status groups it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{NonceError, SessionError, VerifyError};
use crate::claim::ClaimError;
use crate::identity::IdentityError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn internal(code: &'static str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            code,
            "internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                error_code = self.code,
                "Request failed"
            );
        }
        let body = Json(ErrorBody {
            success: false,
            error: self.message,
            error_code: self.code,
        });
        (self.status, body).into_response()
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        let code = err.error_code();
        match err {
            VerifyError::MalformedMessage(_) => {
                Self::new(StatusCode::BAD_REQUEST, code, err.to_string())
            }
            VerifyError::Nonce(inner) => {
                tracing::error!(error = %inner, "Nonce store failure during verification");
                Self::internal(code)
            }
            _ => Self::new(StatusCode::UNAUTHORIZED, code, err.to_string()),
        }
    }
}

impl From<NonceError> for ApiError {
    fn from(err: NonceError) -> Self {
        tracing::error!(error = %err, "Nonce issuance failed");
        match err {
            NonceError::RandomnessUnavailable => Self::internal("randomness_unavailable"),
            NonceError::Store(_) => Self::internal("store_error"),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let code = err.error_code();
        match err {
            SessionError::Malformed | SessionError::Expired | SessionError::Revoked => {
                Self::new(StatusCode::UNAUTHORIZED, code, err.to_string())
            }
            other => {
                tracing::error!(error = %other, "Session operation failed");
                Self::internal(code)
            }
        }
    }
}

impl From<ClaimError> for ApiError {
    fn from(err: ClaimError) -> Self {
        let status = match &err {
            ClaimError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            ClaimError::AmountOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ClaimError::InvalidTransactionHash => StatusCode::BAD_REQUEST,
            ClaimError::LedgerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ClaimError::LedgerRejected(_) => StatusCode::CONFLICT,
        };
        Self::new(status, err.error_code(), err.to_string())
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Oracle(inner) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "identity_oracle_unavailable",
                inner.to_string(),
            ),
            IdentityError::Store(inner) => {
                tracing::error!(error = %inner, "Identity record store failed");
                Self::internal("store_error")
            }
        }
    }
}
