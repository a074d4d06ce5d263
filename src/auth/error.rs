// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::session::SessionError;

/// Rejection produced by the [`Auth`](super::Auth) extractor.
///
/// Every session failure is a 401 at the HTTP boundary; the `error_code`
/// still tells clients whether to re-authenticate or retry later.
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// The bearer credential did not validate
    Session(SessionError),
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    error: String,
    error_code: String,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::Session(e) => e.error_code(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Session(
                SessionError::Malformed | SessionError::Expired | SessionError::Revoked,
            ) => StatusCode::UNAUTHORIZED,
            AuthError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(value: SessionError) -> Self {
        AuthError::Session(value)
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::Session(SessionError::Malformed) => write!(f, "Session token is invalid"),
            AuthError::Session(SessionError::Expired) => write!(f, "Session has expired"),
            AuthError::Session(SessionError::Revoked) => write!(f, "Session has been revoked"),
            AuthError::Session(_) => write!(f, "Internal authentication error"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            if let AuthError::Session(inner) = &self {
                tracing::error!(error = %inner, "Session backend failure");
            }
        }
        let body = Json(AuthErrorBody {
            success: false,
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
