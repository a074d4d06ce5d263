// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::JsonRejection,
    http::HeaderName,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::SignInMessage,
    blockchain::ClaimCall,
    claim::{ClaimStatus, Eligibility, PhaseSnapshot},
    error::ApiError,
    identity::IdentityProof,
    models::{
        ClaimRequest, ClaimResponse, ConfirmClaimRequest, IdentityVerifyRequest,
        IdentityVerifyResponse, LogoutResponse, NonceResponse, SessionResponse, VerifyRequest,
        VerifyResponse, WalletAddress,
    },
    state::AppState,
};

pub mod auth;
pub mod claim;
pub mod health;
pub mod identity;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/nonce", get(auth::issue_nonce))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/session", get(auth::session))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/claim", post(claim::claim))
        .route("/claim/eligibility", get(claim::eligibility))
        .route("/claim/phase", get(claim::phase))
        .route("/claim/confirm", post(claim::confirm))
        .route("/identity/verify", post(identity::verify_identity))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Unwrap a JSON body, reporting malformed input as `400 bad_request`.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::issue_nonce,
        auth::verify,
        auth::session,
        auth::refresh,
        auth::logout,
        claim::eligibility,
        claim::phase,
        claim::claim,
        claim::confirm,
        identity::verify_identity,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            WalletAddress,
            SignInMessage,
            NonceResponse,
            VerifyRequest,
            VerifyResponse,
            SessionResponse,
            LogoutResponse,
            Eligibility,
            PhaseSnapshot,
            ClaimRequest,
            ClaimResponse,
            ClaimCall,
            ConfirmClaimRequest,
            ClaimStatus,
            IdentityProof,
            IdentityVerifyRequest,
            IdentityVerifyResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Wallet sign-in and sessions"),
        (name = "Claim", description = "Daily claim eligibility and execution"),
        (name = "Identity", description = "Proof-of-personhood verification"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    pub(crate) async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}
