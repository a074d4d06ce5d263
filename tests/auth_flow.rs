// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end sign-in and claim flow through the HTTP router.

use std::sync::Arc;

use alloy::signers::{local::PrivateKeySigner, SignerSync};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{SecondsFormat, TimeDelta};
use serde_json::{json, Value};
use tower::ServiceExt;

use relational_claim_server::{
    api::router,
    auth::{ChallengeMessage, SignInMessage},
    blockchain::InMemoryLedger,
    clock::{Clock, ManualClock},
    config::ServiceConfig,
    identity::UnconfiguredOracle,
    models::WalletAddress,
    state::AppState,
    store::InMemoryKvStore,
};

const ALICE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const BOB_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

struct TestApp {
    app: Router,
    clock: ManualClock,
    ledger: Arc<InMemoryLedger>,
}

fn setup() -> TestApp {
    let config = ServiceConfig::from_lookup(|name| match name {
        "SESSION_SIGNING_KEY" => Some("integration-signing-key-0123456789".to_string()),
        "AUTH_DOMAIN" => Some("claim.example.org".to_string()),
        "AUTH_ORIGIN" => Some("https://claim.example.org".to_string()),
        _ => None,
    })
    .unwrap();

    let clock = ManualClock::at_epoch();
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let store = Arc::new(InMemoryKvStore::new(shared.clone()));
    let ledger = Arc::new(InMemoryLedger::new(shared.clone()));
    ledger.set_base_participants(100);

    let state = AppState::new(
        &config,
        store,
        shared,
        ledger.clone(),
        Arc::new(UnconfiguredOracle),
    );
    TestApp {
        app: router(state),
        clock,
        ledger,
    }
}

async fn call(
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
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn signed_request(t: &TestApp, key: &str, nonce: &str) -> (WalletAddress, Value) {
    let signer: PrivateKeySigner = key.parse().unwrap();
    let address = WalletAddress::from(signer.address());
    let now = t.clock.now();
    let fields = SignInMessage {
        domain: "claim.example.org".to_string(),
        address: address.checksummed(),
        statement: "Sign in to claim your daily tokens".to_string(),
        uri: "https://claim.example.org/login".to_string(),
        version: "1".to_string(),
        chain_id: 480,
        nonce: nonce.to_string(),
        issued_at: Some(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
        expiration_time: (now + TimeDelta::minutes(5)).to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    let message = ChallengeMessage::from_fields(fields.clone()).unwrap();
    let signature = signer.sign_message_sync(message.text().as_bytes()).unwrap();

    let body = json!({
        "claimed_address": address.as_str(),
        "signature": alloy::hex::encode_prefixed(signature.as_bytes()),
        "nonce": nonce,
        "message": fields,
    });
    (address, body)
}

async fn sign_in(t: &TestApp, key: &str) -> (WalletAddress, String) {
    let (status, nonce) = call(&t.app, Method::GET, "/v1/auth/nonce", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let nonce = nonce["nonce"].as_str().unwrap().to_string();

    let (address, body) = signed_request(t, key, &nonce);
    let (status, session) = call(&t.app, Method::POST, "/v1/auth/verify", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{session}");
    (address, session["session_token"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn sign_in_claim_and_cooldown() {
    let t = setup();
    let (address, token) = sign_in(&t, ALICE_KEY).await;
    let token = Some(token.as_str());

    let (status, eligibility) =
        call(&t.app, Method::GET, "/v1/claim/eligibility", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(eligibility["can_claim"], true);
    assert_eq!(eligibility["phase"], 1);
    assert!(eligibility["amount"].as_u64().unwrap() <= 50);

    let (status, prepared) =
        call(&t.app, Method::POST, "/v1/claim", token, Some(json!({ "amount": 50 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        prepared["transaction"]["to"],
        "0xfa087564057a805e47c379935dcd2889c903ec3a"
    );

    let tx_hash = t.ledger.execute_claim(&address, 50);
    let (status, confirmed) = call(
        &t.app,
        Method::POST,
        "/v1/claim/confirm",
        token,
        Some(json!({ "tx_hash": tx_hash, "amount": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    t.clock.advance_secs(3600);
    let (_, eligibility) = call(&t.app, Method::GET, "/v1/claim/eligibility", token, None).await;
    assert_eq!(eligibility["can_claim"], false);
    assert_eq!(eligibility["cooldown_remaining"], 82_800);
    assert_eq!(eligibility["cooldown_display"], "23h 0m 0s");
    assert_eq!(eligibility["balance"], "50");

    t.clock.advance_secs(82_800);
    let (_, eligibility) = call(&t.app, Method::GET, "/v1/claim/eligibility", token, None).await;
    assert_eq!(eligibility["can_claim"], true);
}

#[tokio::test]
async fn claim_cannot_be_confirmed_with_another_wallets_transaction() {
    let t = setup();
    let (alice, _) = sign_in(&t, ALICE_KEY).await;
    let (_, bob_token) = sign_in(&t, BOB_KEY).await;

    let alice_tx = t.ledger.execute_claim(&alice, 10);
    let (status, body) = call(
        &t.app,
        Method::POST,
        "/v1/claim/confirm",
        Some(&bob_token),
        Some(json!({ "tx_hash": alice_tx, "amount": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "ledger_rejected");
}

#[tokio::test]
async fn signature_from_another_key_is_rejected() {
    let t = setup();
    let (_, nonce) = call(&t.app, Method::GET, "/v1/auth/nonce", None, None).await;
    let nonce = nonce["nonce"].as_str().unwrap();

    let (_, mut body) = signed_request(&t, BOB_KEY, nonce);
    let (alice, _) = signed_request(&t, ALICE_KEY, nonce);
    body["claimed_address"] = json!(alice.as_str());

    let (status, error) = call(&t.app, Method::POST, "/v1/auth/verify", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error_code"], "address_mismatch");
}

#[tokio::test]
async fn expired_nonce_and_session_lifecycle() {
    let t = setup();

    let (_, nonce) = call(&t.app, Method::GET, "/v1/auth/nonce", None, None).await;
    let nonce = nonce["nonce"].as_str().unwrap().to_string();
    t.clock.advance_secs(301);
    let (_, body) = signed_request(&t, ALICE_KEY, &nonce);
    let (status, error) = call(&t.app, Method::POST, "/v1/auth/verify", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error_code"], "nonce_expired");

    let (_, token) = sign_in(&t, ALICE_KEY).await;
    t.clock.advance_secs(7 * 24 * 60 * 60);
    let (status, error) = call(&t.app, Method::GET, "/v1/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error_code"], "session_expired");

    // Logging out of an expired session still succeeds.
    let (status, _) = call(&t.app, Method::POST, "/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn identity_verification_without_oracle_is_unavailable() {
    let t = setup();
    let (_, token) = sign_in(&t, ALICE_KEY).await;
    let (status, body) = call(
        &t.app,
        Method::POST,
        "/v1/identity/verify",
        Some(&token),
        Some(json!({
            "proof": "0x01",
            "nullifier_hash": "0x02",
            "merkle_root": "0x03",
            "verification_level": "orb"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_code"], "identity_oracle_unavailable");
}
