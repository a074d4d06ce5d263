// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the typed [`ServiceConfig`]
//! loaded from them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SESSION_SIGNING_KEY` | HMAC key for session tokens (≥ 32 bytes) | Required |
//! | `SESSION_ISSUER` | `iss` claim of session tokens | `relational-claim-server` |
//! | `SESSION_TTL_SECS` | Session lifetime | `604800` (7 days) |
//! | `NONCE_TTL_SECS` | Sign-in nonce lifetime | `300` |
//! | `AUTH_DOMAIN` | Expected `domain` of sign-in messages | `localhost:3000` |
//! | `AUTH_ORIGIN` | Expected origin of the message `uri` | `http://localhost:3000` |
//! | `CHAIN_ID` | Expected chain id of sign-in messages | `480` |
//! | `RPC_URL` | JSON-RPC endpoint of the ledger chain | World Chain public RPC |
//! | `CLAIM_CONTRACT_ADDRESS` | Claim contract | deployed claim contract |
//! | `TOKEN_CONTRACT_ADDRESS` | Reward token contract | deployed token contract |
//! | `LEDGER_TIMEOUT_MS` | Bound on a single ledger call | `5000` |
//! | `CLAIM_CACHE_CAPACITY` | Addresses kept in the claim cache | `10000` |
//! | `IDENTITY_APP_ID` | Identity-provider app id | Optional |
//! | `IDENTITY_VERIFY_URL` | Proof verification endpoint | derived from `IDENTITY_APP_ID` |
//! | `IDENTITY_ACTION` | Default proof action | `claim-daily-vldx` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | Optional |
//! | `SWEEP_INTERVAL_SECS` | Expired-record sweep interval | `60` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;

use crate::auth::nonce::DEFAULT_NONCE_TTL;
use crate::auth::session::{DEFAULT_SESSION_TTL, MIN_SIGNING_KEY_LEN};
use crate::auth::{SessionConfig, VerifierConfig};
use crate::blockchain::{
    ContractAddresses, DEFAULT_CLAIM_CONTRACT, DEFAULT_TOKEN_CONTRACT, WORLD_CHAIN,
};
use crate::claim::{ClaimConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_LEDGER_TIMEOUT};
use crate::identity::DEFAULT_IDENTITY_ACTION;
use crate::store_sweeper::DEFAULT_SWEEP_INTERVAL;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// HMAC-SHA256 key used to sign session tokens.
///
/// Rotating it invalidates every outstanding session.
pub const SESSION_SIGNING_KEY_ENV: &str = "SESSION_SIGNING_KEY";
pub const SESSION_ISSUER_ENV: &str = "SESSION_ISSUER";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const NONCE_TTL_ENV: &str = "NONCE_TTL_SECS";

/// Host (and optional port) the front end is served from.
///
/// Sign-in messages carrying another domain are rejected.
pub const AUTH_DOMAIN_ENV: &str = "AUTH_DOMAIN";
pub const AUTH_ORIGIN_ENV: &str = "AUTH_ORIGIN";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";

pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CLAIM_CONTRACT_ENV: &str = "CLAIM_CONTRACT_ADDRESS";
pub const TOKEN_CONTRACT_ENV: &str = "TOKEN_CONTRACT_ADDRESS";
pub const LEDGER_TIMEOUT_ENV: &str = "LEDGER_TIMEOUT_MS";
pub const CLAIM_CACHE_CAPACITY_ENV: &str = "CLAIM_CACHE_CAPACITY";

pub const IDENTITY_APP_ID_ENV: &str = "IDENTITY_APP_ID";

/// Overrides the verification endpoint derived from [`IDENTITY_APP_ID_ENV`].
pub const IDENTITY_VERIFY_URL_ENV: &str = "IDENTITY_VERIFY_URL";
pub const IDENTITY_ACTION_ENV: &str = "IDENTITY_ACTION";

pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const SWEEP_INTERVAL_ENV: &str = "SWEEP_INTERVAL_SECS";

/// Environment variable for log output format.
///
/// # Values
/// - `json` - Structured JSON logs
/// - `pretty` - Human-readable colored logs (default)
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ISSUER: &str = "relational-claim-server";
const DEFAULT_AUTH_DOMAIN: &str = "localhost:3000";
const DEFAULT_AUTH_ORIGIN: &str = "http://localhost:3000";
const IDENTITY_VERIFY_BASE_URL: &str = "https://developer.worldcoin.org/api/v2/verify";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Read [`LOG_FORMAT_ENV`]; logging starts before the rest of the config loads.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Everything needed to assemble the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub verifier: VerifierConfig,
    pub nonce_ttl: Duration,
    pub session: SessionConfig,
    pub rpc_url: String,
    pub contracts: ContractAddresses,
    pub claim: ClaimConfig,
    /// `None` leaves identity verification unconfigured.
    pub identity_verify_url: Option<String>,
    pub identity_action: String,
    pub tls: Option<TlsPaths>,
    pub sweep_interval: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let signing_key = var(SESSION_SIGNING_KEY_ENV)
            .ok_or(ConfigError::Missing(SESSION_SIGNING_KEY_ENV))?
            .into_bytes();
        if signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::Invalid {
                var: SESSION_SIGNING_KEY_ENV,
                reason: format!("must be at least {MIN_SIGNING_KEY_LEN} bytes"),
            });
        }

        let session = SessionConfig {
            signing_key,
            issuer: var(SESSION_ISSUER_ENV).unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
            ttl: parse_or(var(SESSION_TTL_ENV), SESSION_TTL_ENV, DEFAULT_SESSION_TTL, |s| {
                s.parse().map(Duration::from_secs)
            })?,
        };

        let verifier = VerifierConfig {
            domain: var(AUTH_DOMAIN_ENV).unwrap_or_else(|| DEFAULT_AUTH_DOMAIN.to_string()),
            origin: parse_or(
                var(AUTH_ORIGIN_ENV),
                AUTH_ORIGIN_ENV,
                DEFAULT_AUTH_ORIGIN.to_string(),
                |s| url::Url::parse(s).map(|u| u.origin().ascii_serialization()),
            )?,
            chain_id: parse_or(var(CHAIN_ID_ENV), CHAIN_ID_ENV, WORLD_CHAIN.chain_id, |s| {
                s.parse()
            })?,
        };

        let contracts = ContractAddresses {
            claim: parse_address(
                var(CLAIM_CONTRACT_ENV),
                CLAIM_CONTRACT_ENV,
                DEFAULT_CLAIM_CONTRACT,
            )?,
            token: parse_address(
                var(TOKEN_CONTRACT_ENV),
                TOKEN_CONTRACT_ENV,
                DEFAULT_TOKEN_CONTRACT,
            )?,
        };

        let claim = ClaimConfig {
            ledger_timeout: parse_or(
                var(LEDGER_TIMEOUT_ENV),
                LEDGER_TIMEOUT_ENV,
                DEFAULT_LEDGER_TIMEOUT,
                |s| s.parse().map(Duration::from_millis),
            )?,
            cache_capacity: parse_or(
                var(CLAIM_CACHE_CAPACITY_ENV),
                CLAIM_CACHE_CAPACITY_ENV,
                DEFAULT_CACHE_CAPACITY,
                |s| s.parse(),
            )?,
        };

        let identity_verify_url = var(IDENTITY_VERIFY_URL_ENV).or_else(|| {
            var(IDENTITY_APP_ID_ENV).map(|app_id| format!("{IDENTITY_VERIFY_BASE_URL}/{app_id}"))
        });

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        Ok(Self {
            host: var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(var(PORT_ENV), PORT_ENV, DEFAULT_PORT, |s| s.parse())?,
            verifier,
            nonce_ttl: parse_or(var(NONCE_TTL_ENV), NONCE_TTL_ENV, DEFAULT_NONCE_TTL, |s| {
                s.parse().map(Duration::from_secs)
            })?,
            session,
            rpc_url: parse_or(
                var(RPC_URL_ENV),
                RPC_URL_ENV,
                WORLD_CHAIN.rpc_url.to_string(),
                |s| url::Url::parse(s).map(|_| s.to_string()),
            )?,
            contracts,
            claim,
            identity_verify_url,
            identity_action: var(IDENTITY_ACTION_ENV)
                .unwrap_or_else(|| DEFAULT_IDENTITY_ACTION.to_string()),
            tls,
            sweep_interval: parse_or(
                var(SWEEP_INTERVAL_ENV),
                SWEEP_INTERVAL_ENV,
                DEFAULT_SWEEP_INTERVAL,
                |s| s.parse().map(Duration::from_secs),
            )?,
        })
    }
}

fn parse_or<T, E: std::fmt::Display>(
    raw: Option<String>,
    var: &'static str,
    default: T,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => parse(value.trim()).map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_address(
    raw: Option<String>,
    var: &'static str,
    default: &str,
) -> Result<Address, ConfigError> {
    let value = raw.unwrap_or_else(|| default.to_string());
    Address::from_str(value.trim()).map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}
