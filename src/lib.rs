// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Claim - Wallet Sign-In & Tiered Daily Claims
//!
//! Authenticates wallets by EIP-4361 challenge signing and governs a daily,
//! phase-tiered token claim against the on-chain claim contract.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Nonces, signature verification, sessions
//! - `claim` - Phases, cooldowns, eligibility and claim reconciliation
//! - `blockchain` - Claim ledger over World Chain JSON-RPC
//! - `identity` - Proof-of-personhood oracle
//! - `store` - TTL key/value store for nonce, session and identity records

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod claim;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod state;
pub mod store;
pub mod store_sweeper;
