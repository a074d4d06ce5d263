// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tiered daily claims.
//!
//! - [`phase`]: participant-count phases and cooldown arithmetic
//! - [`cache`]: confirmed-claim cache
//! - [`engine`]: eligibility, claim preparation and reconciliation

pub mod cache;
pub mod engine;
pub mod phase;

pub use engine::{
    ClaimConfig, ClaimEngine, ClaimError, ClaimStatus, Eligibility, PhaseSnapshot,
    DEFAULT_CACHE_CAPACITY, DEFAULT_LEDGER_TIMEOUT,
};
pub use phase::{format_countdown, phase_info, PhaseInfo, CLAIM_COOLDOWN_SECS, MIN_CLAIM};
