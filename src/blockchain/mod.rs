// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for the claim contract on World Chain.
//!
//! This module provides:
//! - The [`ClaimLedger`] trait the claim engine consumes
//! - [`AlloyClaimLedger`], backed by JSON-RPC and the deployed contracts
//! - [`InMemoryLedger`], the same contract rules held in process

pub mod client;
pub mod contracts;
pub mod ledger;
pub mod memory;
pub mod types;

pub use client::{AlloyClaimLedger, LedgerClientError};
pub use ledger::{amount_to_wei, format_balance, ClaimLedger, LedgerError};
pub use memory::InMemoryLedger;
pub use types::*;
