// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Adoption phases and cooldown arithmetic.
//!
//! | Participants        | Phase                         | Max claim          |
//! |---------------------|-------------------------------|--------------------|
//! | `< 5,000`           | 1                             | 50                 |
//! | `5,000 ..< 10,000`  | 2                             | 5                  |
//! | `>= 10,000`         | `3 + k`, `k = (p-10,000)/5,000` | `max(1, 5 - k)`  |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Seconds between two claims by the same address.
pub const CLAIM_COOLDOWN_SECS: i64 = 86_400;

/// Smallest claimable amount in whole tokens.
pub const MIN_CLAIM: u64 = 1;

const PHASE_ONE_LIMIT: u64 = 5_000;
const PHASE_TWO_LIMIT: u64 = 10_000;
const MATURE_PHASE_STEP: u64 = 5_000;

const PHASE_ONE_MAX: u64 = 50;
const PHASE_TWO_MAX: u64 = 5;

/// Phase derived from the global participant count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhaseInfo {
    pub phase: u64,
    /// Tier maximum claim in whole tokens.
    pub max_claim: u64,
    pub description: String,
}

/// Map a participant count to its phase. Monotonically non-increasing in `max_claim`.
pub fn phase_info(participants: u64) -> PhaseInfo {
    if participants < PHASE_ONE_LIMIT {
        PhaseInfo {
            phase: 1,
            max_claim: PHASE_ONE_MAX,
            description: "Early Phase - Maximum rewards!".to_string(),
        }
    } else if participants < PHASE_TWO_LIMIT {
        PhaseInfo {
            phase: 2,
            max_claim: PHASE_TWO_MAX,
            description: "Growth Phase - Good rewards".to_string(),
        }
    } else {
        let extra = (participants - PHASE_TWO_LIMIT) / MATURE_PHASE_STEP;
        PhaseInfo {
            phase: 3 + extra,
            max_claim: PHASE_TWO_MAX.saturating_sub(extra).max(MIN_CLAIM),
            description: "Mature Phase - Sustainable rewards".to_string(),
        }
    }
}

/// Seconds until the next claim is allowed; zero when never claimed.
pub fn cooldown_remaining(last_claim: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
    match last_claim {
        None => 0,
        Some(last) => {
            let elapsed = (now - last).num_seconds();
            u64::try_from(CLAIM_COOLDOWN_SECS.saturating_sub(elapsed)).unwrap_or(0)
        }
    }
}

/// `"{h}h {m}m {s}s"`.
pub fn format_countdown(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{h}h {m}m {s}s")
}
