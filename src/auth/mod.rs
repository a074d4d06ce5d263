// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet sign-in for the claim service (EIP-4361 challenge signing).
//!
//! ## Auth Flow
//!
//! 1. Client requests a nonce (`GET /v1/auth/nonce`)
//! 2. The wallet signs the canonical sign-in message embedding that nonce
//! 3. Server:
//!    - Rebuilds the message text from the submitted fields
//!    - Recovers the EIP-191 signer and compares it to the claimed address
//!    - Checks domain, origin and chain binding
//!    - Consumes the nonce atomically
//! 4. A session is issued for the verified address
//! 5. Client sends `Authorization: Bearer <session token>`
//!
//! ## Security
//!
//! - Nonces are single-use and expire after 5 minutes by default
//! - Sessions have an absolute lifetime and are revocable immediately
//! - Only [`SignatureVerifier`] can produce a [`VerifiedIdentity`]

pub mod error;
pub mod extractor;
pub mod message;
pub mod nonce;
pub mod session;
pub mod verifier;

pub use error::AuthError;
pub use extractor::{Auth, AuthenticatedWallet, Bearer};
pub use message::{ChallengeMessage, SignInMessage};
pub use nonce::{NonceError, NonceIssuer, NonceRecord};
pub use session::{SessionConfig, SessionError, SessionInfo, SessionManager, SessionToken};
pub use verifier::{SignatureVerifier, VerifiedIdentity, VerifierConfig, VerifyError};
