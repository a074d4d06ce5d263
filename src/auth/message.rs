// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EIP-4361 sign-in message construction.
//!
//! The wallet signs the exact text produced by [`ChallengeMessage::text`].
//! The server never trusts message text sent by the client; it rebuilds the
//! text from the submitted fields so a signature only verifies when every
//! field matches byte for byte.
//!
//! ```text
//! {domain} wants you to sign in with your Ethereum account:
//! {address}
//!
//! {statement}
//!
//! URI: {uri}
//! Version: {version}
//! Chain ID: {chain_id}
//! Nonce: {nonce}
//! Issued At: {issued_at}
//! Expiration Time: {expiration_time}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::models::WalletAddress;

/// The only message version defined by EIP-4361.
pub const MESSAGE_VERSION: &str = "1";

/// EIP-4361 nonces are alphanumeric and at least 8 characters.
const MIN_NONCE_LEN: usize = 8;

/// Fields of a sign-in message as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SignInMessage {
    /// Host requesting the signature (e.g. `app.example.com`).
    pub domain: String,
    /// Address the message claims to sign in.
    pub address: String,
    /// Human-readable statement shown by the wallet.
    pub statement: String,
    /// RFC 3986 URI of the requesting origin.
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    /// RFC 3339 timestamp, reproduced verbatim in the message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    /// RFC 3339 timestamp after which the signature is no longer accepted.
    pub expiration_time: String,
}

/// Reasons a set of message fields cannot form a valid EIP-4361 message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("domain must be a non-empty host without whitespace")]
    InvalidDomain,
    #[error("message address is not a valid wallet address")]
    InvalidAddress,
    #[error("statement must be a single line")]
    InvalidStatement,
    #[error("uri is not a valid absolute URI")]
    InvalidUri,
    #[error("unsupported message version `{0}`")]
    UnsupportedVersion(String),
    #[error("nonce must be at least {MIN_NONCE_LEN} alphanumeric characters")]
    InvalidNonce,
    #[error("{0} is not an RFC 3339 timestamp")]
    InvalidTimestamp(&'static str),
}

/// A validated, canonical sign-in message.
#[derive(Debug, Clone)]
pub struct ChallengeMessage {
    fields: SignInMessage,
    address: WalletAddress,
    uri: Url,
    expiration: DateTime<Utc>,
    text: String,
}

impl ChallengeMessage {
    /// Validate fields and build the canonical message text.
    pub fn from_fields(fields: SignInMessage) -> Result<Self, MessageError> {
        if fields.domain.is_empty() || fields.domain.chars().any(char::is_whitespace) {
            return Err(MessageError::InvalidDomain);
        }
        let address =
            WalletAddress::parse(&fields.address).map_err(|_| MessageError::InvalidAddress)?;
        if fields.statement.contains('\n') || fields.statement.contains('\r') {
            return Err(MessageError::InvalidStatement);
        }
        let uri = Url::parse(&fields.uri).map_err(|_| MessageError::InvalidUri)?;
        if fields.version != MESSAGE_VERSION {
            return Err(MessageError::UnsupportedVersion(fields.version.clone()));
        }
        if fields.nonce.len() < MIN_NONCE_LEN
            || !fields.nonce.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(MessageError::InvalidNonce);
        }
        if let Some(issued_at) = &fields.issued_at {
            parse_timestamp(issued_at, "issued_at")?;
        }
        let expiration = parse_timestamp(&fields.expiration_time, "expiration_time")?;

        let text = render(&fields, &address);
        Ok(Self {
            fields,
            address,
            uri,
            expiration,
            text,
        })
    }

    /// The exact bytes the wallet is expected to have signed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn address(&self) -> &WalletAddress {
        &self.address
    }

    pub fn domain(&self) -> &str {
        &self.fields.domain
    }

    /// ASCII serialization of the `uri` field's origin (scheme://host[:port]).
    pub fn origin(&self) -> String {
        self.uri.origin().ascii_serialization()
    }

    pub fn chain_id(&self) -> u64 {
        self.fields.chain_id
    }

    pub fn nonce(&self) -> &str {
        &self.fields.nonce
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }
}

fn parse_timestamp(raw: &str, field: &'static str) -> Result<DateTime<Utc>, MessageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| MessageError::InvalidTimestamp(field))
}

fn render(fields: &SignInMessage, address: &WalletAddress) -> String {
    let mut text = format!(
        "{domain} wants you to sign in with your Ethereum account:\n{address}\n\n",
        domain = fields.domain,
        address = address.checksummed(),
    );
    if !fields.statement.is_empty() {
        text.push_str(&fields.statement);
        text.push_str("\n\n");
    } else {
        text.push('\n');
    }
    text.push_str(&format!(
        "URI: {}\nVersion: {}\nChain ID: {}\nNonce: {}",
        fields.uri, fields.version, fields.chain_id, fields.nonce
    ));
    if let Some(issued_at) = &fields.issued_at {
        text.push_str(&format!("\nIssued At: {issued_at}"));
    }
    text.push_str(&format!("\nExpiration Time: {}", fields.expiration_time));
    text
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_fields() -> SignInMessage {
        SignInMessage {
            domain: "app.example.com".to_string(),
            address: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string(),
            statement: "Sign in to claim your daily tokens".to_string(),
            uri: "https://app.example.com".to_string(),
            version: "1".to_string(),
            chain_id: 480,
            nonce: "abcdef0123456789".to_string(),
            issued_at: Some("2026-01-01T00:00:00Z".to_string()),
            expiration_time: "2026-01-01T00:05:00Z".to_string(),
        }
    }

    #[test]
    fn renders_canonical_eip4361_text() {
        let message = ChallengeMessage::from_fields(sample_fields()).unwrap();
        let expected = "app.example.com wants you to sign in with your Ethereum account:\n\
0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\n\
\n\
Sign in to claim your daily tokens\n\
\n\
URI: https://app.example.com\n\
Version: 1\n\
Chain ID: 480\n\
Nonce: abcdef0123456789\n\
Issued At: 2026-01-01T00:00:00Z\n\
Expiration Time: 2026-01-01T00:05:00Z";
        assert_eq!(message.text(), expected);
    }

    #[test]
    fn empty_statement_omits_statement_block() {
        let mut fields = sample_fields();
        fields.statement = String::new();
        fields.issued_at = None;
        let message = ChallengeMessage::from_fields(fields).unwrap();
        assert!(message
            .text()
            .contains("account:\n0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\n\nURI: "));
        assert!(!message.text().contains("Issued At"));
    }

    #[test]
    fn origin_strips_path() {
        let mut fields = sample_fields();
        fields.uri = "https://app.example.com/login?next=claim".to_string();
        let message = ChallengeMessage::from_fields(fields).unwrap();
        assert_eq!(message.origin(), "https://app.example.com");
    }

    #[test]
    fn rejects_invalid_fields() {
        let mut f = sample_fields();
        f.domain = "bad domain".to_string();
        assert_eq!(
            ChallengeMessage::from_fields(f).unwrap_err(),
            MessageError::InvalidDomain
        );

        let mut f = sample_fields();
        f.statement = "line one\nline two".to_string();
        assert_eq!(
            ChallengeMessage::from_fields(f).unwrap_err(),
            MessageError::InvalidStatement
        );

        let mut f = sample_fields();
        f.version = "2".to_string();
        assert!(matches!(
            ChallengeMessage::from_fields(f).unwrap_err(),
            MessageError::UnsupportedVersion(_)
        ));

        let mut f = sample_fields();
        f.nonce = "short".to_string();
        assert_eq!(
            ChallengeMessage::from_fields(f).unwrap_err(),
            MessageError::InvalidNonce
        );

        let mut f = sample_fields();
        f.expiration_time = "tomorrow".to_string();
        assert_eq!(
            ChallengeMessage::from_fields(f).unwrap_err(),
            MessageError::InvalidTimestamp("expiration_time")
        );

        let mut f = sample_fields();
        f.address = "0x1234".to_string();
        assert_eq!(
            ChallengeMessage::from_fields(f).unwrap_err(),
            MessageError::InvalidAddress
        );
    }

    #[test]
    fn field_changes_change_the_text() {
        let base = ChallengeMessage::from_fields(sample_fields()).unwrap();
        let mut f = sample_fields();
        f.chain_id = 1;
        let other = ChallengeMessage::from_fields(f).unwrap();
        assert_ne!(base.text(), other.text());
    }
}
