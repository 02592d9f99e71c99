//! Verification tokens and the operating modes that namespace them.
//!
//! A token is a bearer capability of the form `<mode-prefix>:<random-hex>`,
//! e.g. `mock-sig:2ae543fa8192d9a4`. The prefix is the only signal a
//! resource server needs to tell token families apart.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Number of random bytes behind every token (hex-encoded to 16 characters).
pub const TOKEN_RANDOM_BYTES: usize = 8;

/// Admission mode of a verifier, which also decides the token prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Accept any syntactically complete proof.
    Mock,
    /// Require the proof to reference a confirmed devnet transaction.
    Devnet,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Mock => "mock",
            Mode::Devnet => "devnet",
        }
    }

    /// Token prefix, including the trailing `:` separator.
    pub fn token_prefix(&self) -> &'static str {
        match self {
            Mode::Mock => "mock-sig:",
            Mode::Devnet => "devnet-sig:",
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported mode '{0}'; expected 'mock' or 'devnet'")]
pub struct UnsupportedMode(pub String);

impl FromStr for Mode {
    type Err = UnsupportedMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "devnet" => Ok(Mode::Devnet),
            other => Err(UnsupportedMode(other.to_string())),
        }
    }
}

/// A verification token issued by a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationToken(pub String);

impl VerificationToken {
    /// Mint a fresh token for `mode` from the thread-local CSPRNG.
    pub fn mint(mode: Mode) -> Self {
        let bytes: [u8; TOKEN_RANDOM_BYTES] = rand::random();
        VerificationToken(format!("{}{}", mode.token_prefix(), hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The mode whose prefix this token carries, if any.
    pub fn mode(&self) -> Option<Mode> {
        [Mode::Mock, Mode::Devnet]
            .into_iter()
            .find(|m| self.0.starts_with(m.token_prefix()))
    }
}

impl Display for VerificationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<VerificationToken> for String {
    fn from(value: VerificationToken) -> Self {
        value.0
    }
}

/// Outcome of the syntactic token check performed by a resource server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptDecision {
    Accept,
    Reject,
}

impl AcceptDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, AcceptDecision::Accept)
    }
}

/// Accept `token` iff it is non-blank and starts with one of the prefixes of `accepted`.
///
/// The suffix is not inspected.
///
/// ```
/// use paygate_core::token::{accept_token, AcceptDecision, Mode};
///
/// assert_eq!(accept_token("mock-sig:anything", &[Mode::Mock]), AcceptDecision::Accept);
/// assert_eq!(accept_token("devnet-sig:abcd", &[Mode::Mock]), AcceptDecision::Reject);
/// assert_eq!(accept_token("   ", &[Mode::Mock]), AcceptDecision::Reject);
/// ```
pub fn accept_token(token: &str, accepted: &[Mode]) -> AcceptDecision {
    let token = token.trim();
    if token.is_empty() {
        return AcceptDecision::Reject;
    }

    if accepted.iter().any(|m| token.starts_with(m.token_prefix())) {
        AcceptDecision::Accept
    } else {
        AcceptDecision::Reject
    }
}
