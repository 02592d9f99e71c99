//! Paygate core library.
//!
//! Shared data model of the request-payment handshake between a client, a
//! resource server and a verifier:
//!
//! - [`requirement`]: payment requirements issued with `402 Payment Required`.
//! - [`proof`]: payment proofs a client presents to a verifier.
//! - [`token`]: verification tokens, operating modes and the prefix check.
//! - [`verifier`]: the [`Verifier`](verifier::Verifier) trait and the `/verify` wire types.
//! - [`verifier_client`]: an HTTP [`Verifier`](verifier::Verifier) (feature `verifier-client`).

pub mod errors;
pub mod proof;
pub mod requirement;
pub mod token;
pub mod types;
pub mod verifier;

#[cfg(feature = "verifier-client")]
pub mod verifier_client;

/// Header carrying the verification token on a retried request.
pub const PAYMENT_HEADER: &str = "X-PAYMENT";
