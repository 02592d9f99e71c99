//! # Paygate Verifier
//!
//! The verifier side of the paygate handshake. It checks a client's payment
//! proof, mints a verification token on admission and remembers every token it
//! issued.
//!
//! ```rust
//! use paygate_core::verifier::VerifyRequest;
//! use paygate_verifier::verifier::{LocalVerifier, VerifierConfig};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let verifier = LocalVerifier::from_config(VerifierConfig::builder().build());
//!
//! let outcome = verifier
//!     .verify_request(
//!         VerifyRequest::builder()
//!             .proof(json!({"stub": true}))
//!             .payer("alice")
//!             .amount(1000u64)
//!             .build(),
//!     )
//!     .await;
//!
//! let token = &outcome.as_verified().unwrap().verification;
//! assert!(token.as_str().starts_with("mock-sig:"));
//! assert!(verifier.lookup_token(token.as_str()).is_some());
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`verifier`]: [`LocalVerifier`](verifier::LocalVerifier) and its configuration.
//! - [`policy`]: admission policies, mock and settlement-verifying.
//! - [`settlement`]: settlement network lookups over Solana JSON-RPC.
//! - [`store`]: the record store.
//! - `router`: axum routes (feature `axum`).
//!
//! ## Rejection codes
//!
//! Every rejection is a `400` with `{ ok: false, error, detail }`:
//!
//! - `invalid_request`: `proof`, `payer` or `amount` missing, or an undecodable body.
//! - `invalid_proof`: devnet mode, no usable transaction reference.
//! - `verification_failed`: devnet mode, the transaction is unknown, pending or failed.
//! - `verification_error`: the settlement lookup itself failed.
//! - `unsupported_mode`: the configured mode cannot verify anything.

pub mod policy;
pub mod settlement;
pub mod store;
pub mod verifier;

#[cfg(feature = "axum")]
pub mod router;
