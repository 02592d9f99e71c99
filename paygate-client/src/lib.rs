//! # Paygate Client
//!
//! Drives the client side of the paygate handshake. A request that comes back
//! `402 Payment Required` is paid for once: the client builds a proof for the
//! attached requirement, has the verifier exchange it for a verification
//! token, and replays the original request with the token in `X-PAYMENT`.
//!
//! - [`client`]: [`PaymentClient`](client::PaymentClient) and [`HandshakeError`](client::HandshakeError).
//! - [`proof`]: [`ProofBuilder`](proof::ProofBuilder) with mock and settlement-backed builders.
//!
//! Whatever the retry returns is handed back as is; a second `402` is never paid.

pub mod client;
pub mod proof;
