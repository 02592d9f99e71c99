//! # Paygate Server
//!
//! The resource server side of the paygate handshake. A protected route answers
//! an unpaid request with `402 Payment Required` and a fresh
//! [`PaymentRequirement`](paygate_core::requirement::PaymentRequirement), and
//! releases the resource once the request carries an accepted verification
//! token in its `X-PAYMENT` header.
//!
//! ## Quick Start
//!
//! ```rust
//! use paygate_core::{requirement::RequirementTerms, token::Mode};
//! use paygate_server::{config::ResourceServerConfig, gate::ResourceServer};
//! use url_macro::url;
//!
//! let server = ResourceServer::new(
//!     ResourceServerConfig::builder()
//!         .terms(
//!             RequirementTerms::builder()
//!                 .product("ai-inference")
//!                 .amount(1000u64)
//!                 .verifier_endpoint(url!("http://localhost:3000/verify"))
//!                 .build(),
//!         )
//!         .accepted_modes(vec![Mode::Mock])
//!         .build(),
//! )
//! .unwrap();
//!
//! let requirement = server.issue_requirement();
//! assert_eq!(requirement.currency, "USDC");
//! assert!(server.accept_token("mock-sig:0011223344556677").is_accept());
//! ```
//!
//! ## Modules
//!
//! - [`config`]: [`ResourceServerConfig`](config::ResourceServerConfig) and the token check mode.
//! - [`gate`]: [`ResourceServer`](gate::ResourceServer), the token gate.
//! - [`inference`]: the protected action.
//! - [`errors`]: [`ErrorResponse`](errors::ErrorResponse) and the refusal codes.
//! - `router`: axum routes (feature `axum`).
//!
//! ## Gate outcomes
//!
//! - `402 Payment Required`: no `X-PAYMENT` header. The body carries a new requirement.
//! - `403 Forbidden`: a header is present but its token is refused. Never a new challenge.
//! - `503 Service Unavailable`: the verifier could not confirm the token (lookup mode only).

pub mod config;
pub mod errors;
pub mod gate;
pub mod inference;

#[cfg(feature = "axum")]
pub mod router;
