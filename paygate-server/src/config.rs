//! Resource server configuration.

use bon::Builder;
use paygate_core::{
    requirement::{RequirementError, RequirementTerms},
    token::Mode,
    verifier_client::RemoteVerifierClient,
};

use crate::inference::DEFAULT_MODEL;

/// How a presented token is checked once it passes the prefix test.
#[derive(Debug, Clone, Default)]
pub enum TokenCheck {
    /// Prefix only: any token of an accepted family is admitted.
    #[default]
    Prefix,
    /// Additionally ask the verifier whether it actually issued the token.
    VerifierLookup(RemoteVerifierClient),
}

/// Configuration of a [`ResourceServer`](crate::gate::ResourceServer).
///
/// ```
/// use paygate_core::{requirement::RequirementTerms, token::Mode};
/// use paygate_server::config::ResourceServerConfig;
///
/// let config = ResourceServerConfig::builder()
///     .terms(
///         RequirementTerms::builder()
///             .product("ai-inference")
///             .amount(1000u64)
///             .verifier_endpoint("http://localhost:3000/verify".parse().unwrap())
///             .build(),
///     )
///     .accepted_modes(vec![Mode::Mock, Mode::Devnet])
///     .build();
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.port, 3001);
/// ```
#[derive(Builder, Debug, Clone)]
pub struct ResourceServerConfig {
    /// Service name reported by `/health`.
    #[builder(into, default = "paygate-inference".to_string())]
    pub service: String,
    #[builder(default = 3001)]
    pub port: u16,
    /// Model name reported in inference results.
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub model: String,
    /// Terms stamped onto every issued requirement.
    pub terms: RequirementTerms,
    /// Token families admitted at the gate.
    #[builder(default = vec![Mode::Mock])]
    pub accepted_modes: Vec<Mode>,
    #[builder(default)]
    pub token_check: TokenCheck,
}

impl ResourceServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terms.validate()?;
        if self.accepted_modes.is_empty() {
            return Err(ConfigError::NoAcceptedModes);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Requirement(#[from] RequirementError),
    #[error("At least one token mode must be accepted")]
    NoAcceptedModes,
}
