use std::sync::Arc;

use http::HeaderMap;
use paygate_core::{
    PAYMENT_HEADER,
    requirement::PaymentRequirement,
    token::{self, AcceptDecision, Mode, VerificationToken},
    verifier::{VerificationRecord, Verifier},
};

use crate::{
    config::{ConfigError, ResourceServerConfig, TokenCheck},
    errors::ErrorResponse,
};

/// A request that passed the token gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedPayment {
    pub token: VerificationToken,
    /// The verifier's record, when the server is configured to look tokens up.
    pub record: Option<VerificationRecord>,
}

/// The resource server side of the handshake.
///
/// Issues a fresh [`PaymentRequirement`] to every unpaid request and admits
/// requests whose `X-PAYMENT` header carries an accepted verification token.
/// Cheap to clone; the configuration is shared.
#[derive(Debug, Clone)]
pub struct ResourceServer {
    config: Arc<ResourceServerConfig>,
}

impl ResourceServer {
    pub fn new(config: ResourceServerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ResourceServer {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ResourceServerConfig {
        &self.config
    }

    pub fn accepted_modes(&self) -> &[Mode] {
        &self.config.accepted_modes
    }

    /// Issue a new requirement under the configured terms.
    pub fn issue_requirement(&self) -> PaymentRequirement {
        let requirement = self.config.terms.issue();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Issued requirement id='{}' amount={} expires_at={}",
            requirement.id,
            requirement.amount,
            requirement.expires_at
        );

        requirement
    }

    pub fn accept_token(&self, token: &str) -> AcceptDecision {
        token::accept_token(token, &self.config.accepted_modes)
    }

    /// Run the gate against request headers.
    ///
    /// - no `X-PAYMENT` header: `402` with a fresh requirement;
    /// - a token that is unreadable, blank or of a refused family: `403`;
    /// - with [`TokenCheck::VerifierLookup`], a token the verifier does not know: `403`,
    ///   and a verifier that cannot be reached: `503`.
    pub async fn admit(&self, headers: &HeaderMap) -> Result<AdmittedPayment, ErrorResponse> {
        let Some(value) = headers.get(PAYMENT_HEADER) else {
            return Err(self.payment_required());
        };

        let token = value
            .to_str()
            .map_err(|err| {
                self.invalid_payment(format!("Failed to decode {PAYMENT_HEADER} header: {err}"))
            })?
            .trim();

        if !self.accept_token(token).is_accept() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Refused token '{token}'");

            return Err(self.invalid_payment("Payment token not accepted"));
        }

        let record = match &self.config.token_check {
            TokenCheck::Prefix => None,
            TokenCheck::VerifierLookup(verifier) => match verifier.lookup(token).await {
                Ok(Some(record)) => Some(record),
                Ok(None) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Verifier has no record of token '{token}'");

                    return Err(self.invalid_payment("Payment token not issued by the verifier"));
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Token lookup failed: {err}");

                    return Err(self.verifier_unavailable(format!(
                        "Failed to confirm payment token: {err}"
                    )));
                }
            },
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Admitted token '{token}'");

        Ok(AdmittedPayment {
            token: VerificationToken(token.to_string()),
            record,
        })
    }

    /// Gate a handler: it only runs once the request's token is admitted.
    pub async fn handle_payment<Fun, Fut, Res>(
        &self,
        headers: &HeaderMap,
        handler: Fun,
    ) -> Result<Res, ErrorResponse>
    where
        Fun: FnOnce(AdmittedPayment) -> Fut,
        Fut: Future<Output = Res>,
    {
        let payment = self.admit(headers).await?;
        Ok(handler(payment).await)
    }

    /// Payment needed to access the resource.
    pub fn payment_required(&self) -> ErrorResponse {
        ErrorResponse::payment_required(self.issue_requirement())
    }

    /// Token presented but refused.
    pub fn invalid_payment(&self, reason: impl std::fmt::Display) -> ErrorResponse {
        ErrorResponse::invalid_payment(reason)
    }

    /// Token could not be confirmed with the verifier.
    pub fn verifier_unavailable(&self, reason: impl std::fmt::Display) -> ErrorResponse {
        ErrorResponse::verifier_unavailable(reason)
    }
}
