use std::{fmt::Display, time::Duration};

use bon::Builder;
use paygate_core::{
    PAYMENT_HEADER,
    requirement::{PaymentErrorBody, PaymentRequirement},
    token::VerificationToken,
    types::Timestamp,
    verifier::{Verifier, VerifyOutcome, VerifyRequest},
    verifier_client::RemoteVerifierClient,
};
use reqwest::{Request, Response, StatusCode, header::HeaderValue};
use url::Url;

use crate::proof::ProofBuilder;

/// Network-bound steps of a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The unpaid request and reading its challenge.
    Initial,
    Proof,
    Verify,
    /// The request replayed with the verification token.
    Retry,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            Stage::Initial => "initial request",
            Stage::Proof => "proof construction",
            Stage::Verify => "verification",
            Stage::Retry => "paid retry",
        };
        write!(f, "{stage}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("Malformed payment challenge: {0}")]
    MalformedResponse(String),

    #[error("Payment requirement {id} expired at {expires_at}")]
    RequirementExpired { id: String, expires_at: Timestamp },

    #[error("Failed to construct payment proof: {0}")]
    ProofConstructionFailed(String),

    #[error("Verification failed: {code}: {detail}")]
    VerificationFailed { code: String, detail: String },

    #[error("Transport failure during {stage}: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Timed out during {0}")]
    Timeout(Stage),

    #[error("Request body cannot be replayed")]
    UnclonableRequest,

    #[error("Verification token is not a valid header value: {0}")]
    InvalidHeader(String),
}

impl HandshakeError {
    fn transport(stage: Stage, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        HandshakeError::Transport {
            stage,
            source: Box::new(err),
        }
    }
}

/// What a completed payment cycle paid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub requirement: PaymentRequirement,
    pub token: VerificationToken,
    pub payer: String,
}

/// The response handed back to the caller.
#[derive(Debug)]
pub struct HandshakeResponse {
    /// The initial response when no payment was asked for, the retried one otherwise.
    pub response: Response,
    /// Present when a payment cycle ran.
    pub receipt: Option<PaymentReceipt>,
}

/// An HTTP client that answers `402 Payment Required` by paying and retrying once.
///
/// ```rust,no_run
/// use paygate_client::{client::PaymentClient, proof::MockProofBuilder};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PaymentClient::builder()
///     .proof_builder(MockProofBuilder::new())
///     .build();
///
/// let request = client
///     .http
///     .post("http://localhost:3001/inference")
///     .json(&serde_json::json!({"prompt": "hello"}))
///     .build()?;
///
/// let paid = client.send(request).await?;
/// println!("{}", paid.response.text().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Debug, Clone)]
pub struct PaymentClient<B> {
    #[builder(default)]
    pub http: reqwest::Client,
    pub proof_builder: B,
    /// Verifier endpoint used instead of the one a requirement advertises.
    pub verifier_override: Option<Url>,
    /// Budget of each network-bound stage.
    pub timeout: Option<Duration>,
}

impl<B: ProofBuilder> PaymentClient<B> {
    /// Send `request`, paying for it at most once if the server asks for payment.
    ///
    /// Any `X-PAYMENT` header already on the request is dropped: a token is only
    /// ever attached to the retry of the cycle that obtained it.
    pub async fn send(&self, mut request: Request) -> Result<HandshakeResponse, HandshakeError> {
        request.headers_mut().remove(PAYMENT_HEADER);
        let mut retry = request
            .try_clone()
            .ok_or(HandshakeError::UnclonableRequest)?;

        let response = self
            .within(Stage::Initial, self.http.execute(request))
            .await?
            .map_err(|err| HandshakeError::transport(Stage::Initial, err))?;

        if response.status() != StatusCode::PAYMENT_REQUIRED {
            return Ok(HandshakeResponse {
                response,
                receipt: None,
            });
        }

        let body = self
            .within(Stage::Initial, response.bytes())
            .await?
            .map_err(|err| HandshakeError::transport(Stage::Initial, err))?;

        let requirement = PaymentErrorBody::requirement_from_slice(&body)
            .map_err(|err| HandshakeError::MalformedResponse(err.to_string()))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Payment required: id='{}' amount={} {} on {}",
            requirement.id,
            requirement.amount,
            requirement.currency,
            requirement.chain
        );

        if requirement.is_expired() {
            return Err(HandshakeError::RequirementExpired {
                id: requirement.id,
                expires_at: requirement.expires_at,
            });
        }

        let proof = self
            .within(Stage::Proof, self.proof_builder.build(&requirement))
            .await?
            .map_err(|err| HandshakeError::ProofConstructionFailed(err.to_string()))?;
        let payer = proof.payer.clone();

        let verify_url = self
            .verifier_override
            .clone()
            .unwrap_or_else(|| requirement.facilitator.clone());
        let verifier = RemoteVerifierClient::from_url(verify_url).with_client(self.http.clone());

        let verify_request = VerifyRequest::builder()
            .proof(proof.into())
            .payer(payer.clone())
            .amount(requirement.amount)
            .chain(requirement.chain.clone())
            .request_id(requirement.id.clone())
            .build();

        let outcome = self
            .within(Stage::Verify, verifier.verify(verify_request))
            .await?
            .map_err(|err| HandshakeError::transport(Stage::Verify, err))?;

        let token = match outcome {
            VerifyOutcome::Verified(verified) => verified.verification,
            VerifyOutcome::Rejected(rejection) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Verifier rejected payment: {}", rejection.error);

                return Err(HandshakeError::VerificationFailed {
                    code: rejection.error,
                    detail: rejection.detail,
                });
            }
        };

        let header = HeaderValue::from_str(token.as_str())
            .map_err(|_| HandshakeError::InvalidHeader(token.to_string()))?;
        retry.headers_mut().insert(PAYMENT_HEADER, header);

        #[cfg(feature = "tracing")]
        tracing::debug!("Retrying with token '{token}'");

        let response = self
            .within(Stage::Retry, self.http.execute(retry))
            .await?
            .map_err(|err| HandshakeError::transport(Stage::Retry, err))?;

        Ok(HandshakeResponse {
            response,
            receipt: Some(PaymentReceipt {
                requirement,
                token,
                payer,
            }),
        })
    }

    /// Bound `future` by the per-stage timeout, if one is set.
    async fn within<F: Future>(&self, stage: Stage, future: F) -> Result<F::Output, HandshakeError> {
        match self.timeout {
            Some(budget) => tokio::time::timeout(budget, future)
                .await
                .map_err(|_| HandshakeError::Timeout(stage)),
            None => Ok(future.await),
        }
    }
}
