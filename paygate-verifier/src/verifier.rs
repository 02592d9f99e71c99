use std::{convert::Infallible, sync::Arc};

use bon::Builder;
use paygate_core::{
    token::{Mode, VerificationToken},
    types::Timestamp,
    verifier::{
        Rejection, VerificationClaim, VerificationRecord, Verified, Verifier, VerifyOutcome,
        VerifyRequest,
    },
};
use url::Url;

use crate::{
    policy::{Admission, AdmissionPolicy, Admitted},
    store::{InMemoryRecordStore, PutOutcome, RecordStore},
};

/// Fresh tokens drawn before giving up on a colliding store.
const MINT_ATTEMPTS: usize = 8;

/// Verifier configuration.
#[derive(Builder, Debug, Clone)]
pub struct VerifierConfig {
    /// Service name reported by `/health`.
    #[builder(into, default = "paygate-verifier".to_string())]
    pub service: String,
    #[builder(default = 3000)]
    pub port: u16,
    #[builder(default = Mode::Mock)]
    pub mode: Mode,
    /// Settlement RPC endpoint, required by devnet mode.
    pub rpc_url: Option<Url>,
    /// Answer repeated verify calls for the same `request_id` with the first token.
    #[builder(default, with = || true)]
    pub dedupe_by_request_id: bool,
}

/// An in-process verifier: checks claims, admits them through its policy and
/// records every token it issues.
#[derive(Debug)]
pub struct LocalVerifier<P = Admission, R = InMemoryRecordStore> {
    config: Arc<VerifierConfig>,
    policy: Arc<P>,
    store: Arc<R>,
}

impl<P, R> Clone for LocalVerifier<P, R> {
    fn clone(&self) -> Self {
        LocalVerifier {
            config: self.config.clone(),
            policy: self.policy.clone(),
            store: self.store.clone(),
        }
    }
}

impl LocalVerifier {
    /// Select the admission policy from the configured mode and start with an empty store.
    pub fn from_config(config: VerifierConfig) -> Self {
        let policy = Admission::for_mode(config.mode, config.rpc_url.clone());

        #[cfg(feature = "tracing")]
        if let Admission::Unconfigured { reason, .. } = &policy {
            tracing::warn!("Verifier mode '{}' is unusable: {reason}", config.mode);
        }

        LocalVerifier::new(config, policy, InMemoryRecordStore::new())
    }
}

impl<P: AdmissionPolicy, R: RecordStore> LocalVerifier<P, R> {
    pub fn new(config: VerifierConfig, policy: P, store: R) -> Self {
        LocalVerifier {
            config: Arc::new(config),
            policy: Arc::new(policy),
            store: Arc::new(store),
        }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    /// Verify a request: presence checks first, then the admission policy.
    pub async fn verify_request(&self, request: VerifyRequest) -> VerifyOutcome {
        let outcome = match request.into_claim() {
            Ok(claim) => self.verify_claim(claim).await,
            Err(rejection) => VerifyOutcome::Rejected(rejection),
        };

        #[cfg(feature = "tracing")]
        match &outcome {
            VerifyOutcome::Verified(v) => {
                tracing::info!("Verification admitted, token '{}'", v.verification)
            }
            VerifyOutcome::Rejected(r) => {
                tracing::info!("Verification rejected: {} ({})", r.error, r.detail)
            }
        }

        outcome
    }

    async fn verify_claim(&self, claim: VerificationClaim) -> VerifyOutcome {
        let admitted = match self.policy.admit(&claim).await {
            Ok(admitted) => admitted,
            Err(rejection) => return VerifyOutcome::Rejected(rejection),
        };

        let dedupe = self.config.dedupe_by_request_id;
        if dedupe {
            if let Some(existing) = claim
                .request_id
                .as_deref()
                .and_then(|id| self.store.find_by_request(id))
            {
                return reissued(&claim, existing);
            }
        }

        self.record(claim, admitted, dedupe)
    }

    /// Mint a token and store its record, redrawing on collision.
    fn record(&self, claim: VerificationClaim, admitted: Admitted, dedupe: bool) -> VerifyOutcome {
        let issued_at = Timestamp::now();

        for _ in 0..MINT_ATTEMPTS {
            let record = VerificationRecord {
                token: VerificationToken::mint(self.policy.mode()),
                payer: claim.payer.clone(),
                amount: claim.amount,
                chain: claim.chain.clone(),
                issued_at,
                request_id: claim.request_id.clone(),
                transaction: admitted.transaction.clone(),
            };
            let token = record.token.clone();

            let put = if dedupe {
                self.store.put_unique_request(record)
            } else {
                self.store.put(record)
            };

            match put {
                PutOutcome::Stored => {
                    return VerifyOutcome::Verified(Verified {
                        verification: token,
                        settled: admitted.settled,
                        timestamp: issued_at,
                    });
                }
                PutOutcome::RequestExists(existing) => return reissued(&claim, existing),
                PutOutcome::TokenExists => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Token collision on '{token}', drawing again");
                }
            }
        }

        VerifyOutcome::Rejected(Rejection::verification_error(
            "Failed to mint a unique verification token",
        ))
    }

    pub fn lookup_token(&self, token: &str) -> Option<VerificationRecord> {
        self.store.get(token)
    }
}

/// Answer with the token of a record that already covers the request.
///
/// The record is only handed out to a claim for the same payer and amount.
fn reissued(claim: &VerificationClaim, existing: VerificationRecord) -> VerifyOutcome {
    let request_id = existing.request_id.as_deref().unwrap_or_default();

    if existing.payer != claim.payer || existing.amount != claim.amount {
        return VerifyOutcome::Rejected(Rejection::verification_failed(format!(
            "Request '{request_id}' was already verified for different terms"
        )));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "Request '{request_id}' already verified, returning token '{}'",
        existing.token
    );

    VerifyOutcome::Verified(Verified {
        verification: existing.token,
        settled: true,
        timestamp: existing.issued_at,
    })
}

impl<P: AdmissionPolicy, R: RecordStore> Verifier for LocalVerifier<P, R> {
    type Error = Infallible;

    async fn verify(&self, request: VerifyRequest) -> Result<VerifyOutcome, Self::Error> {
        Ok(self.verify_request(request).await)
    }

    async fn lookup(&self, token: &str) -> Result<Option<VerificationRecord>, Self::Error> {
        Ok(self.lookup_token(token))
    }
}
