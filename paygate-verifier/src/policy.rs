//! Admission policies: how a verifier decides whether a proof backs a payment.

use std::str::FromStr;

use paygate_core::{
    proof::PaymentProof,
    token::Mode,
    verifier::{Rejection, VerificationClaim},
};
use solana_signature::Signature;
use url::Url;

use crate::settlement::{SettlementNetwork, SettlementStatus, SolanaRpc};

/// A claim the policy admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    pub settled: bool,
    /// Settlement transaction backing the claim, when one was checked.
    pub transaction: Option<String>,
}

/// Decides whether a well-formed claim is admitted.
pub trait AdmissionPolicy {
    /// Mode whose token family admitted claims receive.
    fn mode(&self) -> Mode;

    fn admit(
        &self,
        claim: &VerificationClaim,
    ) -> impl Future<Output = Result<Admitted, Rejection>> + Send;
}

/// Admits every claim that passed the presence checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAdmit;

impl AdmissionPolicy for AlwaysAdmit {
    fn mode(&self) -> Mode {
        Mode::Mock
    }

    async fn admit(&self, _claim: &VerificationClaim) -> Result<Admitted, Rejection> {
        Ok(Admitted {
            settled: true,
            transaction: None,
        })
    }
}

/// Admits a claim only when its proof references a confirmed settlement transaction.
#[derive(Debug, Clone)]
pub struct SettlementVerifying<S> {
    pub network: S,
}

impl<S> SettlementVerifying<S> {
    pub fn new(network: S) -> Self {
        SettlementVerifying { network }
    }
}

impl<S: SettlementNetwork + Sync> AdmissionPolicy for SettlementVerifying<S> {
    fn mode(&self) -> Mode {
        Mode::Devnet
    }

    async fn admit(&self, claim: &VerificationClaim) -> Result<Admitted, Rejection> {
        let transaction = PaymentProof::transaction_reference_of(&claim.proof)
            .ok_or_else(|| Rejection::invalid_proof("Proof carries no transaction reference"))?;

        let signature = Signature::from_str(transaction).map_err(|err| {
            Rejection::invalid_proof(format!(
                "Transaction reference '{transaction}' is not a valid signature: {err}"
            ))
        })?;

        let status = self
            .network
            .signature_status(&signature)
            .await
            .map_err(|err| {
                #[cfg(feature = "tracing")]
                tracing::warn!("Settlement lookup for {transaction} failed: {err}");

                Rejection::verification_error(format!("Settlement lookup failed: {err}"))
            })?;

        match status {
            SettlementStatus::Confirmed { .. } => Ok(Admitted {
                settled: true,
                transaction: Some(transaction.to_string()),
            }),
            SettlementStatus::NotFound => Err(Rejection::verification_failed(format!(
                "Transaction {transaction} not found on {}",
                claim.chain
            ))),
            SettlementStatus::Pending => Err(Rejection::verification_failed(format!(
                "Transaction {transaction} is not confirmed yet"
            ))),
            SettlementStatus::Failed(err) => Err(Rejection::verification_failed(format!(
                "Transaction {transaction} failed: {err}"
            ))),
        }
    }
}

/// The admission policy of a verifier, selected once from its mode.
#[derive(Debug, Clone)]
pub enum Admission<S = SolanaRpc> {
    Mock(AlwaysAdmit),
    Settlement(SettlementVerifying<S>),
    /// The mode was selected without what it needs to verify anything.
    Unconfigured { mode: Mode, reason: String },
}

impl Admission<SolanaRpc> {
    /// Mock mode admits everything; devnet mode needs a settlement RPC endpoint.
    pub fn for_mode(mode: Mode, rpc_url: Option<Url>) -> Self {
        match (mode, rpc_url) {
            (Mode::Mock, _) => Admission::Mock(AlwaysAdmit),
            (Mode::Devnet, Some(url)) => {
                Admission::Settlement(SettlementVerifying::new(SolanaRpc::from_url(url)))
            }
            (Mode::Devnet, None) => Admission::Unconfigured {
                mode,
                reason: "Devnet mode requires a settlement RPC endpoint".to_string(),
            },
        }
    }
}

impl<S: SettlementNetwork + Sync> AdmissionPolicy for Admission<S> {
    fn mode(&self) -> Mode {
        match self {
            Admission::Mock(policy) => policy.mode(),
            Admission::Settlement(policy) => policy.mode(),
            Admission::Unconfigured { mode, .. } => *mode,
        }
    }

    async fn admit(&self, claim: &VerificationClaim) -> Result<Admitted, Rejection> {
        match self {
            Admission::Mock(policy) => policy.admit(claim).await,
            Admission::Settlement(policy) => policy.admit(claim).await,
            Admission::Unconfigured { mode, reason } => Err(Rejection::unsupported_mode(
                format!("Mode '{mode}' cannot verify payments: {reason}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use paygate_core::{types::AmountValue, verifier::VerifyErrorCode};
    use serde_json::json;

    use super::*;

    /// Settlement network answering every lookup with a fixed status.
    struct FixedNetwork(Result<SettlementStatus, std::fmt::Error>);

    impl SettlementNetwork for FixedNetwork {
        type Error = std::fmt::Error;

        async fn signature_status(
            &self,
            _signature: &Signature,
        ) -> Result<SettlementStatus, Self::Error> {
            self.0.clone()
        }
    }

    fn signature() -> String {
        Signature::from([7u8; 64]).to_string()
    }

    fn claim(proof: serde_json::Value) -> VerificationClaim {
        VerificationClaim {
            proof,
            payer: "alice".to_string(),
            amount: AmountValue(1000),
            chain: "solana".to_string(),
            request_id: None,
        }
    }

    fn hardened(status: Result<SettlementStatus, std::fmt::Error>) -> SettlementVerifying<FixedNetwork> {
        SettlementVerifying::new(FixedNetwork(status))
    }

    #[tokio::test]
    async fn always_admit_settles_anything() {
        let admitted = AlwaysAdmit.admit(&claim(json!({"stub": true}))).await.unwrap();
        assert!(admitted.settled);
        assert_eq!(AlwaysAdmit.mode(), Mode::Mock);
    }

    #[tokio::test]
    async fn hardened_policy_needs_a_transaction_reference() {
        let policy = hardened(Ok(SettlementStatus::Confirmed { slot: 1 }));

        let rejection = policy.admit(&claim(json!({"stub": true}))).await.unwrap_err();
        assert!(rejection.is(VerifyErrorCode::InvalidProof));

        let rejection = policy
            .admit(&claim(json!({"transaction_reference": "not-a-signature"})))
            .await
            .unwrap_err();
        assert!(rejection.is(VerifyErrorCode::InvalidProof));
    }

    #[tokio::test]
    async fn hardened_policy_admits_confirmed_transactions() {
        let admitted = hardened(Ok(SettlementStatus::Confirmed { slot: 1 }))
            .admit(&claim(json!({"transaction": signature()})))
            .await
            .unwrap();
        assert_eq!(admitted.transaction, Some(signature()));
        assert!(admitted.settled);
    }

    #[tokio::test]
    async fn hardened_policy_maps_settlement_outcomes() {
        let proof = json!({"transaction_reference": signature()});

        for status in [
            SettlementStatus::NotFound,
            SettlementStatus::Pending,
            SettlementStatus::Failed("InstructionError".to_string()),
        ] {
            let rejection = hardened(Ok(status))
                .admit(&claim(proof.clone()))
                .await
                .unwrap_err();
            assert!(rejection.is(VerifyErrorCode::VerificationFailed));
        }

        let rejection = hardened(Err(std::fmt::Error))
            .admit(&claim(proof))
            .await
            .unwrap_err();
        assert!(rejection.is(VerifyErrorCode::VerificationError));
    }

    #[tokio::test]
    async fn devnet_without_rpc_is_unsupported() {
        let admission = Admission::for_mode(Mode::Devnet, None);
        assert_eq!(admission.mode(), Mode::Devnet);

        let rejection = admission
            .admit(&claim(json!({"stub": true})))
            .await
            .unwrap_err();
        assert!(rejection.is(VerifyErrorCode::UnsupportedMode));

        assert!(matches!(
            Admission::for_mode(Mode::Mock, None),
            Admission::Mock(_)
        ));
    }
}
