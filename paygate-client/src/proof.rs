//! Proof construction for a payment requirement.

use std::{convert::Infallible, str::FromStr};

use paygate_core::{
    proof::PaymentProof,
    requirement::PaymentRequirement,
    types::{AmountValue, Timestamp},
};
use solana_pubkey::Pubkey;

/// Builds the proof a client presents to the verifier.
pub trait ProofBuilder {
    type Error: std::error::Error;

    fn build(
        &self,
        requirement: &PaymentRequirement,
    ) -> impl Future<Output = Result<PaymentProof, Self::Error>> + Send;
}

/// Proofs for mock verifiers. No I/O: the signature is derived from the
/// requirement id and the payer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockProofBuilder {
    pub payer: String,
}

impl MockProofBuilder {
    /// A builder with a generated `mock-payer-<hex>` identity.
    pub fn new() -> Self {
        let bytes: [u8; 4] = rand::random();
        MockProofBuilder {
            payer: format!("mock-payer-{}", hex::encode(bytes)),
        }
    }

    pub fn with_payer(payer: impl Into<String>) -> Self {
        MockProofBuilder {
            payer: payer.into(),
        }
    }

    pub fn signature_for(&self, requirement: &PaymentRequirement) -> String {
        format!("mock-signature:{}:{}", requirement.id, self.payer)
    }
}

impl Default for MockProofBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofBuilder for MockProofBuilder {
    type Error = Infallible;

    async fn build(&self, requirement: &PaymentRequirement) -> Result<PaymentProof, Infallible> {
        Ok(PaymentProof {
            payer: self.payer.clone(),
            timestamp: Timestamp::now(),
            signature: self.signature_for(requirement),
            transaction_reference: None,
        })
    }
}

/// Moves funds on the settlement network.
pub trait SettlementTransfer {
    type Error: std::error::Error + Send;

    /// Address of the signing identity, if one is configured.
    fn signer(&self) -> Option<String>;

    /// Transfer `amount` to `recipient` and return the transaction signature.
    ///
    /// `reference` is the requirement id the transfer pays for.
    fn transfer(
        &self,
        recipient: &Pubkey,
        amount: AmountValue,
        reference: &str,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

/// Proofs backed by a real transfer to the requirement's recipient.
#[derive(Debug, Clone)]
pub struct SettlementProofBuilder<T> {
    pub transfer: T,
}

impl<T> SettlementProofBuilder<T> {
    pub fn new(transfer: T) -> Self {
        SettlementProofBuilder { transfer }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettlementProofError<E> {
    #[error("No signing identity configured")]
    MissingSigner,
    #[error("Requirement {0} names no recipient")]
    MissingRecipient(String),
    #[error("Recipient '{0}' is not a valid address")]
    InvalidRecipient(String),
    #[error("Transfer failed: {0}")]
    Transfer(E),
}

impl<T: SettlementTransfer + Sync> ProofBuilder for SettlementProofBuilder<T> {
    type Error = SettlementProofError<T::Error>;

    async fn build(&self, requirement: &PaymentRequirement) -> Result<PaymentProof, Self::Error> {
        let payer = self
            .transfer
            .signer()
            .ok_or(SettlementProofError::MissingSigner)?;

        let recipient = requirement
            .recipient
            .as_deref()
            .ok_or_else(|| SettlementProofError::MissingRecipient(requirement.id.clone()))?;
        let recipient = Pubkey::from_str(recipient)
            .map_err(|_| SettlementProofError::InvalidRecipient(recipient.to_string()))?;

        let transaction = self
            .transfer
            .transfer(&recipient, requirement.amount, &requirement.id)
            .await
            .map_err(SettlementProofError::Transfer)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Paid {} to {recipient} for {}, transaction {transaction}",
            requirement.amount,
            requirement.id
        );

        Ok(PaymentProof {
            payer,
            timestamp: Timestamp::now(),
            signature: transaction.clone(),
            transaction_reference: Some(transaction),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use paygate_core::requirement::RequirementTerms;
    use url::Url;

    use super::*;

    const RECIPIENT: &str = "Ge3jkza5KRfXvaq3GELNLh6V1pjjdEKNpEdGXJgjjKUR";

    fn requirement(recipient: Option<&str>) -> PaymentRequirement {
        RequirementTerms::builder()
            .product("ai-inference")
            .amount(1000u64)
            .verifier_endpoint(Url::parse("http://localhost:3000/verify").unwrap())
            .maybe_recipient(recipient)
            .build()
            .issue()
    }

    #[derive(Default)]
    struct RecordingTransfer {
        signer: Option<String>,
        calls: AtomicUsize,
    }

    impl SettlementTransfer for RecordingTransfer {
        type Error = std::fmt::Error;

        fn signer(&self) -> Option<String> {
            self.signer.clone()
        }

        async fn transfer(
            &self,
            recipient: &Pubkey,
            amount: AmountValue,
            reference: &str,
        ) -> Result<String, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("tx-{recipient}-{amount}-{reference}"))
        }
    }

    #[tokio::test]
    async fn mock_proofs_are_deterministic_per_requirement() {
        let builder = MockProofBuilder::with_payer("alice");
        let pr = requirement(None);

        let a = builder.build(&pr).await.unwrap();
        let b = builder.build(&pr).await.unwrap();
        assert_eq!(a.signature, b.signature);
        assert_eq!(a.payer, "alice");
        assert!(a.signature.contains(&pr.id));
        assert!(a.transaction_reference.is_none());

        let other = builder.build(&requirement(None)).await.unwrap();
        assert_ne!(a.signature, other.signature);
    }

    #[test]
    fn generated_payers_differ() {
        let a = MockProofBuilder::new();
        assert!(a.payer.starts_with("mock-payer-"));
        assert_ne!(a.payer, MockProofBuilder::new().payer);
    }

    #[tokio::test]
    async fn settlement_proof_carries_the_transaction() {
        let builder = SettlementProofBuilder::new(RecordingTransfer {
            signer: Some("payer-address".to_string()),
            ..Default::default()
        });
        let pr = requirement(Some(RECIPIENT));

        let proof = builder.build(&pr).await.unwrap();
        assert_eq!(proof.payer, "payer-address");
        assert_eq!(
            proof.transaction_reference.as_deref(),
            Some(format!("tx-{RECIPIENT}-1000-{}", pr.id).as_str())
        );
        assert_eq!(builder.transfer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn settlement_preconditions_are_checked_before_paying() {
        let unsigned = SettlementProofBuilder::new(RecordingTransfer::default());
        assert!(matches!(
            unsigned.build(&requirement(Some(RECIPIENT))).await,
            Err(SettlementProofError::MissingSigner)
        ));

        let signed = SettlementProofBuilder::new(RecordingTransfer {
            signer: Some("payer-address".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            signed.build(&requirement(None)).await,
            Err(SettlementProofError::MissingRecipient(_))
        ));

        let mut pr = requirement(None);
        pr.recipient = Some("not-an-address".to_string());
        assert!(matches!(
            signed.build(&pr).await,
            Err(SettlementProofError::InvalidRecipient(_))
        ));

        assert_eq!(signed.transfer.calls.load(Ordering::SeqCst), 0);
    }
}
