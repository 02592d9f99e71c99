//! Payment proofs presented by a client to a verifier.

use serde::{Deserialize, Serialize};

use crate::types::{AnyJson, Timestamp};

/// Evidence a client presents claiming payment has occurred.
///
/// `signature` is opaque: a mock marker in mock mode, a transaction signature
/// when a real transfer backs the proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub payer: String,
    pub timestamp: Timestamp,
    pub signature: String,
    #[serde(
        default,
        alias = "transaction",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_reference: Option<String>,
}

impl PaymentProof {
    /// Extract a transaction reference from an arbitrary JSON proof.
    ///
    /// Verifiers receive proofs as untyped objects, so this looks at both the
    /// canonical `transaction_reference` key and its `transaction` alias.
    /// Blank values count as absent.
    pub fn transaction_reference_of(proof: &AnyJson) -> Option<&str> {
        ["transaction_reference", "transaction"]
            .into_iter()
            .filter_map(|key| proof.get(key).and_then(AnyJson::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

impl From<PaymentProof> for AnyJson {
    fn from(proof: PaymentProof) -> Self {
        serde_json::to_value(proof).unwrap_or(AnyJson::Null)
    }
}
