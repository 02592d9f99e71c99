//! Verifier interface and the wire types of `POST /verify` and `GET /verifications/{token}`.

use std::fmt::Display;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    token::VerificationToken,
    types::{AmountValue, AnyJson, Timestamp},
};

/// Chain assumed when a verify request does not name one.
pub const DEFAULT_CHAIN: &str = "solana";

/// Body of `POST /verify`.
///
/// Every field is optional on the wire so that a verifier can answer missing
/// fields with a structured `invalid_request` instead of a decoding failure.
#[derive(Builder, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<AnyJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub amount: Option<AmountValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub request_id: Option<String>,
}

/// A verify request that passed the presence checks.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationClaim {
    pub proof: AnyJson,
    pub payer: String,
    pub amount: AmountValue,
    pub chain: String,
    pub request_id: Option<String>,
}

impl VerifyRequest {
    /// Check that `proof`, `payer` and `amount` are present.
    ///
    /// A `null` proof, an empty payer and a zero amount count as absent.
    pub fn into_claim(self) -> Result<VerificationClaim, Rejection> {
        let missing: Vec<&str> = [
            ("proof", matches!(self.proof, None | Some(AnyJson::Null))),
            (
                "payer",
                self.payer.as_deref().is_none_or(|p| p.trim().is_empty()),
            ),
            (
                "amount",
                self.amount.is_none_or(|a| !a.is_positive()),
            ),
        ]
        .into_iter()
        .filter_map(|(name, is_missing)| is_missing.then_some(name))
        .collect();

        if !missing.is_empty() {
            return Err(Rejection::invalid_request(format!(
                "Missing required field(s): {}",
                missing.join(", ")
            )));
        }

        Ok(VerificationClaim {
            proof: self.proof.unwrap_or_default(),
            payer: self.payer.unwrap_or_default(),
            amount: self.amount.unwrap_or_default(),
            chain: self
                .chain
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CHAIN.to_string()),
            request_id: self.request_id.filter(|r| !r.trim().is_empty()),
        })
    }
}

/// Machine-readable rejection codes of a verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyErrorCode {
    /// `proof`, `payer` or `amount` missing; checked before any mode logic.
    InvalidRequest,
    /// Hardened mode: the proof carries no usable transaction reference.
    InvalidProof,
    /// Hardened mode: the transaction is unknown or failed on-chain.
    VerificationFailed,
    /// Unexpected failure while verifying.
    VerificationError,
    /// The configured mode cannot verify anything.
    UnsupportedMode,
}

impl VerifyErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyErrorCode::InvalidRequest => "invalid_request",
            VerifyErrorCode::InvalidProof => "invalid_proof",
            VerifyErrorCode::VerificationFailed => "verification_failed",
            VerifyErrorCode::VerificationError => "verification_error",
            VerifyErrorCode::UnsupportedMode => "unsupported_mode",
        }
    }
}

impl Display for VerifyErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rejected verification: stable `error` code plus a human `detail`.
///
/// `error` is kept as a string so that codes from newer verifiers survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub error: String,
    pub detail: String,
}

impl Rejection {
    pub fn new(code: VerifyErrorCode, detail: impl Display) -> Self {
        Rejection {
            error: code.as_str().to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn invalid_request(detail: impl Display) -> Self {
        Self::new(VerifyErrorCode::InvalidRequest, detail)
    }

    pub fn invalid_proof(detail: impl Display) -> Self {
        Self::new(VerifyErrorCode::InvalidProof, detail)
    }

    pub fn verification_failed(detail: impl Display) -> Self {
        Self::new(VerifyErrorCode::VerificationFailed, detail)
    }

    pub fn verification_error(detail: impl Display) -> Self {
        Self::new(VerifyErrorCode::VerificationError, detail)
    }

    pub fn unsupported_mode(detail: impl Display) -> Self {
        Self::new(VerifyErrorCode::UnsupportedMode, detail)
    }

    pub fn is(&self, code: VerifyErrorCode) -> bool {
        self.error == code.as_str()
    }
}

/// An admitted verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub verification: VerificationToken,
    pub settled: bool,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified(Verified),
    Rejected(Rejection),
}

impl VerifyOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerifyOutcome::Verified(_))
    }

    pub fn as_verified(&self) -> Option<&Verified> {
        match self {
            VerifyOutcome::Verified(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_rejected(&self) -> Option<&Rejection> {
        match self {
            VerifyOutcome::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

/// Wire body of a `POST /verify` response, for both outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<VerifyOutcome> for VerifyResponse {
    fn from(outcome: VerifyOutcome) -> Self {
        match outcome {
            VerifyOutcome::Verified(v) => VerifyResponse {
                ok: true,
                verification: Some(v.verification),
                settled: Some(v.settled),
                timestamp: Some(v.timestamp),
                error: None,
                detail: None,
            },
            VerifyOutcome::Rejected(r) => VerifyResponse {
                ok: false,
                verification: None,
                settled: None,
                timestamp: None,
                error: Some(r.error),
                detail: Some(r.detail),
            },
        }
    }
}

impl VerifyResponse {
    /// Interpret the wire body. `ok=true` without a token is treated as a rejection.
    pub fn into_outcome(self) -> VerifyOutcome {
        match (self.ok, self.verification) {
            (true, Some(verification)) => VerifyOutcome::Verified(Verified {
                verification,
                settled: self.settled.unwrap_or_default(),
                timestamp: self.timestamp.unwrap_or_else(Timestamp::now),
            }),
            (true, None) => VerifyOutcome::Rejected(Rejection::verification_error(
                "Verifier reported success without a verification token",
            )),
            (false, _) => VerifyOutcome::Rejected(Rejection {
                error: self
                    .error
                    .unwrap_or_else(|| VerifyErrorCode::VerificationError.to_string()),
                detail: self.detail.unwrap_or_default(),
            }),
        }
    }
}

/// The verifier's record of an admitted payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub token: VerificationToken,
    pub payer: String,
    pub amount: AmountValue,
    pub chain: String,
    pub issued_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Settlement transaction backing the record, in hardened mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

/// Wire body of `GET /verifications/{token}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<VerificationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl LookupResponse {
    pub fn found(record: VerificationRecord) -> Self {
        LookupResponse {
            ok: true,
            record: Some(record),
            error: None,
            detail: None,
        }
    }

    pub fn not_found(token: &str) -> Self {
        LookupResponse {
            ok: false,
            record: None,
            error: Some("not_found".to_string()),
            detail: Some(format!("No verification recorded for token '{token}'")),
        }
    }
}

/// Payment verifier interface.
///
/// Implemented in-process by the verifier service and over HTTP by
/// `RemoteVerifierClient`.
pub trait Verifier {
    type Error: std::error::Error;

    /// Admit or reject a proof, minting a token on admission.
    fn verify(
        &self,
        request: VerifyRequest,
    ) -> impl Future<Output = Result<VerifyOutcome, Self::Error>>;

    /// Look up the record of a previously issued token.
    fn lookup(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<VerificationRecord>, Self::Error>>;
}
