//! Payment requirements: the terms a resource server demands before releasing a resource.

use std::{str::FromStr, time::Duration};

use bon::Builder;
use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;
use url::Url;

use crate::{
    errors::{Error, Result},
    types::{AmountValue, Timestamp},
};

/// Default validity window of an issued requirement.
pub const DEFAULT_VALIDITY_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Longest accepted requirement id, in characters.
pub const MAX_REQUIREMENT_ID_LEN: usize = 64;

/// Terms under which a resource will be released.
///
/// Field names are part of the wire contract:
/// `{ id, product, amount, currency, chain, facilitator, expires_at, recipient? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequirement {
    /// Opaque, unique per issuance.
    pub id: String,
    pub product: String,
    /// Price in minor currency units.
    pub amount: AmountValue,
    pub currency: String,
    /// Settlement network identifier, e.g. `solana`.
    pub chain: String,
    /// Verifier endpoint the client should submit its proof to.
    pub facilitator: Url,
    pub expires_at: Timestamp,
    /// Settlement address, present when the seller configured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl PaymentRequirement {
    /// Whether the requirement has expired at `now`.
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        !now.is_before(&self.expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(&Timestamp::now())
    }

    /// Check the invariants every issued requirement must hold.
    pub fn validate(&self) -> Result<(), RequirementError> {
        if !self.amount.is_positive() {
            return Err(RequirementError::InvalidAmount);
        }
        if self.id.trim().is_empty() {
            return Err(RequirementError::MissingRequestId);
        }
        if self.id.chars().count() > MAX_REQUIREMENT_ID_LEN {
            return Err(RequirementError::RequestIdTooLong);
        }
        if let Some(recipient) = &self.recipient {
            validate_recipient(&self.chain, recipient)?;
        }
        Ok(())
    }
}

/// Error body a resource server sends when it refuses a request.
///
/// `payment_requirements` is only present on `402 Payment Required`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_requirements: Option<PaymentRequirement>,
}

impl PaymentErrorBody {
    /// Decode a `402` body and take its requirement out.
    ///
    /// Requirements that break their invariants are refused.
    pub fn requirement_from_slice(body: &[u8]) -> Result<PaymentRequirement> {
        let body: PaymentErrorBody = serde_json::from_slice(body)?;
        let requirement = body.payment_requirements.ok_or(Error::MissingRequirements)?;
        requirement.validate()?;
        Ok(requirement)
    }
}

/// Fixed terms a resource server stamps onto every requirement it issues.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct RequirementTerms {
    #[builder(into)]
    pub product: String,
    #[builder(into)]
    pub amount: AmountValue,
    #[builder(into, default = "USDC".to_string())]
    pub currency: String,
    #[builder(into, default = "solana".to_string())]
    pub chain: String,
    pub verifier_endpoint: Url,
    #[builder(default = DEFAULT_VALIDITY_WINDOW)]
    pub validity_window: Duration,
    #[builder(into)]
    pub recipient: Option<String>,
}

impl RequirementTerms {
    /// Reject terms that could never produce a valid requirement.
    pub fn validate(&self) -> Result<(), RequirementError> {
        if !self.amount.is_positive() {
            return Err(RequirementError::InvalidAmount);
        }
        if self.validity_window.is_zero() {
            return Err(RequirementError::InvalidExpiration);
        }
        if let Some(recipient) = &self.recipient {
            validate_recipient(&self.chain, recipient)?;
        }
        Ok(())
    }

    /// Issue a fresh requirement valid from `now` for the configured window.
    pub fn issue_at(&self, now: Timestamp) -> PaymentRequirement {
        PaymentRequirement {
            id: new_requirement_id(),
            product: self.product.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            chain: self.chain.clone(),
            facilitator: self.verifier_endpoint.clone(),
            expires_at: now + self.validity_window,
            recipient: self.recipient.clone(),
        }
    }

    pub fn issue(&self) -> PaymentRequirement {
        self.issue_at(Timestamp::now())
    }
}

/// `req_` followed by 16 random bytes in hex.
fn new_requirement_id() -> String {
    let bytes: [u8; 16] = rand::random();
    format!("req_{}", hex::encode(bytes))
}

/// Solana recipients must be valid base58 public keys; other chains are passed through.
fn validate_recipient(chain: &str, recipient: &str) -> Result<(), RequirementError> {
    if recipient.trim().is_empty() {
        return Err(RequirementError::InvalidRecipient(recipient.to_string()));
    }
    if chain.starts_with("solana") {
        Pubkey::from_str(recipient)
            .map_err(|_| RequirementError::InvalidRecipient(recipient.to_string()))?;
    }
    Ok(())
}

/// Invariant violations of payment requirements and their terms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequirementError {
    #[error("Invalid amount: must be greater than 0")]
    InvalidAmount,

    #[error("Invalid expiration: must be in the future")]
    InvalidExpiration,

    #[error("Request ID missing")]
    MissingRequestId,

    #[error("Request ID too long: maximum {MAX_REQUIREMENT_ID_LEN} characters")]
    RequestIdTooLong,

    #[error("Invalid recipient address '{0}'")]
    InvalidRecipient(String),
}
