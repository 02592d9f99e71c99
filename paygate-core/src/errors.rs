/// Error types for paygate core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// JSON serialization/deserialization errors.
    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// A payment-required body without `payment_requirements`.
    #[error("Response carries no payment_requirements")]
    MissingRequirements,

    /// A requirement that violates its invariants.
    #[error("Invalid payment requirement: {0}")]
    InvalidRequirement(#[from] crate::requirement::RequirementError),
}

/// A specialized `Result` type for paygate core operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
