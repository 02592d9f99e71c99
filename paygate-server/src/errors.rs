use std::fmt::Display;

use http::StatusCode;
use paygate_core::requirement::{PaymentErrorBody, PaymentRequirement};

/// Error code of a `402 Payment Required` body.
pub const PAYMENT_REQUIRED: &str = "payment_required";
/// Error code of a `403 Forbidden` body when the presented token is refused.
pub const INVALID_PAYMENT: &str = "invalid_payment";
/// Error code of a `503` body when the verifier cannot confirm a token.
pub const VERIFIER_UNAVAILABLE: &str = "verifier_unavailable";

/// A refusal produced by the gate, carrying the status and the JSON body to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub body: PaymentErrorBody,
}

impl ErrorResponse {
    pub fn payment_required(requirement: PaymentRequirement) -> Self {
        ErrorResponse {
            status: StatusCode::PAYMENT_REQUIRED,
            body: PaymentErrorBody {
                error: PAYMENT_REQUIRED.to_string(),
                message: "Payment required to access this resource".to_string(),
                payment_requirements: Some(requirement),
            },
        }
    }

    pub fn invalid_payment(message: impl Display) -> Self {
        ErrorResponse {
            status: StatusCode::FORBIDDEN,
            body: PaymentErrorBody {
                error: INVALID_PAYMENT.to_string(),
                message: message.to_string(),
                payment_requirements: None,
            },
        }
    }

    pub fn verifier_unavailable(message: impl Display) -> Self {
        ErrorResponse {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: PaymentErrorBody {
                error: VERIFIER_UNAVAILABLE.to_string(),
                message: message.to_string(),
                payment_requirements: None,
            },
        }
    }

    /// The requirement attached to a `402`, if any.
    pub fn requirement(&self) -> Option<&PaymentRequirement> {
        self.body.payment_requirements.as_ref()
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, axum::extract::Json(self.body)).into_response()
    }
}
