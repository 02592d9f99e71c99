//! The protected action: a stand-in inference that echoes the prompt.

use paygate_core::types::{AmountValue, Timestamp};
use serde::{Deserialize, Serialize};

/// Model name reported when none is configured.
pub const DEFAULT_MODEL: &str = "paygate-echo-1";

/// Body of `POST /inference`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRequest {
    #[serde(default)]
    pub prompt: String,
}

impl InferenceRequest {
    /// Decode a request body leniently.
    ///
    /// An empty or unparseable body, or one without a string `prompt`, yields an
    /// empty prompt. The gate has already admitted the payment at this point.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

/// Body of a successful `POST /inference`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub result: String,
    pub cost_charged: AmountValue,
    pub timestamp: Timestamp,
    pub prompt: String,
    pub model: String,
}

/// Run the inference for an admitted request.
pub fn serve(request: InferenceRequest, price: AmountValue, model: &str) -> InferenceResult {
    InferenceResult {
        result: format!("Inference result for prompt: {}", request.prompt),
        cost_charged: price,
        timestamp: Timestamp::now(),
        prompt: request.prompt,
        model: model.to_string(),
    }
}
