//! Settlement network lookups used by hardened admission.

use std::fmt::Debug;

use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::json;
use solana_signature::Signature;
use url::Url;

/// Public Solana devnet JSON-RPC endpoint.
pub const SOLANA_DEVNET_RPC: &str = "https://api.devnet.solana.com";

/// Where a transaction stands on the settlement network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementStatus {
    /// The network has no record of the signature.
    NotFound,
    /// Seen but not yet confirmed.
    Pending,
    /// Landed with an execution error.
    Failed(String),
    Confirmed { slot: u64 },
}

/// A settlement network that can resolve transaction signatures.
pub trait SettlementNetwork {
    type Error: std::error::Error + Send;

    fn signature_status(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<SettlementStatus, Self::Error>> + Send;
}

/// Solana JSON-RPC client resolving signatures with `getSignatureStatuses`.
#[derive(Debug, Clone)]
pub struct SolanaRpc {
    pub rpc_url: Url,
    pub client: reqwest::Client,
    pub headers: HeaderMap,
}

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("HTTP request error: {0}")]
    HttpRequestError(#[from] reqwest::Error),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Malformed RPC response: {0}")]
    MalformedResponse(String),
}

impl SolanaRpc {
    pub fn from_url(rpc_url: Url) -> Self {
        SolanaRpc {
            rpc_url,
            client: reqwest::Client::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SignatureStatuses {
    value: Vec<Option<SignatureStatus>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    slot: u64,
    #[serde(default)]
    err: Option<serde_json::Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

impl From<Option<SignatureStatus>> for SettlementStatus {
    fn from(status: Option<SignatureStatus>) -> Self {
        match status {
            None => SettlementStatus::NotFound,
            Some(SignatureStatus { err: Some(err), .. }) if !err.is_null() => {
                SettlementStatus::Failed(err.to_string())
            }
            Some(SignatureStatus {
                slot,
                confirmation_status,
                ..
            }) => match confirmation_status.as_deref() {
                Some("confirmed") | Some("finalized") => SettlementStatus::Confirmed { slot },
                _ => SettlementStatus::Pending,
            },
        }
    }
}

impl SettlementNetwork for SolanaRpc {
    type Error = SettlementError;

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<SettlementStatus, SettlementError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getSignatureStatuses",
            "params": [[signature.to_string()], {"searchTransactionHistory": true}],
        });

        let response = self
            .client
            .post(self.rpc_url.clone())
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await?
            .json::<RpcResponse<SignatureStatuses>>()
            .await?;

        if let Some(RpcError { code, message }) = response.error {
            return Err(SettlementError::Rpc { code, message });
        }

        let status = response
            .result
            .ok_or_else(|| SettlementError::MalformedResponse("missing result".to_string()))?
            .value
            .into_iter()
            .next()
            .ok_or_else(|| SettlementError::MalformedResponse("empty status list".to_string()))?;

        let status = SettlementStatus::from(status);

        #[cfg(feature = "tracing")]
        tracing::debug!("Signature {signature} resolved to {status:?}");

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(value: serde_json::Value) -> SettlementStatus {
        let response: RpcResponse<SignatureStatuses> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"context": {"slot": 10}, "value": [value]}
        }))
        .unwrap();
        response.result.unwrap().value.into_iter().next().unwrap().into()
    }

    #[test]
    fn interprets_signature_statuses() {
        assert_eq!(decode(json!(null)), SettlementStatus::NotFound);
        assert_eq!(
            decode(json!({"slot": 7, "confirmations": null, "err": null, "confirmationStatus": "finalized"})),
            SettlementStatus::Confirmed { slot: 7 }
        );
        assert_eq!(
            decode(json!({"slot": 7, "confirmations": 0, "err": null, "confirmationStatus": "processed"})),
            SettlementStatus::Pending
        );
        assert!(matches!(
            decode(json!({"slot": 7, "err": {"InstructionError": [0, "Custom"]}, "confirmationStatus": "confirmed"})),
            SettlementStatus::Failed(_)
        ));
    }

    #[test]
    fn rpc_errors_are_decoded() {
        let response: RpcResponse<SignatureStatuses> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "Invalid params"}
        }))
        .unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32602);
    }
}
