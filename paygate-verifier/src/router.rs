use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use paygate_core::{
    types::HealthStatus,
    verifier::{LookupResponse, Rejection, VerifyOutcome, VerifyRequest, VerifyResponse},
};

use crate::{policy::AdmissionPolicy, store::RecordStore, verifier::LocalVerifier};

/// A verify outcome as an HTTP response: `200` when verified, `400` when rejected.
#[derive(Debug, Clone)]
pub struct VerifyReply(pub VerifyOutcome);

impl IntoResponse for VerifyReply {
    fn into_response(self) -> Response {
        let status = if self.0.is_verified() {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        (status, Json(VerifyResponse::from(self.0))).into_response()
    }
}

/// Routes of the verifier: `POST /verify`, `GET /verifications/{token}` and `GET /health`.
pub fn router<P, R>(verifier: LocalVerifier<P, R>) -> Router
where
    P: AdmissionPolicy + Send + Sync + 'static,
    R: RecordStore + 'static,
{
    Router::new()
        .route("/verify", post(verify_handler::<P, R>))
        .route("/verifications/{token}", get(lookup_handler::<P, R>))
        .route("/health", get(health_handler::<P, R>))
        .with_state(verifier)
}

async fn verify_handler<P, R>(
    State(verifier): State<LocalVerifier<P, R>>,
    body: Bytes,
) -> VerifyReply
where
    P: AdmissionPolicy + Send + Sync + 'static,
    R: RecordStore + 'static,
{
    // Decoded by hand so that malformed bodies get a structured rejection.
    let request = match serde_json::from_slice::<VerifyRequest>(&body) {
        Ok(request) => request,
        Err(err) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("Undecodable verify body: {err}");

            return VerifyReply(VerifyOutcome::Rejected(Rejection::invalid_request(
                format!("Request body is not a valid verify request: {err}"),
            )));
        }
    };

    VerifyReply(verifier.verify_request(request).await)
}

async fn lookup_handler<P, R>(
    State(verifier): State<LocalVerifier<P, R>>,
    Path(token): Path<String>,
) -> Response
where
    P: AdmissionPolicy + Send + Sync + 'static,
    R: RecordStore + 'static,
{
    match verifier.lookup_token(&token) {
        Some(record) => Json(LookupResponse::found(record)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(LookupResponse::not_found(&token)),
        )
            .into_response(),
    }
}

async fn health_handler<P, R>(State(verifier): State<LocalVerifier<P, R>>) -> Json<HealthStatus>
where
    P: AdmissionPolicy + Send + Sync + 'static,
    R: RecordStore + 'static,
{
    let config = verifier.config();
    Json(HealthStatus::ok(&config.service, config.port))
}
