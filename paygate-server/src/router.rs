use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use paygate_core::types::HealthStatus;

use crate::{
    gate::ResourceServer,
    inference::{self, InferenceRequest},
};

/// Routes of the resource server: `POST /inference` behind the gate and `GET /health`.
pub fn router(server: ResourceServer) -> Router {
    Router::new()
        .route("/inference", post(inference_handler))
        .route("/health", get(health_handler))
        .with_state(server)
}

async fn inference_handler(
    State(server): State<ResourceServer>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let config = server.config();
    server
        .handle_payment(&headers, |payment| async move {
            let result = inference::serve(
                InferenceRequest::from_body(&body),
                config.terms.amount,
                &config.model,
            );

            #[cfg(feature = "tracing")]
            tracing::info!(
                "Served inference with token '{}', charged {}",
                payment.token,
                result.cost_charged
            );
            #[cfg(not(feature = "tracing"))]
            let _ = payment;

            Json(result).into_response()
        })
        .await
        .unwrap_or_else(|err| err.into_response())
}

async fn health_handler(State(server): State<ResourceServer>) -> Json<HealthStatus> {
    let config = server.config();
    Json(HealthStatus::ok(&config.service, config.port))
}
