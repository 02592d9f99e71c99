use std::time::Duration;

use paygate_client::{client::PaymentClient, proof::MockProofBuilder};
use serde_json::json;
use url::Url;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let resource_url = std::env::var("RESOURCE_URL")
        .unwrap_or_else(|_| "http://localhost:3001/inference".to_string());
    let resource_url = Url::parse(&resource_url).expect("RESOURCE_URL must be a valid URL");

    let verifier_override = std::env::var("VERIFIER_URL")
        .ok()
        .map(|url| Url::parse(&url).expect("VERIFIER_URL must be a valid URL"));

    let proof_builder = match std::env::var("PAYER") {
        Ok(payer) => MockProofBuilder::with_payer(payer),
        Err(_) => MockProofBuilder::new(),
    };
    tracing::info!("Paying as {}", proof_builder.payer);

    let client = PaymentClient::builder()
        .proof_builder(proof_builder)
        .maybe_verifier_override(verifier_override)
        .timeout(Duration::from_secs(30))
        .build();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What is the capital of France?".to_string());

    let request = client
        .http
        .post(resource_url)
        .json(&json!({ "prompt": prompt }))
        .build()
        .expect("Failed to build request");

    let paid = client.send(request).await.expect("Handshake failed");

    if let Some(receipt) = &paid.receipt {
        tracing::info!(
            "Paid {} {} for requirement {} with token {}",
            receipt.requirement.amount,
            receipt.requirement.currency,
            receipt.requirement.id,
            receipt.token
        );
    }

    let status = paid.response.status();
    let body = paid
        .response
        .text()
        .await
        .expect("Failed to read response body");
    println!("{status}: {body}");
}
