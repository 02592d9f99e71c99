use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{Router, response::IntoResponse, routing::post};
use paygate_client::{
    client::{HandshakeError, PaymentClient, Stage},
    proof::MockProofBuilder,
};
use paygate_core::{
    PAYMENT_HEADER,
    requirement::RequirementTerms,
    token::Mode,
    types::Timestamp,
    verifier_client::RemoteVerifierClient,
};
use paygate_server::{
    config::{ResourceServerConfig, TokenCheck}, errors::ErrorResponse, gate::ResourceServer,
    router::router as server_router,
};
use paygate_verifier::{
    router::router as verifier_router,
    verifier::{LocalVerifier, VerifierConfig},
};
use serde_json::{Value, json};
use url::Url;

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

async fn spawn_verifier(config: VerifierConfig) -> Url {
    let addr = spawn(verifier_router(LocalVerifier::from_config(config))).await;
    Url::parse(&format!("http://{addr}/verify")).unwrap()
}

fn terms(verifier: Url) -> RequirementTerms {
    RequirementTerms::builder()
        .product("ai-inference")
        .amount(1000u64)
        .verifier_endpoint(verifier)
        .build()
}

async fn spawn_server(verifier: Url, accepted: Vec<Mode>) -> Url {
    let server = ResourceServer::new(
        ResourceServerConfig::builder()
            .terms(terms(verifier))
            .accepted_modes(accepted)
            .build(),
    )
    .unwrap();
    let addr = spawn(server_router(server)).await;
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// A protected route that answers every call with a fixed response and counts the calls.
async fn spawn_counting(
    hits: Arc<AtomicUsize>,
    respond: impl Fn() -> axum::response::Response + Clone + Send + Sync + 'static,
) -> Url {
    let app = Router::new().route(
        "/inference",
        post(move || {
            let hits = hits.clone();
            let respond = respond.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                respond()
            }
        }),
    );
    let addr = spawn(app).await;
    Url::parse(&format!("http://{addr}/")).unwrap()
}

fn client() -> PaymentClient<MockProofBuilder> {
    PaymentClient::builder()
        .proof_builder(MockProofBuilder::with_payer("alice"))
        .build()
}

fn inference(client: &PaymentClient<MockProofBuilder>, base: &Url) -> reqwest::Request {
    client
        .http
        .post(base.join("inference").unwrap())
        .json(&json!({"prompt": "hello"}))
        .build()
        .unwrap()
}

#[tokio::test]
async fn pays_and_retries_once() {
    let verifier = spawn_verifier(VerifierConfig::builder().build()).await;
    let server = spawn_server(verifier, vec![Mode::Mock]).await;
    let client = client();

    let paid = client.send(inference(&client, &server)).await.unwrap();
    assert_eq!(paid.response.status(), reqwest::StatusCode::OK);

    let receipt = paid.receipt.unwrap();
    assert_eq!(receipt.requirement.amount, 1000u64.into());
    assert_eq!(receipt.requirement.currency, "USDC");
    assert_eq!(receipt.payer, "alice");
    assert!(receipt.token.as_str().starts_with("mock-sig:"));

    let body: Value = paid.response.json().await.unwrap();
    assert!(body["result"].as_str().unwrap().contains("hello"));
    assert_eq!(body["cost_charged"], json!(1000));
}

#[tokio::test]
async fn unpaid_responses_pass_through() {
    let verifier = spawn_verifier(VerifierConfig::builder().build()).await;
    let server = spawn_server(verifier, vec![Mode::Mock]).await;
    let client = client();

    let request = client
        .http
        .get(server.join("health").unwrap())
        .build()
        .unwrap();
    let paid = client.send(request).await.unwrap();
    assert_eq!(paid.response.status(), reqwest::StatusCode::OK);
    assert!(paid.receipt.is_none());
}

#[tokio::test]
async fn a_second_challenge_is_returned_not_paid() {
    let verifier = spawn_verifier(VerifierConfig::builder().build()).await;
    let challenge_terms = terms(verifier);
    let hits = Arc::new(AtomicUsize::new(0));
    let server = spawn_counting(hits.clone(), move || {
        ErrorResponse::payment_required(challenge_terms.issue()).into_response()
    })
    .await;
    let client = client();

    let paid = client.send(inference(&client, &server)).await.unwrap();
    assert_eq!(paid.response.status(), reqwest::StatusCode::PAYMENT_REQUIRED);
    assert!(paid.receipt.is_some());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn refused_tokens_are_returned_as_is() {
    // The server only honours devnet tokens, the verifier mints mock ones.
    let verifier = spawn_verifier(VerifierConfig::builder().build()).await;
    let server = spawn_server(verifier, vec![Mode::Devnet]).await;
    let client = client();

    let paid = client.send(inference(&client, &server)).await.unwrap();
    assert_eq!(paid.response.status(), reqwest::StatusCode::FORBIDDEN);
    let body: Value = paid.response.json().await.unwrap();
    assert_eq!(body["error"], json!("invalid_payment"));
}

#[tokio::test]
async fn challenges_without_requirements_are_malformed() {
    let hits = Arc::new(AtomicUsize::new(0));
    let server = spawn_counting(hits.clone(), || {
        (axum::http::StatusCode::PAYMENT_REQUIRED, "pay me").into_response()
    })
    .await;
    let client = client();

    let err = client.send(inference(&client, &server)).await.unwrap_err();
    assert!(matches!(err, HandshakeError::MalformedResponse(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn requirements_breaking_their_invariants_are_not_paid() {
    let verifier = spawn_verifier(VerifierConfig::builder().build()).await;
    let challenge_terms = terms(verifier);
    let hits = Arc::new(AtomicUsize::new(0));
    let server = spawn_counting(hits.clone(), move || {
        let mut free = challenge_terms.issue();
        free.amount = 0u64.into();
        ErrorResponse::payment_required(free).into_response()
    })
    .await;
    let client = client();

    let err = client.send(inference(&client, &server)).await.unwrap_err();
    assert!(matches!(err, HandshakeError::MalformedResponse(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_requirements_are_not_paid() {
    let verifier = spawn_verifier(VerifierConfig::builder().build()).await;
    let expired_terms = terms(verifier);
    let hits = Arc::new(AtomicUsize::new(0));
    let server = spawn_counting(hits.clone(), move || {
        let long_ago: Timestamp = serde_json::from_value(json!("2020-01-01T00:00:00.000Z")).unwrap();
        ErrorResponse::payment_required(expired_terms.issue_at(long_ago)).into_response()
    })
    .await;
    let client = client();

    let err = client.send(inference(&client, &server)).await.unwrap_err();
    assert!(matches!(err, HandshakeError::RequirementExpired { .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn verifier_rejections_abort_the_handshake() {
    let verifier = spawn_verifier(VerifierConfig::builder().mode(Mode::Devnet).build()).await;
    let hits = Arc::new(AtomicUsize::new(0));
    let challenge_terms = terms(verifier);
    let server = spawn_counting(hits.clone(), move || {
        ErrorResponse::payment_required(challenge_terms.issue()).into_response()
    })
    .await;
    let client = client();

    let err = client.send(inference(&client, &server)).await.unwrap_err();
    match err {
        HandshakeError::VerificationFailed { code, .. } => assert_eq!(code, "unsupported_mode"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn verifier_override_wins_over_the_advertised_endpoint() {
    let verifier = spawn_verifier(VerifierConfig::builder().build()).await;
    // Nothing listens on the discard port.
    let server = spawn_server(Url::parse("http://127.0.0.1:9/verify").unwrap(), vec![Mode::Mock]).await;

    let client = PaymentClient::builder()
        .proof_builder(MockProofBuilder::new())
        .verifier_override(verifier)
        .build();

    let paid = client.send(inference(&client, &server)).await.unwrap();
    assert_eq!(paid.response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn unreachable_verifier_is_a_transport_failure() {
    let server = spawn_server(Url::parse("http://127.0.0.1:9/verify").unwrap(), vec![Mode::Mock]).await;
    let client = client();

    let err = client.send(inference(&client, &server)).await.unwrap_err();
    assert!(matches!(
        err,
        HandshakeError::Transport {
            stage: Stage::Verify,
            ..
        }
    ));
}

#[tokio::test]
async fn slow_verifier_times_out() {
    let slow = Router::new().route(
        "/verify",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late"
        }),
    );
    let verifier = spawn(slow).await;
    let server = spawn_server(
        Url::parse(&format!("http://{verifier}/verify")).unwrap(),
        vec![Mode::Mock],
    )
    .await;

    let client = PaymentClient::builder()
        .proof_builder(MockProofBuilder::new())
        .timeout(Duration::from_millis(300))
        .build();

    let err = client.send(inference(&client, &server)).await.unwrap_err();
    assert!(matches!(err, HandshakeError::Timeout(Stage::Verify)));
}

#[tokio::test]
async fn stale_payment_headers_are_dropped() {
    let verifier = spawn_verifier(VerifierConfig::builder().build()).await;
    let server = spawn_server(verifier, vec![Mode::Mock]).await;
    let client = client();

    let mut request = inference(&client, &server);
    request
        .headers_mut()
        .insert(PAYMENT_HEADER, "mock-sig:stale".parse().unwrap());

    let paid = client.send(request).await.unwrap();
    assert_eq!(paid.response.status(), reqwest::StatusCode::OK);
    let receipt = paid.receipt.expect("a fresh payment cycle ran");
    assert_ne!(receipt.token.as_str(), "mock-sig:stale");
}

#[tokio::test]
async fn verifier_lookup_admits_only_issued_tokens() {
    let verifier = spawn_verifier(VerifierConfig::builder().build()).await;
    let server = ResourceServer::new(
        ResourceServerConfig::builder()
            .terms(terms(verifier.clone()))
            .token_check(TokenCheck::VerifierLookup(RemoteVerifierClient::from_url(
                verifier,
            )))
            .build(),
    )
    .unwrap();
    let addr = spawn(server_router(server)).await;
    let server = Url::parse(&format!("http://{addr}/")).unwrap();
    let client = client();

    // Well-formed but never issued.
    let forged = client
        .http
        .post(server.join("inference").unwrap())
        .header(PAYMENT_HEADER, "mock-sig:0000000000000000")
        .json(&json!({"prompt": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), reqwest::StatusCode::FORBIDDEN);
    let body: Value = forged.json().await.unwrap();
    assert_eq!(body["error"], json!("invalid_payment"));

    let paid = client.send(inference(&client, &server)).await.unwrap();
    assert_eq!(paid.response.status(), reqwest::StatusCode::OK);
    assert!(paid.receipt.is_some());
}
