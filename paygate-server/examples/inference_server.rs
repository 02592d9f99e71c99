use std::time::Duration;

use paygate_core::{
    requirement::RequirementTerms, token::Mode, verifier_client::RemoteVerifierClient,
};
use paygate_server::{
    config::{ResourceServerConfig, TokenCheck},
    gate::ResourceServer,
    router::router,
};
use tower_http::trace::TraceLayer;
use url::Url;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let verifier_url = std::env::var("VERIFIER_URL")
        .unwrap_or_else(|_| "http://localhost:3000/verify".to_string());
    let verifier_url = Url::parse(&verifier_url).expect("VERIFIER_URL must be a valid URL");

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3001".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid u16 integer");

    let price = std::env::var("PRICE")
        .unwrap_or_else(|_| "1000".to_string())
        .parse::<u64>()
        .expect("PRICE must be a positive integer in minor units");

    let currency = std::env::var("CURRENCY").unwrap_or_else(|_| "USDC".to_string());

    let validity = std::env::var("VALIDITY_SECONDS")
        .unwrap_or_else(|_| "300".to_string())
        .parse::<u64>()
        .map(Duration::from_secs)
        .expect("VALIDITY_SECONDS must be an integer");

    // Devnet tokens are only honoured when the server itself runs in devnet mode.
    let mode = std::env::var("MODE")
        .unwrap_or_else(|_| "mock".to_string())
        .parse::<Mode>()
        .expect("MODE must be 'mock' or 'devnet'");
    let accepted_modes = match mode {
        Mode::Mock => vec![Mode::Mock],
        Mode::Devnet => vec![Mode::Mock, Mode::Devnet],
    };

    let token_check = match std::env::var("TOKEN_LOOKUP").as_deref() {
        Ok("1") | Ok("true") => {
            TokenCheck::VerifierLookup(RemoteVerifierClient::from_url(verifier_url.clone()))
        }
        _ => TokenCheck::Prefix,
    };

    let server = ResourceServer::new(
        ResourceServerConfig::builder()
            .port(port)
            .terms(
                RequirementTerms::builder()
                    .product("ai-inference")
                    .amount(price)
                    .currency(currency)
                    .verifier_endpoint(verifier_url.clone())
                    .validity_window(validity)
                    .maybe_recipient(std::env::var("SETTLEMENT_ADDRESS").ok())
                    .build(),
            )
            .accepted_modes(accepted_modes)
            .token_check(token_check)
            .build(),
    )
    .expect("Invalid resource server configuration");

    tracing::info!("Using verifier at {}", verifier_url);

    let app = router(server).layer(TraceLayer::new_for_http());

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server running at http://{}", addr);
    axum::serve(listener, app).await.expect("Server failed");
}
