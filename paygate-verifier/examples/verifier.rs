use paygate_core::token::Mode;
use paygate_verifier::{
    router::router,
    settlement::SOLANA_DEVNET_RPC,
    verifier::{LocalVerifier, VerifierConfig},
};
use tower_http::trace::TraceLayer;
use url::Url;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid u16 integer");

    let mode = std::env::var("MODE")
        .unwrap_or_else(|_| "mock".to_string())
        .parse::<Mode>()
        .expect("MODE must be 'mock' or 'devnet'");

    let rpc_url = match mode {
        Mode::Mock => None,
        Mode::Devnet => {
            let url = std::env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| SOLANA_DEVNET_RPC.to_string());
            Some(Url::parse(&url).expect("SOLANA_RPC_URL must be a valid URL"))
        }
    };

    let dedupe = matches!(
        std::env::var("DEDUPE_BY_REQUEST_ID").as_deref(),
        Ok("1") | Ok("true")
    );

    let config = VerifierConfig {
        dedupe_by_request_id: dedupe,
        ..VerifierConfig::builder()
            .port(port)
            .mode(mode)
            .maybe_rpc_url(rpc_url)
            .build()
    };

    tracing::info!("Verifier running in {} mode", config.mode);

    let app = router(LocalVerifier::from_config(config)).layer(TraceLayer::new_for_http());

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server running at http://{}", addr);
    axum::serve(listener, app).await.expect("Server failed");
}
