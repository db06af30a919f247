use parley_api::app::{app, AppState};
use parley_api::auth::TokenKeys;
use parley_api::config;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up SECURITY_TOKEN_SECRET etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting Parley API in {:?} mode", config.environment);

    let token_keys = TokenKeys::from_config().expect("token keys");
    let (state, platform) = AppState::in_memory(token_keys);

    // Demo fixtures for the in-memory backend: one user reachable through the
    // login code exchange.
    let demo = platform.seed_user("demo", "demo@parley.example.com", "Demo User");
    platform.register_login_code("demo-code", demo.id);
    tracing::info!(user = %demo.id, "seeded demo user (login code: demo-code)");

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("PARLEY_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(config.server.port);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Parley API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
