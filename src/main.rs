use std::sync::Arc;

use maury_portal_api::app::app;
use maury_portal_api::config;
use maury_portal_api::platform::SupabaseClient;
use maury_portal_api::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up PLATFORM_URL, keys, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    let default_directives = if config.server.enable_request_logging {
        "maury_portal_api=debug,tower_http=debug,info"
    } else {
        "maury_portal_api=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives)),
        )
        .init();
    tracing::info!("Starting Maury portal API in {:?} mode", config.environment);

    let platform = SupabaseClient::new(&config.platform, config.realtime.clone())
        .unwrap_or_else(|e| panic!("failed to construct platform client: {}", e));
    let state = AppState::new(Arc::new(platform), config);

    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Maury portal API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
