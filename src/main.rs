use axum::Router;
use chrono::Utc;
use std::time::Duration;
use tickscope::{api, config::Config, AppState};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickscope=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!("Starting tickscope on {}:{}", config.host, config.port);
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState::new(config);

    // Periodic composer pass over every tracked symbol
    {
        let state = state.clone();
        let interval = Duration::from_millis(state.config.composer.interval_ms.max(1));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let history = state.history.clone();
                let composer = state.composer.clone();
                let signal_store = state.signal_store.clone();
                let result = tokio::task::spawn_blocking(move || {
                    signal_store.refresh(&composer, &history, Utc::now())
                })
                .await;
                match result {
                    Ok(live) => debug!("Composer pass done, {} live signals", live),
                    Err(e) => tracing::error!("Composer pass panicked: {}", e),
                }
            }
        });
    }

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("tickscope listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
