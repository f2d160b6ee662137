use car_quote_engine::app::{build_router, RateLimitSettings};
use car_quote_engine::bootstrap::build_state;
use car_quote_engine::config::Config;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Reference dataset, pricing model and pricing constants.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Ok if the server runs successfully, or an error if initialization fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "car_quote_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let port = config.port;
    let rate_limit = RateLimitSettings {
        per_second: config.rate_limit_per_second,
        burst: config.rate_limit_burst,
    };

    // Load dataset and model before accepting traffic
    let app_state = build_state(config)?;
    if app_state.readiness.model.is_ready() && app_state.readiness.dataset.is_ready() {
        tracing::info!("✓ Model and reference dataset loaded");
    } else {
        tracing::warn!("Starting in degraded mode: {:?}", app_state.readiness);
    }

    let app = build_router(app_state, Some(rate_limit))?;

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
