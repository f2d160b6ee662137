use crate::handlers::{self, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted request body. Quote bodies are a few hundred bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Per-IP token bucket applied to every route except `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub per_second: u64,
    pub burst: u32,
}

/// Builds the HTTP router.
///
/// `rate_limit` is `None` in tests driven through `oneshot`, where there is no peer
/// address for the key extractor to read.
pub fn build_router(
    state: Arc<AppState>,
    rate_limit: Option<RateLimitSettings>,
) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // API Documentation
        .route("/", get(handlers::index))
        .route("/docs", get(handlers::serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(handlers::serve_openapi_spec))
        // Quote endpoints
        .route("/api/get-quote", post(handlers::get_quote))
        // Insights endpoints
        .route("/api/insights", get(handlers::insights))
        .route("/api/insights/:section", get(handlers::insights_section))
        .route("/api/compare-brands", get(handlers::compare_brands))
        .route("/api/savings-tips", post(handlers::savings_tips))
        // Model endpoints
        .route("/api/model-metrics", get(handlers::model_metrics))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    let protected_routes = match rate_limit {
        Some(settings) => {
            let governor_conf = Arc::new(
                GovernorConfigBuilder::default()
                    .per_second(settings.per_second)
                    .burst_size(settings.burst)
                    .key_extractor(SmartIpKeyExtractor)
                    .finish()
                    .ok_or_else(|| {
                        anyhow::anyhow!("invalid rate limit settings: {:?}", settings)
                    })?,
            );
            tracing::info!(
                "Rate limiting: {} req/sec per IP, burst of {}",
                settings.per_second,
                settings.burst
            );
            api_routes.layer(ServiceBuilder::new().layer(GovernorLayer {
                config: governor_conf,
            }))
        }
        None => api_routes,
    };

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Ok(app)
}
