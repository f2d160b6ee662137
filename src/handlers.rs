use crate::config::Config;
use crate::errors::AppError;
use crate::insights::{InsightTable, InsightsReport};
use crate::models::*;
use crate::services::{InsightsService, MetricsService, QuoteService};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Quote pipeline; `None` while the model or the dataset is unavailable.
    pub quotes: Option<QuoteService>,
    /// Reference-population views; `None` while the dataset is unavailable.
    pub insights: Option<InsightsService>,
    /// Model metadata; `None` while the model is unavailable.
    pub metrics: Option<MetricsService>,
    /// Startup load outcome of each component.
    pub readiness: Readiness,
}

impl AppState {
    fn quotes(&self) -> Result<&QuoteService, AppError> {
        self.quotes.as_ref().ok_or_else(|| {
            if !self.readiness.model.is_ready() {
                AppError::ModelUnavailable(unavailable_reason(&self.readiness.model))
            } else {
                AppError::ServiceUnavailable("Reference dataset is not loaded".to_string())
            }
        })
    }

    fn insights(&self) -> Result<&InsightsService, AppError> {
        self.insights.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("Reference dataset is not loaded".to_string())
        })
    }

    fn metrics(&self) -> Result<&MetricsService, AppError> {
        self.metrics
            .as_ref()
            .ok_or_else(|| AppError::ModelUnavailable(unavailable_reason(&self.readiness.model)))
    }
}

fn unavailable_reason(component: &ComponentHealth) -> String {
    component
        .detail
        .clone()
        .unwrap_or_else(|| "not loaded".to_string())
}

// ============ Service Endpoints ============

/// Health check endpoint.
///
/// Always answers 200 while the process is up; `status` is "degraded" when the model
/// or the dataset failed to load.
///
/// # Returns
///
/// * `Json<HealthResponse>` - Service status and per-component readiness.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let healthy = state.readiness.model.is_ready() && state.readiness.dataset.is_ready();
    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        components: state.readiness.clone(),
    })
}

/// GET /
///
/// Service index listing the public endpoints.
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        status: "online",
        message: "Car Insurance API - Premium Estimation & Insights",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "/api/get-quote",
            "/api/insights",
            "/api/insights/:section",
            "/api/model-metrics",
            "/api/compare-brands",
            "/api/savings-tips",
        ],
    })
}

// ============ Quote Endpoints ============

/// POST /api/get-quote
///
/// Prices the request and returns the itemized quote with its explanation and
/// population comparison.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - JSON body with the applicant and vehicle attributes.
///
/// # Returns
///
/// * `Result<Json<Quote>, AppError>` - The quote, a 400 naming the offending field, or
///   a 503 while the model or dataset is unavailable.
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QuoteRequestBody>, JsonRejection>,
) -> Result<Json<Quote>, AppError> {
    let Json(body) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    tracing::info!(
        "POST /get-quote - make: {:?}, plan: {:?}",
        body.vehicle_make,
        body.plan
    );

    let quote = state.quotes()?.quote(&body)?;
    Ok(Json(quote))
}

// ============ Insights Endpoints ============

/// GET /api/insights
///
/// Every insights section keyed by its name. Sections are computed on first access and
/// cached for the process lifetime.
///
/// # Arguments
///
/// * `state` - The application state.
///
/// # Returns
///
/// * `Result<Json<InsightsReport>, AppError>` - All sections, or 503 without a dataset.
pub async fn insights(
    State(state): State<Arc<AppState>>,
) -> Result<Json<InsightsReport>, AppError> {
    tracing::info!("GET /insights");
    let report = state.insights()?.report().await;
    Ok(Json(report))
}

/// GET /api/insights/:section
///
/// # Arguments
///
/// * `state` - The application state.
/// * `section` - Section name such as `brand_comparison` or `smoking_impact`.
///
/// # Returns
///
/// * `Result<Json<InsightTable>, AppError>` - The section, or 404 for an unknown name.
pub async fn insights_section(
    State(state): State<Arc<AppState>>,
    Path(section): Path<String>,
) -> Result<Json<InsightTable>, AppError> {
    tracing::info!("GET /insights/{}", section);
    let table = state
        .insights()?
        .section(&section)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No insights section named '{}'", section)))?;
    Ok(Json(table.as_ref().clone()))
}

/// GET /api/compare-brands
///
/// Per-brand mean, minimum and maximum monthly premium.
pub async fn compare_brands(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BrandComparisonResponse>, AppError> {
    tracing::info!("GET /compare-brands");
    Ok(Json(state.insights()?.compare_brands().await))
}

/// POST /api/savings-tips
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - Partial profile (vehicle_make, smoker, annual_mileage, fuel_type,
///   usage_type), every field optional.
///
/// # Returns
///
/// * `Result<Json<SavingsTipsResponse>, AppError>` - Tips that apply to the profile with
///   the savings measured on the reference population.
pub async fn savings_tips(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SavingsTipsRequest>, JsonRejection>,
) -> Result<Json<SavingsTipsResponse>, AppError> {
    let Json(body) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    tracing::info!("POST /savings-tips - params: {:?}", body);

    let response = state.insights()?.savings_tips(&body).await?;
    tracing::info!(
        "Returning {} savings tips worth ₹{}/month",
        response.tips.len(),
        response.total_potential_savings
    );
    Ok(Json(response))
}

// ============ Model Endpoints ============

/// GET /api/model-metrics
///
/// Evaluation metrics, feature importance and training metadata of the loaded model.
pub async fn model_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelMetricsResponse>, AppError> {
    tracing::info!("GET /model-metrics");
    Ok(Json(state.metrics()?.metrics()))
}

// ============ API Documentation ============

/// Serves the OpenAPI specification YAML file.
///
/// This endpoint reads the `openapi.yml` file from the filesystem and serves it
/// with the appropriate content type. If the file is not found, it returns a 404 error.
///
/// # Returns
///
/// * `impl IntoResponse` - The HTTP response containing the OpenAPI YAML content or an error message.
pub async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("openapi.yml not readable: {}", e);
            (StatusCode::NOT_FOUND, "OpenAPI spec not found").into_response()
        }
    }
}

/// Serves the Swagger UI HTML page.
///
/// The page loads the OpenAPI document served by `serve_openapi_spec`.
pub async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Car Quote Engine - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}
