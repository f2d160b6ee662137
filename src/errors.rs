use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Errors raised by the quoting pipeline itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    /// Malformed, missing or out-of-range request field.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },
    /// Vehicle make outside the closed brand set.
    #[error("unknown vehicle make '{value}'")]
    UnknownBrand { value: String },
    /// Pricing model failed to load at startup.
    #[error("pricing model unavailable: {0}")]
    ModelUnavailable(String),
}

impl QuoteError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        QuoteError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Application-specific error types returned by the HTTP handlers.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Request field failed validation.
    Validation { field: String, message: String },
    /// Vehicle make is not part of the rated brand set.
    UnknownBrand(String),
    /// Body could not be parsed at all.
    BadRequest(String),
    /// Unknown resource, e.g. an insights section that does not exist.
    NotFound(String),
    /// Pricing model is not loaded; quotes cannot be served.
    ModelUnavailable(String),
    /// A component other than the model (e.g. the reference dataset) is not loaded.
    ServiceUnavailable(String),
    /// Internal server error.
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation { field, message } => {
                write!(f, "Validation error on {}: {}", field, message)
            }
            AppError::UnknownBrand(value) => write!(f, "Unknown vehicle make: {}", value),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ModelUnavailable(msg) => write!(f, "Model unavailable: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and a JSON body of the form
    /// `{"error": code, "message": text, "field": name?}`.
    fn into_response(self) -> Response {
        let (status, code, message, field) = match self {
            AppError::Validation { field, message } => {
                tracing::debug!("Rejected quote request: {} ({})", message, field);
                (
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    message,
                    Some(field),
                )
            }
            AppError::UnknownBrand(value) => (
                StatusCode::BAD_REQUEST,
                "unknown_brand",
                format!("vehicle_make '{}' is not a supported brand", value),
                Some("vehicle_make".to_string()),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            AppError::ModelUnavailable(msg) => {
                tracing::warn!("Quote refused, model unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "model_unavailable",
                    "Pricing model is not loaded".to_string(),
                    None,
                )
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Request refused, component unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    msg,
                    None,
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": code,
            "message": message,
        });
        if let Some(field) = field {
            body["field"] = json!(field);
        }

        (status, Json(body)).into_response()
    }
}

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::Validation { field, message } => AppError::Validation {
                field: field.to_string(),
                message,
            },
            QuoteError::UnknownBrand { value } => AppError::UnknownBrand(value),
            QuoteError::ModelUnavailable(msg) => AppError::ModelUnavailable(msg),
        }
    }
}
