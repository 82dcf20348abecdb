//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Sub-tipos de fallo del proveedor de pagos
///
/// Distinguimos rate-limit, conectividad y errores internos para que
/// el caller pueda decidir si reintentar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentProviderKind {
    RateLimited,
    Connectivity,
    Internal,
}

impl std::fmt::Display for PaymentProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentProviderKind::RateLimited => write!(f, "rate limited"),
            PaymentProviderKind::Connectivity => write!(f, "connectivity"),
            PaymentProviderKind::Internal => write!(f, "internal"),
        }
    }
}

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Hash error: {0}")]
    Hash(String),

    // Errores de dominio del ciclo de vida de alquileres
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("No cars available for selected dates")]
    NoAvailability,

    #[error("You have pending payments. Please pay them before renting a new car")]
    PendingPaymentExists,

    #[error("You cannot rent more than {0} cars at the same time")]
    RentalLimitExceeded(u32),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Payment provider error ({kind}): {message}")]
    PaymentProvider {
        kind: PaymentProviderKind,
        message: String,
    },

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl AppError {
    fn response_parts(self) -> (StatusCode, ErrorResponse) {
        match self {
            AppError::Database(e) => {
                log::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Database Error".to_string(),
                        message: "An error occurred while accessing the database".to_string(),
                        details: None,
                        code: Some("DB_ERROR".to_string()),
                    },
                )
            }

            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code: Some("VALIDATION_ERROR".to_string()),
                },
            ),

            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "Unauthorized".to_string(),
                    message: msg,
                    details: None,
                    code: Some("UNAUTHORIZED".to_string()),
                },
            ),

            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: "Forbidden".to_string(),
                    message: msg,
                    details: None,
                    code: Some("FORBIDDEN".to_string()),
                },
            ),

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "Not Found".to_string(),
                    message: msg,
                    details: None,
                    code: Some("NOT_FOUND".to_string()),
                },
            ),

            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "Conflict".to_string(),
                    message: msg,
                    details: None,
                    code: Some("CONFLICT".to_string()),
                },
            ),

            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Bad Request".to_string(),
                    message: msg,
                    details: None,
                    code: Some("BAD_REQUEST".to_string()),
                },
            ),

            AppError::Internal(msg) => {
                log::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal Server Error".to_string(),
                        message: "An unexpected error occurred".to_string(),
                        details: None,
                        code: Some("INTERNAL_ERROR".to_string()),
                    },
                )
            }

            AppError::Jwt(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "JWT Error".to_string(),
                    message: msg,
                    details: None,
                    code: Some("JWT_ERROR".to_string()),
                },
            ),

            AppError::Hash(msg) => {
                log::error!("Hash error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Hash Error".to_string(),
                        message: "An error occurred while processing credentials".to_string(),
                        details: None,
                        code: Some("HASH_ERROR".to_string()),
                    },
                )
            }

            AppError::InvalidDateRange(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: msg,
                    details: Some(json!({ "field": "dates" })),
                    code: Some("INVALID_DATE_RANGE".to_string()),
                },
            ),

            AppError::NoAvailability => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "No cars available for selected dates".to_string(),
                    details: Some(json!({ "field": "car" })),
                    code: Some("NO_AVAILABILITY".to_string()),
                },
            ),

            AppError::PendingPaymentExists => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "You have pending payments. Please pay them before renting a new car"
                        .to_string(),
                    details: None,
                    code: Some("PENDING_PAYMENT_EXISTS".to_string()),
                },
            ),

            AppError::RentalLimitExceeded(limit) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: format!("You cannot rent more than {} cars at the same time", limit),
                    details: Some(json!({ "limit": limit })),
                    code: Some("RENTAL_LIMIT_EXCEEDED".to_string()),
                },
            ),

            AppError::InvalidState(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Invalid State".to_string(),
                    message: msg,
                    details: None,
                    code: Some("INVALID_STATE".to_string()),
                },
            ),

            AppError::PaymentProvider { kind, message } => {
                log::error!("Payment provider error ({}): {}", kind, message);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse {
                        error: "Payment Provider Error".to_string(),
                        message: "An error occurred while communicating with the payment provider"
                            .to_string(),
                        details: Some(json!({ "kind": kind.to_string() })),
                        code: Some("PAYMENT_PROVIDER_ERROR".to_string()),
                    },
                )
            }

            AppError::InvalidSignature(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Invalid Signature".to_string(),
                    message: msg,
                    details: None,
                    code: Some("INVALID_SIGNATURE".to_string()),
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.response_parts();
        (status, Json(error_response)).into_response()
    }
}
