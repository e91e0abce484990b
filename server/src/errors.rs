// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use orderdesk::RelayError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Relay(#[from] RelayError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

/// Upstream bodies are passed through as JSON when they parse, else as text.
fn upstream_body(body: &str) -> serde_json::Value {
  serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

impl AppError {
  fn relay_status(err: &RelayError) -> StatusCode {
    match err {
      RelayError::Validation(_) => StatusCode::BAD_REQUEST,
      RelayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
      RelayError::OrderNotFound(_) => StatusCode::NOT_FOUND,
      RelayError::UpstreamRejected { status, .. } => {
        StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
      }
      RelayError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
      RelayError::ChargeReferenceMissing { .. } => StatusCode::UNPROCESSABLE_ENTITY,
      RelayError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      RelayError::MalformedTimestamp { .. }
      | RelayError::MalformedRecord { .. }
      | RelayError::HandlerMissing { .. }
      | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn relay_body(err: &RelayError) -> serde_json::Value {
    match err {
      RelayError::Validation(m) | RelayError::AuthenticationFailed(m) | RelayError::Payment(m) => {
        json!({"error": m})
      }
      RelayError::OrderNotFound(_) | RelayError::ChargeReferenceMissing { .. } => json!({"error": err.to_string()}),
      RelayError::UpstreamRejected { body, .. } => json!({
        "error": "Order source rejected the update",
        "details": upstream_body(body),
      }),
      RelayError::UpstreamUnavailable { status, body } => json!({
        "error": "Failed to fetch orders",
        "upstream_status": status,
        "details": upstream_body(body),
      }),
      RelayError::MalformedTimestamp { .. }
      | RelayError::MalformedRecord { .. }
      | RelayError::HandlerMissing { .. }
      | RelayError::Internal(_) => json!({"error": "An internal error occurred", "detail": err.to_string()}),
    }
  }

  fn body(&self) -> serde_json::Value {
    match self {
      AppError::Validation(m) | AppError::Auth(m) => json!({"error": m}),
      AppError::Config(m) => json!({"error": "Configuration issue", "detail": m}),
      AppError::Relay(err) => Self::relay_body(err),
      AppError::Internal(m) => json!({"error": "An internal error occurred", "detail": m}),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Relay(err) => Self::relay_status(err),
    }
  }

  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    HttpResponse::build(self.status_code()).json(self.body())
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
