//! API error taxonomy and the single JSON error-envelope formatter.
//!
//! Every failure surfaced by the HTTP layer is one of these variants; the
//! [`IntoResponse`] implementation is the only place an error is turned
//! into a wire response, so no typed error ever reaches the transport
//! unconverted.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by any handler, extractor, or middleware.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing/invalid identity, or insufficient role.
  #[error("{0}")]
  Auth(String),

  /// Generic denial.
  #[error("{0}")]
  Forbidden(String),

  /// Cross-tenant access attempt, or failure to resolve the caller's
  /// tenant at all.
  #[error("{0}")]
  TenantIsolation(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Validation(String),

  #[error("too many requests")]
  RateLimited {
    /// Seconds until the current window resets.
    retry_after: u64,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a backend error. The message is not forwarded to clients.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    ApiError::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::TenantIsolation(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// The stable machine-readable code carried in the error envelope.
  pub fn code(&self) -> &'static str {
    match self {
      ApiError::Auth(_) => "AUTH_ERROR",
      ApiError::Forbidden(_) => "FORBIDDEN",
      ApiError::TenantIsolation(_) => "TENANT_ISOLATION_ERROR",
      ApiError::NotFound(_) => "NOT_FOUND",
      ApiError::Validation(_) => "VALIDATION_ERROR",
      ApiError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
      ApiError::Store(_) => "INTERNAL_ERROR",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let code = self.code();

    // Backend details stay in the logs, not on the wire.
    let message = match &self {
      ApiError::Store(e) => {
        tracing::error!(error = %e, "request failed on store error");
        "internal error".to_string()
      }
      other => other.to_string(),
    };

    let mut error = json!({ "message": message, "code": code });
    if let ApiError::RateLimited { retry_after } = &self {
      error["details"] = json!({ "retryAfter": retry_after });
    }

    let mut res =
      (status, Json(json!({ "success": false, "error": error })))
        .into_response();

    if let ApiError::RateLimited { retry_after } = &self
      && let Ok(value) = HeaderValue::from_str(&retry_after.to_string())
    {
      res.headers_mut().insert(header::RETRY_AFTER, value);
    }

    res
  }
}
