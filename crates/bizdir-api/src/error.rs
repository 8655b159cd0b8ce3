//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"error": {"code": "...", "message": "..."}}`.
//! Codes are stable; messages are for humans.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bizdir_core::{Classify, ErrorKind};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  /// No usable caller identity on the request.
  #[error("missing or malformed x-company-id header")]
  Unauthenticated,

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Duplicate(String),

  #[error("{0}")]
  InvalidTransition(String),

  #[error("{0}")]
  Forbidden(String),

  /// The viewer asked for details it is not entitled to.
  #[error("company {0} has not accepted a connection with the viewer")]
  NotConnected(Uuid),

  #[error("the directory store is temporarily unavailable")]
  Unavailable,

  #[error("internal server error")]
  Internal,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
  error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
  code:    &'static str,
  message: String,
}

impl ApiError {
  /// Translate a classified store or domain error.
  ///
  /// Internal failures are logged here and replaced by a generic message so
  /// no database text reaches the client.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + Classify,
  {
    match err.kind() {
      ErrorKind::Validation => Self::BadRequest(err.to_string()),
      ErrorKind::NotFound => Self::NotFound(err.to_string()),
      ErrorKind::Duplicate => Self::Duplicate(err.to_string()),
      ErrorKind::InvalidTransition => Self::InvalidTransition(err.to_string()),
      ErrorKind::Forbidden => Self::Forbidden(err.to_string()),
      ErrorKind::Unavailable => {
        tracing::warn!(error = %err, "store unavailable");
        Self::Unavailable
      }
      ErrorKind::Internal => {
        tracing::error!(error = %err, "store failure");
        Self::Internal
      }
    }
  }

  pub const fn status_code(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Unauthenticated => StatusCode::UNAUTHORIZED,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Duplicate(_) | Self::InvalidTransition(_) => StatusCode::CONFLICT,
      Self::Forbidden(_) | Self::NotConnected(_) => StatusCode::FORBIDDEN,
      Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
      Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  pub const fn code(&self) -> &'static str {
    match self {
      Self::BadRequest(_) => "validation_error",
      Self::Unauthenticated => "unauthenticated",
      Self::NotFound(_) => "not_found",
      Self::Duplicate(_) => "duplicate_request",
      Self::InvalidTransition(_) => "invalid_transition",
      Self::Forbidden(_) => "forbidden",
      Self::NotConnected(_) => "not_connected",
      Self::Unavailable => "store_unavailable",
      Self::Internal => "internal_error",
    }
  }
}

// ─── Extractor rejections ────────────────────────────────────────────────────

// Parser output is logged, never returned.

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    tracing::debug!(error = %rejection, "rejected request body");
    let message = match rejection {
      JsonRejection::MissingJsonContentType(_) => {
        "expected an application/json request body"
      }
      JsonRejection::JsonSyntaxError(_) => "request body is not valid JSON",
      JsonRejection::JsonDataError(_) => {
        "request body is missing a field or has a field of the wrong type"
      }
      _ => "could not read the request body",
    };
    Self::BadRequest(message.to_owned())
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    tracing::debug!(error = %rejection, "rejected path parameter");
    Self::BadRequest("malformed path parameter".to_owned())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    tracing::debug!(error = %rejection, "rejected query string");
    Self::BadRequest("malformed or incomplete query string".to_owned())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = ErrorResponse {
      error: ErrorBody { code: self.code(), message: self.to_string() },
    };
    (self.status_code(), Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn domain_errors_keep_their_message() {
    let id = Uuid::new_v4();
    let err = ApiError::from_store(bizdir_core::Error::CompanyNotFound(id));
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(err.code(), "not_found");
    assert!(err.to_string().contains(&id.to_string()));
  }

  #[test]
  fn not_receiver_is_forbidden() {
    let err = ApiError::from_store(bizdir_core::Error::NotReceiver(Uuid::new_v4()));
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(err.code(), "forbidden");
  }

  #[test]
  fn self_connection_is_a_validation_error() {
    let err = ApiError::from_store(bizdir_core::Error::SelfConnection);
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.code(), "validation_error");
  }
}
