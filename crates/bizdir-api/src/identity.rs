//! Caller identity.
//!
//! Authentication happens upstream. By the time a request reaches this
//! router, the authenticated company is named in the `x-company-id` header.

use axum::{
  extract::{FromRequestParts, OptionalFromRequestParts},
  http::request::Parts,
};
use uuid::Uuid;

use crate::error::ApiError;

pub const VIEWER_HEADER: &str = "x-company-id";

/// The company on whose behalf a request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer(pub Uuid);

impl Viewer {
  /// Refuse unless the caller is `company`.
  pub fn ensure_is(self, company: Uuid) -> Result<(), ApiError> {
    if self.0 == company {
      Ok(())
    } else {
      Err(ApiError::Forbidden(format!(
        "company {} may not act on behalf of company {company}",
        self.0
      )))
    }
  }
}

/// `Ok(None)` when the header is absent; an error when it is present but
/// not a UUID.
fn from_headers(parts: &Parts) -> Result<Option<Viewer>, ApiError> {
  let Some(value) = parts.headers.get(VIEWER_HEADER) else {
    return Ok(None);
  };
  value
    .to_str()
    .ok()
    .and_then(|s| Uuid::parse_str(s.trim()).ok())
    .map(|id| Some(Viewer(id)))
    .ok_or(ApiError::Unauthenticated)
}

impl<S> FromRequestParts<S> for Viewer
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    from_headers(parts)?.ok_or(ApiError::Unauthenticated)
  }
}

impl<S> OptionalFromRequestParts<S> for Viewer
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Option<Self>, Self::Rejection> {
    from_headers(parts)
  }
}
