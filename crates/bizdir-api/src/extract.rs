//! Input extractors whose rejections render through [`ApiError`].
//!
//! axum's own `Json`, `Path` and `Query` reject with plain-text bodies that
//! quote serde and UUID parser output. These wrappers keep the
//! `{"error": {...}}` envelope on malformed input.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);
