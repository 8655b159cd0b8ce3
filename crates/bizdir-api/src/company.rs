//! `PUT /company/{id}/attributes`: replace a company's locations and
//! sub-categories in one step. Only the company itself may do this.
//! Returns 204.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use bizdir_core::{company::ProfileAttributes, store::DirectoryStore};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{JsonBody, PathParam},
  identity::Viewer,
};

pub async fn replace_attributes<S>(
  State(store): State<Arc<S>>,
  viewer: Viewer,
  PathParam(id): PathParam<Uuid>,
  JsonBody(body): JsonBody<ProfileAttributes>,
) -> Result<StatusCode, ApiError>
where
  S: DirectoryStore + 'static,
{
  viewer.ensure_is(id)?;
  store
    .replace_attributes(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
