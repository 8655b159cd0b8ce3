//! Handlers for `/search` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/search/business` | Body: [`BusinessBody`]; `x-company-id`, if sent, must equal `compid`; audit record written in the background |
//! | `POST` | `/search/describe` | Body: `{"compid":"..."}`; tier decided from the viewer's connections |
//! | `POST` | `/search/compdet` | Detail text, or 403 `not_connected` |
//! | `POST` | `/search/compsum` | Summary text; no viewer needed |

use std::sync::Arc;

use axum::{Json, extract::State};
use bizdir_core::{
  search::{SearchCriteria, SearchRow, search},
  store::DirectoryStore,
  visibility::{CompanyDescription, Disclosure, describe, summarize},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, extract::JsonBody, identity::Viewer};

// ─── Business search ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BusinessBody {
  /// The person searching; recorded in the audit log.
  pub userid:       Uuid,
  /// The company searching; decides the `status` column.
  pub compid:       Uuid,
  #[serde(default)]
  pub category:     String,
  #[serde(default)]
  pub location:     String,
  #[serde(default)]
  pub businesstype: String,
}

/// `POST /search/business`
///
/// When the caller identifies itself, it must be the searching company.
pub async fn business<S>(
  State(store): State<Arc<S>>,
  viewer: Option<Viewer>,
  JsonBody(body): JsonBody<BusinessBody>,
) -> Result<Json<Vec<SearchRow>>, ApiError>
where
  S: DirectoryStore + 'static,
{
  if let Some(viewer) = viewer {
    viewer.ensure_is(body.compid)?;
  }
  let criteria =
    SearchCriteria::new(body.category, body.location, body.businesstype)
      .map_err(ApiError::from_store)?;

  spawn_audit(Arc::clone(&store), body.userid, criteria.clone());

  let rows = search(store.as_ref(), body.compid, &criteria)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

/// Record the search on a detached task. The response never waits for it,
/// and a failed write is only logged.
fn spawn_audit<S>(store: Arc<S>, user_id: Uuid, criteria: SearchCriteria)
where
  S: DirectoryStore + 'static,
{
  tokio::spawn(async move {
    if let Err(e) = store.record_search(user_id, criteria).await {
      tracing::warn!(%user_id, error = %e, "search audit write failed");
    }
  });
}

// ─── Descriptions ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CompanyBody {
  pub compid: Uuid,
}

/// `POST /search/describe`
pub async fn describe_one<S>(
  State(store): State<Arc<S>>,
  Viewer(viewer): Viewer,
  JsonBody(body): JsonBody<CompanyBody>,
) -> Result<Json<CompanyDescription>, ApiError>
where
  S: DirectoryStore + 'static,
{
  let description = describe(store.as_ref(), viewer, body.compid)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(description))
}

#[derive(Debug, Serialize)]
pub struct DetailsResponse {
  pub details: String,
}

/// `POST /search/compdet`
pub async fn details<S>(
  State(store): State<Arc<S>>,
  Viewer(viewer): Viewer,
  JsonBody(body): JsonBody<CompanyBody>,
) -> Result<Json<DetailsResponse>, ApiError>
where
  S: DirectoryStore + 'static,
{
  let description = describe(store.as_ref(), viewer, body.compid)
    .await
    .map_err(ApiError::from_store)?;
  if description.tier != Disclosure::Detail {
    return Err(ApiError::NotConnected(body.compid));
  }
  Ok(Json(DetailsResponse { details: description.text }))
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
  pub summary: String,
}

/// `POST /search/compsum`
pub async fn summary<S>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<CompanyBody>,
) -> Result<Json<SummaryResponse>, ApiError>
where
  S: DirectoryStore + 'static,
{
  let description = summarize(store.as_ref(), body.compid)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(SummaryResponse { summary: description.text }))
}
