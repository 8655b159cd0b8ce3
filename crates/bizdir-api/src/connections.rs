//! Handlers for `/connection` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/connection/sendrequest` | Body: [`NewConnection`]; caller must be the sender; returns 201 + connection |
//! | `POST` | `/connection/getconnections` | Body: `{"receiver_company_id":"..."}`; caller must be the receiver; pending, oldest first |
//! | `PUT`  | `/connection/getconnections/{id}` | Body: [`ActBody`]; caller must be the receiver |
//! | `GET`  | `/connection/status` | `?sender=&receiver=`; directional |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use bizdir_core::{
  connection::{Connection, ConnectionAction, ConnectionState, NewConnection},
  store::DirectoryStore,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{JsonBody, PathParam, QueryParams},
  identity::Viewer,
};

/// Wire form of a [`Connection`], carrying the derived `constatus` flag.
#[derive(Debug, Serialize)]
pub struct ConnectionBody {
  pub connection_id:       Uuid,
  pub sender_company_id:   Uuid,
  pub receiver_company_id: Uuid,
  pub status:              ConnectionState,
  pub constatus:           &'static str,
  pub message:             String,
  pub reply_message:       Option<String>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          Option<DateTime<Utc>>,
}

impl From<Connection> for ConnectionBody {
  fn from(c: Connection) -> Self {
    Self {
      constatus:           c.constatus(),
      connection_id:       c.connection_id,
      sender_company_id:   c.sender_company_id,
      receiver_company_id: c.receiver_company_id,
      status:              c.status,
      message:             c.message,
      reply_message:       c.reply_message,
      created_at:          c.created_at,
      updated_at:          c.updated_at,
    }
  }
}

// ─── Send ────────────────────────────────────────────────────────────────────

/// `POST /connection/sendrequest`: returns 201 + the pending connection.
pub async fn send_request<S>(
  State(store): State<Arc<S>>,
  viewer: Viewer,
  JsonBody(body): JsonBody<NewConnection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + 'static,
{
  viewer.ensure_is(body.sender_company_id)?;
  let connection = store
    .request_connection(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(ConnectionBody::from(connection))))
}

// ─── Pending ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PendingBody {
  pub receiver_company_id: Uuid,
}

/// `POST /connection/getconnections`
pub async fn pending<S>(
  State(store): State<Arc<S>>,
  viewer: Viewer,
  JsonBody(body): JsonBody<PendingBody>,
) -> Result<Json<Vec<ConnectionBody>>, ApiError>
where
  S: DirectoryStore + 'static,
{
  viewer.ensure_is(body.receiver_company_id)?;
  let connections = store
    .pending_for(body.receiver_company_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(connections.into_iter().map(ConnectionBody::from).collect()))
}

// ─── Act ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActBody {
  pub action:      ConnectionAction,
  pub replmessage: Option<String>,
}

/// `PUT /connection/getconnections/{id}`
pub async fn act<S>(
  State(store): State<Arc<S>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Uuid>,
  JsonBody(body): JsonBody<ActBody>,
) -> Result<Json<ConnectionBody>, ApiError>
where
  S: DirectoryStore + 'static,
{
  let connection = store
    .act_on_connection(id, viewer, body.action, body.replmessage)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(ConnectionBody::from(connection)))
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusParams {
  pub sender:   Uuid,
  pub receiver: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
  /// `null` when no request was ever sent in this direction.
  pub status:    Option<ConnectionState>,
  pub constatus: &'static str,
}

/// `GET /connection/status?sender=<id>&receiver=<id>`
pub async fn status<S>(
  State(store): State<Arc<S>>,
  QueryParams(params): QueryParams<StatusParams>,
) -> Result<Json<StatusResponse>, ApiError>
where
  S: DirectoryStore + 'static,
{
  let status = store
    .status_of(params.sender, params.receiver)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(StatusResponse {
    status,
    constatus: status.map_or("N", ConnectionState::constatus),
  }))
}
