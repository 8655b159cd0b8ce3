//! Connection requests between companies.
//!
//! A connection is a directed edge from a sender company to a receiver
//! company. It is created `Pending` and moved exactly once, by the receiver,
//! to `Accepted` or `Rejected`.
//!
//! ```text
//!            accept            reject
//!   Accepted ◄────── Pending ──────► Rejected
//! ```
//!
//! Both end states are terminal. Re-applying the action that produced the
//! current end state is a no-op; any other action on a terminal edge is an
//! [`Error::InvalidTransition`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
  Pending,
  Accepted,
  Rejected,
}

impl ConnectionState {
  pub fn is_accepted(self) -> bool { matches!(self, Self::Accepted) }

  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }

  /// The `constatus` mirror flag: `"Y"` for accepted edges, `"N"` otherwise.
  ///
  /// This is the only place the flag is derived; nothing stores or accepts
  /// it independently of the state.
  pub fn constatus(self) -> &'static str {
    if self.is_accepted() { "Y" } else { "N" }
  }
}

// ─── Action ──────────────────────────────────────────────────────────────────

/// What the receiver does with a pending request.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ConnectionAction {
  #[serde(alias = "accept", alias = "ACCEPT")]
  Accept,
  #[serde(alias = "reject", alias = "REJECT")]
  Reject,
}

impl ConnectionAction {
  /// The state an edge ends up in once this action is applied.
  pub fn target(self) -> ConnectionState {
    match self {
      Self::Accept => ConnectionState::Accepted,
      Self::Reject => ConnectionState::Rejected,
    }
  }
}

// ─── Transition planning ─────────────────────────────────────────────────────

/// Outcome of [`plan_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// Move the edge to this state.
  Apply(ConnectionState),
  /// The edge is already where the action would put it.
  Unchanged,
}

/// Decide what `action` does to an edge currently in `current`.
pub fn plan_transition(
  id: Uuid,
  current: ConnectionState,
  action: ConnectionAction,
) -> Result<Transition> {
  let target = action.target();
  match current {
    ConnectionState::Pending => Ok(Transition::Apply(target)),
    done if done == target => Ok(Transition::Unchanged),
    from => Err(Error::InvalidTransition { id, from, action }),
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
  pub connection_id:       Uuid,
  pub sender_company_id:   Uuid,
  pub receiver_company_id: Uuid,
  pub status:              ConnectionState,
  pub message:             String,
  pub reply_message:       Option<String>,
  pub created_at:          DateTime<Utc>,
  /// Set when the receiver acts on the request.
  pub updated_at:          Option<DateTime<Utc>>,
}

impl Connection {
  pub fn constatus(&self) -> &'static str { self.status.constatus() }
}

/// Input for [`DirectoryStore::request_connection`].
///
/// [`DirectoryStore::request_connection`]: crate::store::DirectoryStore::request_connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConnection {
  pub sender_company_id:   Uuid,
  pub receiver_company_id: Uuid,
  #[serde(default)]
  pub message:             String,
}

impl NewConnection {
  /// Reject requests that can never be valid, before touching the store.
  pub fn validate(&self) -> Result<()> {
    if self.sender_company_id == self.receiver_company_id {
      return Err(Error::SelfConnection);
    }
    if self.message.chars().count() > MAX_MESSAGE_LEN {
      return Err(Error::Validation(format!(
        "message exceeds {MAX_MESSAGE_LEN} characters"
      )));
    }
    Ok(())
  }
}

/// Upper bound on request and reply message length.
pub const MAX_MESSAGE_LEN: usize = 1000;

/// Search-result label for the viewer's relationship to a listed company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionLabel {
  #[serde(rename = "Connected")]
  Connected,
  #[serde(rename = "Not Connected")]
  NotConnected,
}

impl ConnectionLabel {
  pub fn from_connected(connected: bool) -> Self {
    if connected { Self::Connected } else { Self::NotConnected }
  }
}
