//! JSON API for the bizdir business directory.
//!
//! Exposes an axum [`Router`] backed by any
//! [`bizdir_core::store::DirectoryStore`]. Authentication and TLS are the
//! caller's responsibility; the authenticated company arrives in the
//! `x-company-id` header (see [`identity::Viewer`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(bizdir_api::api_router(store.clone()))
//! ```

pub mod company;
pub mod connections;
pub mod error;
pub mod extract;
pub mod identity;
pub mod search;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use bizdir_core::store::DirectoryStore;

pub use error::ApiError;
pub use identity::Viewer;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: DirectoryStore + 'static,
{
  Router::new()
    // Search and disclosure
    .route("/search/business", post(search::business::<S>))
    .route("/search/describe", post(search::describe_one::<S>))
    .route("/search/compdet", post(search::details::<S>))
    .route("/search/compsum", post(search::summary::<S>))
    // Connections
    .route("/connection/sendrequest", post(connections::send_request::<S>))
    .route("/connection/getconnections", post(connections::pending::<S>))
    .route("/connection/getconnections/{id}", put(connections::act::<S>))
    .route("/connection/status", get(connections::status::<S>))
    // Profile maintenance
    .route("/company/{id}/attributes", put(company::replace_attributes::<S>))
    .with_state(store)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use bizdir_core::{
    aggregate::AttributeKind,
    company::{
      Category, Company, CompanyProfile, CompanyStatus, Location, NewCompany,
      NewPersonnel, Personnel, ProfileAttributes, Subcategory, TurnoverBand,
    },
    connection::{Connection, ConnectionAction, ConnectionState, NewConnection},
    search::{Listing, SearchCriteria},
  };
  use bizdir_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;
  use crate::identity::VIEWER_HEADER;

  struct Seeded {
    store: SqliteStore,
    alpha: Company,
    beta:  Company,
    pune:  Location,
  }

  async fn seeded() -> Seeded {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let steel = store.add_category("Steel".into()).await.unwrap();
    let band = store
      .add_turnover_band("1 to 5 Crore".into(), "1-5Cr".into())
      .await
      .unwrap();
    let pune = store.add_location("Pune".into()).await.unwrap();

    let mut companies = Vec::new();
    for name in ["Alpha", "Beta"] {
      companies.push(
        store
          .add_company(NewCompany {
            name:         name.into(),
            category_id:  steel.category_id,
            turnover_id:  band.turnover_id,
            founded_year: 2015,
          })
          .await
          .unwrap(),
      );
    }
    let beta = companies.pop().unwrap();
    let alpha = companies.pop().unwrap();

    store
      .add_personnel(NewPersonnel {
        company_id:  beta.company_id,
        name:        "Meera".into(),
        designation: "Partner".into(),
        phone:       "555".into(),
        email:       "meera@beta.example".into(),
      })
      .await
      .unwrap();

    Seeded { store, alpha, beta, pune }
  }

  async fn dispatch(
    router: Router,
    method: &str,
    uri: &str,
    viewer: Option<Uuid>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = viewer {
      builder = builder.header(VIEWER_HEADER, id.to_string());
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    router.oneshot(req).await.unwrap()
  }

  async fn send(
    store: &SqliteStore,
    method: &str,
    uri: &str,
    viewer: Option<Uuid>,
    body: Option<Value>,
  ) -> Response {
    dispatch(api_router(Arc::new(store.clone())), method, uri, viewer, body)
      .await
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  /// Alpha asks Beta to connect; returns the new connection id.
  async fn alpha_requests_beta(s: &Seeded, message: &str) -> String {
    let resp = send(
      &s.store,
      "POST",
      "/connection/sendrequest",
      Some(s.alpha.company_id),
      Some(json!({
        "sender_company_id": s.alpha.company_id,
        "receiver_company_id": s.beta.company_id,
        "message": message,
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await["connection_id"].as_str().unwrap().to_owned()
  }

  async fn request_and_accept(s: &Seeded) -> Value {
    let id = alpha_requests_beta(s, "hello").await;

    let resp = send(
      &s.store,
      "PUT",
      &format!("/connection/getconnections/{id}"),
      Some(s.beta.company_id),
      Some(json!({ "action": "Accept", "replmessage": "welcome" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await
  }

  // ── Search ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn business_search_returns_rows_and_audits() {
    let s = seeded().await;
    let user = Uuid::new_v4();

    let resp = send(
      &s.store,
      "POST",
      "/search/business",
      None,
      Some(json!({
        "userid": user,
        "compid": s.alpha.company_id,
        "category": "steel",
        "location": "",
        "businesstype": "",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rows = json_body(resp).await;
    let names: Vec<&str> = rows
      .as_array()
      .unwrap()
      .iter()
      .map(|r| r["name"].as_str().unwrap())
      .collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    assert_eq!(rows[1]["status"], "Not Connected");
    assert_eq!(rows[1]["turnover"], "1 to 5 Crore");

    // The audit write runs on its own task.
    let mut log = Vec::new();
    for _ in 0..50 {
      log = s.store.search_log().await.unwrap();
      if !log.is_empty() {
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].user_id, user);
    assert_eq!(
      log[0].criteria,
      "Category = steel, Location = , Business Type = "
    );
  }

  #[tokio::test]
  async fn search_status_reflects_accepted_connection() {
    let s = seeded().await;
    request_and_accept(&s).await;

    let resp = send(
      &s.store,
      "POST",
      "/search/business",
      Some(s.beta.company_id),
      Some(json!({ "userid": Uuid::new_v4(), "compid": s.beta.company_id })),
    )
    .await;
    let rows = json_body(resp).await;
    assert_eq!(rows[0]["name"], "Alpha");
    assert_eq!(rows[0]["status"], "Connected");
  }

  #[tokio::test]
  async fn search_as_another_company_is_forbidden() {
    let s = seeded().await;
    let resp = send(
      &s.store,
      "POST",
      "/search/business",
      Some(s.alpha.company_id),
      Some(json!({ "userid": Uuid::new_v4(), "compid": s.beta.company_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(resp).await["error"]["code"], "forbidden");
  }

  #[tokio::test]
  async fn overlong_filter_is_rejected() {
    let s = seeded().await;
    let resp = send(
      &s.store,
      "POST",
      "/search/business",
      None,
      Some(json!({
        "userid": Uuid::new_v4(),
        "compid": s.alpha.company_id,
        "location": "x".repeat(101),
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"]["code"], "validation_error");
  }

  /// Delegates to SQLite but fails every audit write.
  struct FailingAudit(SqliteStore);

  impl DirectoryStore for FailingAudit {
    type Error = bizdir_store_sqlite::Error;

    async fn add_category(&self, name: String) -> Result<Category, Self::Error> {
      self.0.add_category(name).await
    }

    async fn add_subcategory(
      &self,
      category_id: Uuid,
      name: String,
    ) -> Result<Subcategory, Self::Error> {
      self.0.add_subcategory(category_id, name).await
    }

    async fn add_location(&self, name: String) -> Result<Location, Self::Error> {
      self.0.add_location(name).await
    }

    async fn add_turnover_band(
      &self,
      display: String,
      short: String,
    ) -> Result<TurnoverBand, Self::Error> {
      self.0.add_turnover_band(display, short).await
    }

    async fn add_company(&self, input: NewCompany) -> Result<Company, Self::Error> {
      self.0.add_company(input).await
    }

    async fn get_company(&self, id: Uuid) -> Result<Option<Company>, Self::Error> {
      self.0.get_company(id).await
    }

    async fn set_company_status(
      &self,
      id: Uuid,
      status: CompanyStatus,
    ) -> Result<Company, Self::Error> {
      self.0.set_company_status(id, status).await
    }

    async fn add_personnel(
      &self,
      input: NewPersonnel,
    ) -> Result<Personnel, Self::Error> {
      self.0.add_personnel(input).await
    }

    async fn replace_attributes(
      &self,
      company_id: Uuid,
      attributes: ProfileAttributes,
    ) -> Result<(), Self::Error> {
      self.0.replace_attributes(company_id, attributes).await
    }

    async fn aggregated_attribute(
      &self,
      company_id: Uuid,
      kind: AttributeKind,
    ) -> Result<String, Self::Error> {
      self.0.aggregated_attribute(company_id, kind).await
    }

    async fn company_profile(
      &self,
      company_id: Uuid,
    ) -> Result<Option<CompanyProfile>, Self::Error> {
      self.0.company_profile(company_id).await
    }

    async fn listings(&self) -> Result<Vec<Listing>, Self::Error> {
      self.0.listings().await
    }

    async fn request_connection(
      &self,
      input: NewConnection,
    ) -> Result<Connection, Self::Error> {
      self.0.request_connection(input).await
    }

    async fn act_on_connection(
      &self,
      connection_id: Uuid,
      actor: Uuid,
      action: ConnectionAction,
      reply_message: Option<String>,
    ) -> Result<Connection, Self::Error> {
      self
        .0
        .act_on_connection(connection_id, actor, action, reply_message)
        .await
    }

    async fn get_connection(
      &self,
      connection_id: Uuid,
    ) -> Result<Option<Connection>, Self::Error> {
      self.0.get_connection(connection_id).await
    }

    async fn status_of(
      &self,
      sender: Uuid,
      receiver: Uuid,
    ) -> Result<Option<ConnectionState>, Self::Error> {
      self.0.status_of(sender, receiver).await
    }

    async fn connected(&self, a: Uuid, b: Uuid) -> Result<bool, Self::Error> {
      self.0.connected(a, b).await
    }

    async fn connected_companies(
      &self,
      company_id: Uuid,
    ) -> Result<Vec<Uuid>, Self::Error> {
      self.0.connected_companies(company_id).await
    }

    async fn pending_for(
      &self,
      receiver: Uuid,
    ) -> Result<Vec<Connection>, Self::Error> {
      self.0.pending_for(receiver).await
    }

    async fn record_search(
      &self,
      _user_id: Uuid,
      _criteria: SearchCriteria,
    ) -> Result<(), Self::Error> {
      Err(bizdir_store_sqlite::Error::AuditWriteFailed(Box::new(
        bizdir_store_sqlite::Error::Unavailable("audit table locked".into()),
      )))
    }
  }

  #[tokio::test]
  async fn search_succeeds_when_audit_write_fails() {
    let s = seeded().await;
    let store = Arc::new(FailingAudit(s.store.clone()));

    let resp = dispatch(
      api_router(store),
      "POST",
      "/search/business",
      None,
      Some(json!({
        "userid": Uuid::new_v4(),
        "compid": s.alpha.company_id,
        "category": "steel",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(s.store.search_log().await.unwrap().is_empty());
  }

  // ── Disclosure ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn describe_requires_viewer() {
    let s = seeded().await;
    let resp = send(
      &s.store,
      "POST",
      "/search/describe",
      None,
      Some(json!({ "compid": s.beta.company_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"]["code"], "unauthenticated");
  }

  #[tokio::test]
  async fn details_are_gated_on_connection() {
    let s = seeded().await;
    let body = json!({ "compid": s.beta.company_id });

    let resp = send(
      &s.store,
      "POST",
      "/search/compdet",
      Some(s.alpha.company_id),
      Some(body.clone()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(resp).await["error"]["code"], "not_connected");

    let resp = send(
      &s.store,
      "POST",
      "/search/describe",
      Some(s.alpha.company_id),
      Some(body.clone()),
    )
    .await;
    let described = json_body(resp).await;
    assert_eq!(described["tier"], "summary");
    assert!(!described["text"].as_str().unwrap().contains("Meera"));

    request_and_accept(&s).await;

    let resp = send(
      &s.store,
      "POST",
      "/search/compdet",
      Some(s.alpha.company_id),
      Some(body),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let details = json_body(resp).await;
    assert!(details["details"].as_str().unwrap().contains("Meera (Partner)"));
  }

  #[tokio::test]
  async fn summary_needs_no_viewer() {
    let s = seeded().await;
    let resp = send(
      &s.store,
      "POST",
      "/search/compsum",
      None,
      Some(json!({ "compid": s.beta.company_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let summary = json_body(resp).await;
    let text = summary["summary"].as_str().unwrap();
    assert!(text.starts_with("Beta is a Steel company"));
    assert!(!text.contains("Meera"));
  }

  #[tokio::test]
  async fn unknown_company_is_404() {
    let s = seeded().await;
    let resp = send(
      &s.store,
      "POST",
      "/search/compsum",
      None,
      Some(json!({ "compid": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"]["code"], "not_found");
  }

  // ── Malformed input ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_body_field_uses_error_envelope() {
    let s = seeded().await;
    let resp =
      send(&s.store, "POST", "/search/compsum", None, Some(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(!body["error"]["message"].as_str().unwrap().contains("compid"));
  }

  #[tokio::test]
  async fn malformed_path_id_uses_error_envelope() {
    let s = seeded().await;
    let resp = send(
      &s.store,
      "PUT",
      "/connection/getconnections/not-a-uuid",
      Some(s.beta.company_id),
      Some(json!({ "action": "Accept" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"]["code"], "validation_error");
  }

  #[tokio::test]
  async fn incomplete_query_uses_error_envelope() {
    let s = seeded().await;
    let uri = format!("/connection/status?sender={}", s.alpha.company_id);
    let resp = send(&s.store, "GET", &uri, None, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"]["code"], "validation_error");
  }

  // ── Connections ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn accept_flips_constatus() {
    let s = seeded().await;
    let accepted = request_and_accept(&s).await;
    assert_eq!(accepted["status"], "accepted");
    assert_eq!(accepted["constatus"], "Y");
    assert_eq!(accepted["reply_message"], "welcome");
  }

  #[tokio::test]
  async fn forged_sender_is_forbidden() {
    let s = seeded().await;
    let resp = send(
      &s.store,
      "POST",
      "/connection/sendrequest",
      Some(s.alpha.company_id),
      Some(json!({
        "sender_company_id": s.beta.company_id,
        "receiver_company_id": s.alpha.company_id,
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(resp).await["error"]["code"], "forbidden");

    let resp = send(
      &s.store,
      "POST",
      "/connection/getconnections",
      Some(s.alpha.company_id),
      Some(json!({ "receiver_company_id": s.alpha.company_id })),
    )
    .await;
    assert!(json_body(resp).await.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn send_request_requires_viewer() {
    let s = seeded().await;
    let resp = send(
      &s.store,
      "POST",
      "/connection/sendrequest",
      None,
      Some(json!({
        "sender_company_id": s.alpha.company_id,
        "receiver_company_id": s.beta.company_id,
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn duplicate_request_is_409() {
    let s = seeded().await;
    let body = json!({
      "sender_company_id": s.alpha.company_id,
      "receiver_company_id": s.beta.company_id,
    });
    let viewer = Some(s.alpha.company_id);
    let first = send(
      &s.store,
      "POST",
      "/connection/sendrequest",
      viewer,
      Some(body.clone()),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(json_body(first).await["constatus"], "N");

    let second =
      send(&s.store, "POST", "/connection/sendrequest", viewer, Some(body))
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(second).await["error"]["code"], "duplicate_request");
  }

  #[tokio::test]
  async fn sender_cannot_act_on_own_request() {
    let s = seeded().await;
    let id = alpha_requests_beta(&s, "").await;

    let resp = send(
      &s.store,
      "PUT",
      &format!("/connection/getconnections/{id}"),
      Some(s.alpha.company_id),
      Some(json!({ "action": "accept" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(resp).await["error"]["code"], "forbidden");
  }

  #[tokio::test]
  async fn reject_then_accept_is_invalid() {
    let s = seeded().await;
    let id = alpha_requests_beta(&s, "").await;
    let uri = format!("/connection/getconnections/{id}");

    let resp = send(
      &s.store,
      "PUT",
      &uri,
      Some(s.beta.company_id),
      Some(json!({ "action": "Reject" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(
      &s.store,
      "PUT",
      &uri,
      Some(s.beta.company_id),
      Some(json!({ "action": "Accept" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["error"]["code"], "invalid_transition");
  }

  #[tokio::test]
  async fn pending_list_and_directional_status() {
    let s = seeded().await;
    alpha_requests_beta(&s, "hi").await;

    let resp = send(
      &s.store,
      "POST",
      "/connection/getconnections",
      Some(s.beta.company_id),
      Some(json!({ "receiver_company_id": s.beta.company_id })),
    )
    .await;
    let pending = json_body(resp).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["message"], "hi");

    let forward = format!(
      "/connection/status?sender={}&receiver={}",
      s.alpha.company_id, s.beta.company_id
    );
    let resp = send(&s.store, "GET", &forward, None, None).await;
    let status = json_body(resp).await;
    assert_eq!(status["status"], "pending");
    assert_eq!(status["constatus"], "N");

    let backward = format!(
      "/connection/status?sender={}&receiver={}",
      s.beta.company_id, s.alpha.company_id
    );
    let resp = send(&s.store, "GET", &backward, None, None).await;
    let status = json_body(resp).await;
    assert!(status["status"].is_null());
  }

  #[tokio::test]
  async fn pending_list_of_another_company_is_forbidden() {
    let s = seeded().await;
    alpha_requests_beta(&s, "private").await;

    let resp = send(
      &s.store,
      "POST",
      "/connection/getconnections",
      Some(s.alpha.company_id),
      Some(json!({ "receiver_company_id": s.beta.company_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(resp).await["error"]["code"], "forbidden");
  }

  // ── Profile maintenance ───────────────────────────────────────────────────

  #[tokio::test]
  async fn attributes_replace_and_validate() {
    let s = seeded().await;
    let uri = format!("/company/{}/attributes", s.beta.company_id);
    let beta = Some(s.beta.company_id);

    let resp = send(
      &s.store,
      "PUT",
      &uri,
      beta,
      Some(json!({ "location_ids": [s.pune.location_id] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(
      &s.store,
      "PUT",
      &uri,
      beta,
      Some(json!({ "location_ids": [Uuid::new_v4()] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(
      &s.store,
      "POST",
      "/search/compsum",
      None,
      Some(json!({ "compid": s.beta.company_id })),
    )
    .await;
    let summary = json_body(resp).await;
    assert!(summary["summary"].as_str().unwrap().contains("operating in Pune"));
  }

  #[tokio::test]
  async fn attributes_of_another_company_are_forbidden() {
    let s = seeded().await;
    let resp = send(
      &s.store,
      "PUT",
      &format!("/company/{}/attributes", s.beta.company_id),
      Some(s.alpha.company_id),
      Some(json!({ "location_ids": [s.pune.location_id] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(resp).await["error"]["code"], "forbidden");

    let profile = s.store.company_profile(s.beta.company_id).await.unwrap();
    assert!(profile.unwrap().locations.is_empty());
  }
}
