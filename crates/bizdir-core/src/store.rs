//! The `DirectoryStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `bizdir-store-sqlite`).
//! Higher layers (`bizdir-api`, the search engine and visibility gate in this
//! crate) depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Classify,
  aggregate::AttributeKind,
  company::{
    Category, Company, CompanyProfile, CompanyStatus, Location, NewCompany,
    NewPersonnel, Personnel, ProfileAttributes, Subcategory, TurnoverBand,
  },
  connection::{Connection, ConnectionAction, ConnectionState, NewConnection},
  search::{Listing, SearchCriteria},
};

/// Abstraction over a bizdir store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait DirectoryStore: Send + Sync {
  type Error: std::error::Error
    + Classify
    + From<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Reference data ────────────────────────────────────────────────────

  fn add_category(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  fn add_subcategory(
    &self,
    category_id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<Subcategory, Self::Error>> + Send + '_;

  fn add_location(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Location, Self::Error>> + Send + '_;

  fn add_turnover_band(
    &self,
    display: String,
    short: String,
  ) -> impl Future<Output = Result<TurnoverBand, Self::Error>> + Send + '_;

  // ── Companies ─────────────────────────────────────────────────────────

  /// Create and persist a new, active company.
  fn add_company(
    &self,
    input: NewCompany,
  ) -> impl Future<Output = Result<Company, Self::Error>> + Send + '_;

  /// Retrieve a company by UUID. Returns `None` if not found.
  fn get_company(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Company>, Self::Error>> + Send + '_;

  /// Change a company's soft status. Companies are never deleted.
  fn set_company_status(
    &self,
    id: Uuid,
    status: CompanyStatus,
  ) -> impl Future<Output = Result<Company, Self::Error>> + Send + '_;

  fn add_personnel(
    &self,
    input: NewPersonnel,
  ) -> impl Future<Output = Result<Personnel, Self::Error>> + Send + '_;

  /// Replace a company's locations and sub-categories wholesale.
  ///
  /// Applied atomically: if any step fails the previous attribute set is
  /// left untouched.
  fn replace_attributes(
    &self,
    company_id: Uuid,
    attributes: ProfileAttributes,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The aggregated display string for one relation of a company; see
  /// [`aggregate`](crate::aggregate::aggregate).
  fn aggregated_attribute(
    &self,
    company_id: Uuid,
    kind: AttributeKind,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Materialise a [`CompanyProfile`]. Returns `None` if the company does
  /// not exist.
  fn company_profile(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<Option<CompanyProfile>, Self::Error>> + Send + '_;

  /// Every active company with its searchable attributes resolved.
  fn listings(
    &self,
  ) -> impl Future<Output = Result<Vec<Listing>, Self::Error>> + Send + '_;

  // ── Connections ───────────────────────────────────────────────────────

  /// Create a pending connection request.
  ///
  /// Fails if either company is unknown, if `sender == receiver`, or if an
  /// edge for the same ordered pair already exists.
  fn request_connection(
    &self,
    input: NewConnection,
  ) -> impl Future<Output = Result<Connection, Self::Error>> + Send + '_;

  /// Apply the receiver's decision to a connection.
  ///
  /// `actor` must be the receiver. Re-applying the action that produced the
  /// current terminal state returns the edge unchanged.
  fn act_on_connection(
    &self,
    connection_id: Uuid,
    actor: Uuid,
    action: ConnectionAction,
    reply_message: Option<String>,
  ) -> impl Future<Output = Result<Connection, Self::Error>> + Send + '_;

  fn get_connection(
    &self,
    connection_id: Uuid,
  ) -> impl Future<Output = Result<Option<Connection>, Self::Error>> + Send + '_;

  /// Directional lookup: the state of the edge sent by `sender` to
  /// `receiver`, ignoring any edge in the opposite direction.
  fn status_of(
    &self,
    sender: Uuid,
    receiver: Uuid,
  ) -> impl Future<Output = Result<Option<ConnectionState>, Self::Error>> + Send + '_;

  /// Whether an accepted edge joins `a` and `b` in either direction.
  fn connected(
    &self,
    a: Uuid,
    b: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All companies joined to `company_id` by an accepted edge, in either
  /// direction.
  fn connected_companies(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Pending requests addressed to `receiver`, oldest first.
  fn pending_for(
    &self,
    receiver: Uuid,
  ) -> impl Future<Output = Result<Vec<Connection>, Self::Error>> + Send + '_;

  // ── Audit ─────────────────────────────────────────────────────────────

  /// Append one search-audit record. Never read back by the core.
  fn record_search(
    &self,
    user_id: Uuid,
    criteria: SearchCriteria,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
