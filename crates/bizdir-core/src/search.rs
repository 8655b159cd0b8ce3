//! Multi-criteria business search.
//!
//! Each filter is a case-insensitive substring test against one attribute of
//! a listing:
//!
//! | Filter          | Matched against                                  |
//! |-----------------|--------------------------------------------------|
//! | `category`      | primary-category name                            |
//! | `location`      | aggregated locations string                      |
//! | `business_type` | turnover band display label *or* short label     |
//!
//! An empty filter matches every value.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::contains_ci,
  company::TurnoverBand,
  connection::ConnectionLabel,
  store::DirectoryStore,
};

/// Longest accepted filter, in characters.
pub const MAX_FILTER_LEN: usize = 100;

// ─── Criteria ────────────────────────────────────────────────────────────────

/// Normalised search filters. Construct through [`SearchCriteria::new`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
  pub category:      String,
  pub location:      String,
  pub business_type: String,
}

impl SearchCriteria {
  /// Trim each filter and reject over-long input.
  pub fn new(
    category: impl Into<String>,
    location: impl Into<String>,
    business_type: impl Into<String>,
  ) -> Result<Self> {
    Ok(Self {
      category:      normalise("category", category.into())?,
      location:      normalise("location", location.into())?,
      business_type: normalise("business type", business_type.into())?,
    })
  }

  /// Human-readable rendering stored in the audit log.
  pub fn audit_line(&self) -> String {
    format!(
      "Category = {}, Location = {}, Business Type = {}",
      self.category, self.location, self.business_type
    )
  }

  pub fn matches(&self, listing: &Listing) -> bool {
    contains_ci(&listing.category, &self.category)
      && contains_ci(&listing.locations, &self.location)
      && (contains_ci(&listing.turnover.display, &self.business_type)
        || contains_ci(&listing.turnover.short, &self.business_type))
  }
}

fn normalise(field: &str, value: String) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.chars().count() > MAX_FILTER_LEN {
    return Err(Error::Validation(format!(
      "{field} filter exceeds {MAX_FILTER_LEN} characters"
    )));
  }
  Ok(trimmed.to_owned())
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A company as the search engine sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
  pub company_id: Uuid,
  pub name:       String,
  pub category:   String,
  /// Aggregated locations string.
  pub locations:  String,
  pub turnover:   TurnoverBand,
}

/// One search result, annotated with the viewer's connection status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRow {
  pub company_id: Uuid,
  pub name:       String,
  pub category:   String,
  pub locations:  String,
  /// Turnover band display label.
  pub turnover:   String,
  pub status:     ConnectionLabel,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Run a search on behalf of `viewer`.
///
/// Rows are sorted by company name. Audit logging is the caller's concern;
/// this function has no side effects.
pub async fn search<S>(
  store: &S,
  viewer: Uuid,
  criteria: &SearchCriteria,
) -> Result<Vec<SearchRow>, S::Error>
where
  S: DirectoryStore,
{
  let listings = store.listings().await?;
  let connected: HashSet<Uuid> =
    store.connected_companies(viewer).await?.into_iter().collect();

  let mut rows: Vec<SearchRow> = listings
    .into_iter()
    .filter(|l| criteria.matches(l))
    .map(|l| SearchRow {
      status:     ConnectionLabel::from_connected(
        connected.contains(&l.company_id),
      ),
      company_id: l.company_id,
      name:       l.name,
      category:   l.category,
      locations:  l.locations,
      turnover:   l.turnover.display,
    })
    .collect();

  rows.sort_by(|a, b| {
    a.name.cmp(&b.name).then_with(|| a.company_id.cmp(&b.company_id))
  });
  Ok(rows)
}
