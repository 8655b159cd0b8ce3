//! Disclosure tiers and the company description gate.
//!
//! A viewer sees the [`Disclosure::Detail`] projection of a company only when
//! the two companies are connected (an accepted edge in either direction) or
//! when the viewer is looking at itself. Everyone else gets
//! [`Disclosure::Summary`]. The tier is always computed here from stored
//! connection state; callers cannot ask for it.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, company::CompanyProfile, store::DirectoryStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disclosure {
  /// Everything, including sub-categories and personnel contacts.
  Detail,
  /// Identity, age, turnover, category and locations only.
  Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDescription {
  pub company_id: Uuid,
  pub tier:       Disclosure,
  pub text:       String,
}

/// Describe `target` as `viewer` is entitled to see it.
pub async fn describe<S>(
  store: &S,
  viewer: Uuid,
  target: Uuid,
) -> Result<CompanyDescription, S::Error>
where
  S: DirectoryStore,
{
  let profile = store
    .company_profile(target)
    .await?
    .ok_or(Error::CompanyNotFound(target))?;

  let tier = if viewer == target || store.connected(viewer, target).await? {
    Disclosure::Detail
  } else {
    Disclosure::Summary
  };

  Ok(CompanyDescription {
    company_id: target,
    tier,
    text: render(&profile, tier, Utc::now().year()),
  })
}

/// The public summary of `target`; needs no viewer.
pub async fn summarize<S>(
  store: &S,
  target: Uuid,
) -> Result<CompanyDescription, S::Error>
where
  S: DirectoryStore,
{
  let profile = store
    .company_profile(target)
    .await?
    .ok_or(Error::CompanyNotFound(target))?;

  Ok(CompanyDescription {
    company_id: target,
    tier:       Disclosure::Summary,
    text:       render(&profile, Disclosure::Summary, Utc::now().year()),
  })
}

/// Render a profile as prose for the given tier.
///
/// Clauses backed by an empty aggregated string are left out.
pub fn render(
  profile: &CompanyProfile,
  tier: Disclosure,
  current_year: i32,
) -> String {
  let company = &profile.company;
  let age = (current_year - company.founded_year).max(0);

  let mut text = format!(
    "{} is a {} company, {}, with a turnover of {}",
    company.name,
    profile.category,
    age_phrase(age),
    profile.turnover.short,
  );
  if !profile.locations.is_empty() {
    text.push_str(&format!(", operating in {}", profile.locations));
  }
  text.push('.');

  if tier == Disclosure::Detail {
    if !profile.subcategories.is_empty() {
      text.push_str(&format!(" Specialises in {}.", profile.subcategories));
    }
    if !profile.personnel.is_empty() {
      text.push_str(&format!(" Contacts: {}.", profile.personnel));
    }
  }
  text
}

fn age_phrase(age: i32) -> String {
  match age {
    0 => "established this year".to_owned(),
    1 => "1 year in business".to_owned(),
    n => format!("{n} years in business"),
  }
}
