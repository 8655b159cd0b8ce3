//! Companies and the reference data that describes them.
//!
//! Categories, locations and turnover bands are master data supplied from
//! outside the directory core. A company points at one primary category and
//! one turnover band, and owns many-to-many links to locations and
//! sub-categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Reference data ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub category_id: Uuid,
  pub name:        String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
  pub subcategory_id: Uuid,
  pub category_id:    Uuid,
  pub name:           String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
  pub location_id: Uuid,
  pub name:        String,
}

/// A coarse annual-revenue bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnoverBand {
  pub turnover_id: Uuid,
  /// Long form, e.g. `"1 to 5 Crore"`.
  pub display:     String,
  /// Short code, e.g. `"1-5Cr"`.
  pub short:       String,
}

// ─── Company ─────────────────────────────────────────────────────────────────

/// Soft status. Companies are never hard-deleted.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CompanyStatus {
  #[default]
  Active,
  Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
  pub company_id:   Uuid,
  pub name:         String,
  pub category_id:  Uuid,
  pub turnover_id:  Uuid,
  pub founded_year: i32,
  pub status:       CompanyStatus,
  pub created_at:   DateTime<Utc>,
}

/// Input for creating a company; identity and timestamps are store-assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCompany {
  pub name:         String,
  pub category_id:  Uuid,
  pub turnover_id:  Uuid,
  pub founded_year: i32,
}

// ─── Personnel ───────────────────────────────────────────────────────────────

/// A contact person. Only ever disclosed in the detail projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personnel {
  pub personnel_id: Uuid,
  pub company_id:   Uuid,
  pub name:         String,
  pub designation:  String,
  pub phone:        String,
  pub email:        String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPersonnel {
  pub company_id:  Uuid,
  pub name:        String,
  pub designation: String,
  pub phone:       String,
  pub email:       String,
}

impl Personnel {
  pub fn contact_line(&self) -> String {
    contact_line(&self.name, &self.designation, &self.phone, &self.email)
  }
}

/// One-line contact rendering. Starts with the person's name so that
/// aggregated contact lists sort by name.
pub fn contact_line(
  name: &str,
  designation: &str,
  phone: &str,
  email: &str,
) -> String {
  format!("{name} ({designation}): {phone} / {email}")
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// The complete set of many-to-many attributes for a company. Applying it
/// replaces the previous set wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileAttributes {
  #[serde(default)]
  pub location_ids:    Vec<Uuid>,
  #[serde(default)]
  pub subcategory_ids: Vec<Uuid>,
}

/// The materialised read model for one company. Never stored, always
/// derived. Aggregated fields are already rendered display strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
  pub company:       Company,
  pub category:      String,
  pub turnover:      TurnoverBand,
  pub locations:     String,
  pub subcategories: String,
  pub personnel:     String,
}
