//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond width
//! so they sort lexically in chronological order. UUIDs are stored as
//! hyphenated lowercase strings. Enumerations use their lowercase names.

use bizdir_core::{
  company::{Company, CompanyStatus, TurnoverBand},
  connection::{Connection, ConnectionState},
  search::Listing,
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Enumerations ─────────────────────────────────────────────────────────────

pub fn decode_company_status(s: &str) -> Result<CompanyStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown company status: {s:?}")))
}

pub fn decode_connection_state(s: &str) -> Result<ConnectionState> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown connection status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `companies` row.
pub struct RawCompany {
  pub company_id:   String,
  pub name:         String,
  pub category_id:  String,
  pub turnover_id:  String,
  pub founded_year: i32,
  pub status:       String,
  pub created_at:   String,
}

impl RawCompany {
  pub const COLUMNS: &'static str = "c.company_id, c.name, c.category_id, \
     c.turnover_id, c.founded_year, c.status, c.created_at";

  /// Read the [`Self::COLUMNS`] projection starting at column `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      company_id:   row.get(offset)?,
      name:         row.get(offset + 1)?,
      category_id:  row.get(offset + 2)?,
      turnover_id:  row.get(offset + 3)?,
      founded_year: row.get(offset + 4)?,
      status:       row.get(offset + 5)?,
      created_at:   row.get(offset + 6)?,
    })
  }

  pub fn into_company(self) -> Result<Company> {
    Ok(Company {
      company_id:   decode_uuid(&self.company_id)?,
      name:         self.name,
      category_id:  decode_uuid(&self.category_id)?,
      turnover_id:  decode_uuid(&self.turnover_id)?,
      founded_year: self.founded_year,
      status:       decode_company_status(&self.status)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from a `turnover_bands` row.
pub struct RawTurnover {
  pub turnover_id: String,
  pub display:     String,
  pub short:       String,
}

impl RawTurnover {
  pub fn into_band(self) -> Result<TurnoverBand> {
    Ok(TurnoverBand {
      turnover_id: decode_uuid(&self.turnover_id)?,
      display:     self.display,
      short:       self.short,
    })
  }
}

/// Raw strings read directly from a `connections` row.
pub struct RawConnection {
  pub connection_id:       String,
  pub sender_company_id:   String,
  pub receiver_company_id: String,
  pub status:              String,
  pub message:             String,
  pub reply_message:       Option<String>,
  pub created_at:          String,
  pub updated_at:          Option<String>,
}

impl RawConnection {
  pub const COLUMNS: &'static str = "connection_id, sender_company_id, \
     receiver_company_id, status, message, reply_message, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      connection_id:       row.get(0)?,
      sender_company_id:   row.get(1)?,
      receiver_company_id: row.get(2)?,
      status:              row.get(3)?,
      message:             row.get(4)?,
      reply_message:       row.get(5)?,
      created_at:          row.get(6)?,
      updated_at:          row.get(7)?,
    })
  }

  pub fn into_connection(self) -> Result<Connection> {
    Ok(Connection {
      connection_id:       decode_uuid(&self.connection_id)?,
      sender_company_id:   decode_uuid(&self.sender_company_id)?,
      receiver_company_id: decode_uuid(&self.receiver_company_id)?,
      status:              decode_connection_state(&self.status)?,
      message:             self.message,
      reply_message:       self.reply_message,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          self.updated_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// One active company joined with its category and turnover band, before
/// locations are aggregated.
pub struct RawListing {
  pub company_id: String,
  pub name:       String,
  pub category:   String,
  pub turnover:   RawTurnover,
}

impl RawListing {
  pub fn into_listing(self, locations: String) -> Result<Listing> {
    Ok(Listing {
      company_id: decode_uuid(&self.company_id)?,
      name:       self.name,
      category:   self.category,
      locations,
      turnover:   self.turnover.into_band()?,
    })
  }
}
