//! [`SqliteStore`], the SQLite implementation of [`DirectoryStore`].

use std::{collections::HashMap, future::Future, path::Path, time::Duration};

use bizdir_core::{
  aggregate::{AttributeKind, aggregate},
  company::{
    Category, Company, CompanyProfile, CompanyStatus, Location, NewCompany,
    NewPersonnel, Personnel, ProfileAttributes, Subcategory, TurnoverBand,
    contact_line,
  },
  connection::{
    Connection, ConnectionAction, ConnectionState, MAX_MESSAGE_LEN,
    NewConnection, Transition, plan_transition,
  },
  search::{Listing, SearchCriteria},
  store::DirectoryStore,
};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawCompany, RawConnection, RawListing, RawTurnover, decode_connection_state,
    decode_dt, decode_uuid, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Resource limits applied to every store call.
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// Upper bound on how long a caller waits for a single database call.
  ///
  /// Expiry does not cancel the call. A write that times out may still
  /// commit once the database thread reaches it.
  pub timeout:       Duration,
  /// How many times a read is retried after a transient failure.
  pub read_retries:  u32,
  /// Delay before the first retry; doubles on each subsequent one.
  pub retry_backoff: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      timeout:       Duration::from_secs(5),
      read_retries:  3,
      retry_backoff: Duration::from_millis(50),
    }
  }
}

/// One row of the search audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLogEntry {
  pub user_id:    Uuid,
  pub criteria:   String,
  pub created_at: DateTime<Utc>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A bizdir directory store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  options: StoreOptions,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open_with(
    path: impl AsRef<Path>,
    options: StoreOptions,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path.as_ref().to_path_buf())
      .await
      .map_err(Error::from_db)?;
    let store = Self { conn, options };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(StoreOptions::default()).await
  }

  pub async fn open_in_memory_with(options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(Error::from_db)?;
    let store = Self { conn, options };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Run `f` on the database thread once, bounded by the configured timeout.
  /// Used directly by every write.
  ///
  /// The timeout only stops the wait. `f` has already been queued on the
  /// database thread and runs to completion there, so a write reported as
  /// [`Error::Unavailable`] may still be committed afterwards. Writes are
  /// never retried for this reason.
  async fn call<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R>
      + Send
      + 'static,
    R: Send + 'static,
  {
    match tokio::time::timeout(self.options.timeout, self.conn.call(f)).await {
      Ok(result) => result.map_err(Error::from_db),
      Err(_) => Err(Error::Unavailable(format!(
        "store call exceeded {:?}",
        self.options.timeout
      ))),
    }
  }

  /// Run a read, retrying transient failures with exponential backoff.
  async fn read<F, R>(&self, f: F) -> Result<R>
  where
    F: Fn(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R>
      + Clone
      + Send
      + 'static,
    R: Send + 'static,
  {
    retry_transient(self.options.read_retries, self.options.retry_backoff, || {
      self.call(f.clone())
    })
    .await
  }

  /// The full search audit trail, oldest first. Intended for analytics
  /// and tests; the directory core never reads it.
  pub async fn search_log(&self) -> Result<Vec<SearchLogEntry>> {
    let raws: Vec<(String, String, String)> = self
      .read(|conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, criteria, created_at
           FROM search_criteria_log
           ORDER BY log_id",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(user_id, criteria, created_at)| {
        Ok(SearchLogEntry {
          user_id: decode_uuid(&user_id)?,
          criteria,
          created_at: decode_dt(&created_at)?,
        })
      })
      .collect()
  }
}

/// Drive `op` until it succeeds, fails permanently, or has been retried
/// `retries` times. The delay starts at `backoff` and doubles per retry.
pub(crate) async fn retry_transient<F, Fut, R>(
  retries: u32,
  backoff: Duration,
  mut op: F,
) -> Result<R>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<R>>,
{
  let mut attempt = 0;
  let mut delay = backoff;
  loop {
    match op().await {
      Err(e) if e.is_transient() && attempt < retries => {
        attempt += 1;
        tracing::warn!(attempt, error = %e, "transient store failure, retrying read");
        tokio::time::sleep(delay).await;
        delay *= 2;
      }
      other => return other,
    }
  }
}

#[cfg(test)]
impl SqliteStore {
  /// A read that holds the database thread for `hold`.
  pub(crate) async fn stalled_read(&self, hold: Duration) -> Result<()> {
    self
      .read(move |_| {
        std::thread::sleep(hold);
        Ok(())
      })
      .await
  }

  /// `(status, constatus)` for every stored connection, straight from the
  /// table.
  pub(crate) async fn raw_status_pairs(&self) -> Result<Vec<(String, String)>> {
    self
      .read(|conn| {
        let mut stmt = conn.prepare("SELECT status, constatus FROM connections")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }

  /// Try to write an inconsistent `constatus` directly, bypassing the store.
  pub(crate) async fn force_constatus(&self, id: Uuid, constatus: &'static str) -> Result<usize> {
    let id_str = encode_uuid(id);
    self
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE connections SET constatus = ?2 WHERE connection_id = ?1",
          rusqlite::params![id_str, constatus],
        )?)
      })
      .await
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn required(field: &str, value: String) -> Result<String> {
  let value = value.trim().to_owned();
  if value.is_empty() {
    return Err(bizdir_core::Error::Validation(format!("{field} is required")).into());
  }
  Ok(value)
}

fn exists(
  conn: &rusqlite::Connection,
  sql: &str,
  id: &str,
) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, [id], |_| Ok(())).optional()?.is_some())
}

const COMPANY_EXISTS: &str = "SELECT 1 FROM companies WHERE company_id = ?1";
const ACTIVE_COMPANY_EXISTS: &str =
  "SELECT 1 FROM companies WHERE company_id = ?1 AND status = 'active'";

/// Display values of one relation of a company, unsorted.
fn attribute_values(
  conn: &rusqlite::Connection,
  company_id: &str,
  kind: AttributeKind,
) -> rusqlite::Result<Vec<String>> {
  match kind {
    AttributeKind::Locations => {
      let mut stmt = conn.prepare_cached(
        "SELECT l.name
         FROM company_locations cl
         JOIN locations l ON l.location_id = cl.location_id
         WHERE cl.company_id = ?1",
      )?;
      let names = stmt
        .query_map([company_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(names)
    }
    AttributeKind::Subcategories => {
      let mut stmt = conn.prepare_cached(
        "SELECT s.name
         FROM company_subcategories cs
         JOIN subcategories s ON s.subcategory_id = cs.subcategory_id
         WHERE cs.company_id = ?1",
      )?;
      let names = stmt
        .query_map([company_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(names)
    }
    AttributeKind::Personnel => {
      let mut stmt = conn.prepare_cached(
        "SELECT name, designation, phone, email
         FROM personnel
         WHERE company_id = ?1",
      )?;
      let lines = stmt
        .query_map([company_id], |row| {
          let name: String = row.get(0)?;
          let designation: String = row.get(1)?;
          let phone: String = row.get(2)?;
          let email: String = row.get(3)?;
          Ok(contact_line(&name, &designation, &phone, &email))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(lines)
    }
  }
}

fn select_connection(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawConnection>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM connections WHERE connection_id = ?1",
        RawConnection::COLUMNS
      ),
      [id],
      RawConnection::from_row,
    )
    .optional()
}

/// Everything [`SqliteStore::company_profile`] reads, before aggregation.
struct RawProfile {
  company:       RawCompany,
  category:      String,
  turnover:      RawTurnover,
  locations:     Vec<String>,
  subcategories: Vec<String>,
  personnel:     Vec<String>,
}

// ─── DirectoryStore impl ─────────────────────────────────────────────────────

impl DirectoryStore for SqliteStore {
  type Error = Error;

  // ── Reference data ────────────────────────────────────────────────────────

  async fn add_category(&self, name: String) -> Result<Category> {
    let category = Category {
      category_id: Uuid::new_v4(),
      name:        required("category name", name)?,
    };
    let id_str = encode_uuid(category.category_id);
    let name = category.name.clone();

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO categories (category_id, name) VALUES (?1, ?2)",
          rusqlite::params![id_str, name],
        )?;
        Ok(())
      })
      .await?;
    Ok(category)
  }

  async fn add_subcategory(
    &self,
    category_id: Uuid,
    name: String,
  ) -> Result<Subcategory> {
    let subcategory = Subcategory {
      subcategory_id: Uuid::new_v4(),
      category_id,
      name: required("sub-category name", name)?,
    };
    let id_str = encode_uuid(subcategory.subcategory_id);
    let category_str = encode_uuid(category_id);
    let name = subcategory.name.clone();

    self
      .call(move |conn| {
        if !exists(
          conn,
          "SELECT 1 FROM categories WHERE category_id = ?1",
          &category_str,
        )? {
          return Ok(Err(bizdir_core::Error::Validation(format!(
            "unknown category {category_id}"
          ))));
        }
        conn.execute(
          "INSERT INTO subcategories (subcategory_id, category_id, name)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, category_str, name],
        )?;
        Ok(Ok(()))
      })
      .await??;
    Ok(subcategory)
  }

  async fn add_location(&self, name: String) -> Result<Location> {
    let location = Location {
      location_id: Uuid::new_v4(),
      name:        required("location name", name)?,
    };
    let id_str = encode_uuid(location.location_id);
    let name = location.name.clone();

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO locations (location_id, name) VALUES (?1, ?2)",
          rusqlite::params![id_str, name],
        )?;
        Ok(())
      })
      .await?;
    Ok(location)
  }

  async fn add_turnover_band(
    &self,
    display: String,
    short: String,
  ) -> Result<TurnoverBand> {
    let band = TurnoverBand {
      turnover_id: Uuid::new_v4(),
      display:     required("turnover display label", display)?,
      short:       required("turnover short label", short)?,
    };
    let id_str = encode_uuid(band.turnover_id);
    let display = band.display.clone();
    let short = band.short.clone();

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO turnover_bands (turnover_id, display, short)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, display, short],
        )?;
        Ok(())
      })
      .await?;
    Ok(band)
  }

  // ── Companies ─────────────────────────────────────────────────────────────

  async fn add_company(&self, input: NewCompany) -> Result<Company> {
    let company = Company {
      company_id:   Uuid::new_v4(),
      name:         required("company name", input.name)?,
      category_id:  input.category_id,
      turnover_id:  input.turnover_id,
      founded_year: input.founded_year,
      status:       CompanyStatus::Active,
      created_at:   Utc::now(),
    };

    let id_str       = encode_uuid(company.company_id);
    let name         = company.name.clone();
    let category_str = encode_uuid(company.category_id);
    let turnover_str = encode_uuid(company.turnover_id);
    let founded      = company.founded_year;
    let status_str   = company.status.to_string();
    let at_str       = encode_dt(company.created_at);
    let (category_id, turnover_id) = (company.category_id, company.turnover_id);

    self
      .call(move |conn| {
        if !exists(
          conn,
          "SELECT 1 FROM categories WHERE category_id = ?1",
          &category_str,
        )? {
          return Ok(Err(bizdir_core::Error::Validation(format!(
            "unknown category {category_id}"
          ))));
        }
        if !exists(
          conn,
          "SELECT 1 FROM turnover_bands WHERE turnover_id = ?1",
          &turnover_str,
        )? {
          return Ok(Err(bizdir_core::Error::Validation(format!(
            "unknown turnover band {turnover_id}"
          ))));
        }
        conn.execute(
          "INSERT INTO companies (
             company_id, name, category_id, turnover_id,
             founded_year, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            name,
            category_str,
            turnover_str,
            founded,
            status_str,
            at_str,
          ],
        )?;
        Ok(Ok(()))
      })
      .await??;

    Ok(company)
  }

  async fn get_company(&self, id: Uuid) -> Result<Option<Company>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCompany> = self
      .read(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM companies c WHERE c.company_id = ?1",
                RawCompany::COLUMNS
              ),
              [&id_str],
              |row| RawCompany::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCompany::into_company).transpose()
  }

  async fn set_company_status(
    &self,
    id: Uuid,
    status: CompanyStatus,
  ) -> Result<Company> {
    let id_str = encode_uuid(id);
    let status_str = status.to_string();

    let changed = self
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE companies SET status = ?2 WHERE company_id = ?1",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(bizdir_core::Error::CompanyNotFound(id).into());
    }
    self
      .get_company(id)
      .await?
      .ok_or_else(|| bizdir_core::Error::CompanyNotFound(id).into())
  }

  async fn add_personnel(&self, input: NewPersonnel) -> Result<Personnel> {
    let person = Personnel {
      personnel_id: Uuid::new_v4(),
      company_id:   input.company_id,
      name:         required("name", input.name)?,
      designation:  input.designation.trim().to_owned(),
      phone:        input.phone.trim().to_owned(),
      email:        input.email.trim().to_owned(),
    };

    let id_str      = encode_uuid(person.personnel_id);
    let company_str = encode_uuid(person.company_id);
    let company_id  = person.company_id;
    let row = (
      person.name.clone(),
      person.designation.clone(),
      person.phone.clone(),
      person.email.clone(),
    );

    self
      .call(move |conn| {
        if !exists(conn, COMPANY_EXISTS, &company_str)? {
          return Ok(Err(bizdir_core::Error::CompanyNotFound(company_id)));
        }
        let (name, designation, phone, email) = row;
        conn.execute(
          "INSERT INTO personnel (
             personnel_id, company_id, name, designation, phone, email
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, company_str, name, designation, phone, email],
        )?;
        Ok(Ok(()))
      })
      .await??;

    Ok(person)
  }

  async fn replace_attributes(
    &self,
    company_id: Uuid,
    attributes: ProfileAttributes,
  ) -> Result<()> {
    let company_str = encode_uuid(company_id);
    let mut location_ids = attributes.location_ids;
    let mut subcategory_ids = attributes.subcategory_ids;
    location_ids.sort_unstable();
    location_ids.dedup();
    subcategory_ids.sort_unstable();
    subcategory_ids.dedup();

    self
      .call(move |conn| {
        // Dropping `tx` without committing rolls every step back.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !exists(&tx, COMPANY_EXISTS, &company_str)? {
          return Ok(Err(bizdir_core::Error::CompanyNotFound(company_id)));
        }

        tx.execute(
          "DELETE FROM company_locations WHERE company_id = ?1",
          [&company_str],
        )?;
        tx.execute(
          "DELETE FROM company_subcategories WHERE company_id = ?1",
          [&company_str],
        )?;

        for id in &location_ids {
          let id_str = encode_uuid(*id);
          if !exists(&tx, "SELECT 1 FROM locations WHERE location_id = ?1", &id_str)? {
            return Ok(Err(bizdir_core::Error::Validation(format!(
              "unknown location {id}"
            ))));
          }
          tx.execute(
            "INSERT INTO company_locations (company_id, location_id) VALUES (?1, ?2)",
            rusqlite::params![company_str, id_str],
          )?;
        }

        for id in &subcategory_ids {
          let id_str = encode_uuid(*id);
          if !exists(
            &tx,
            "SELECT 1 FROM subcategories WHERE subcategory_id = ?1",
            &id_str,
          )? {
            return Ok(Err(bizdir_core::Error::Validation(format!(
              "unknown sub-category {id}"
            ))));
          }
          tx.execute(
            "INSERT INTO company_subcategories (company_id, subcategory_id)
             VALUES (?1, ?2)",
            rusqlite::params![company_str, id_str],
          )?;
        }

        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn aggregated_attribute(
    &self,
    company_id: Uuid,
    kind: AttributeKind,
  ) -> Result<String> {
    let id_str = encode_uuid(company_id);
    let values = self
      .read(move |conn| Ok(attribute_values(conn, &id_str, kind)?))
      .await?;
    Ok(aggregate(values))
  }

  async fn company_profile(
    &self,
    company_id: Uuid,
  ) -> Result<Option<CompanyProfile>> {
    let id_str = encode_uuid(company_id);

    let raw: Option<RawProfile> = self
      .read(move |conn| {
        let head = conn
          .query_row(
            &format!(
              "SELECT {}, cat.name, t.turnover_id, t.display, t.short
               FROM companies c
               JOIN categories     cat ON cat.category_id = c.category_id
               JOIN turnover_bands t   ON t.turnover_id   = c.turnover_id
               WHERE c.company_id = ?1",
              RawCompany::COLUMNS
            ),
            [&id_str],
            |row| {
              Ok((
                RawCompany::from_row(row, 0)?,
                row.get::<_, String>(7)?,
                RawTurnover {
                  turnover_id: row.get(8)?,
                  display:     row.get(9)?,
                  short:       row.get(10)?,
                },
              ))
            },
          )
          .optional()?;

        let Some((company, category, turnover)) = head else {
          return Ok(None);
        };

        Ok(Some(RawProfile {
          company,
          category,
          turnover,
          locations:     attribute_values(conn, &id_str, AttributeKind::Locations)?,
          subcategories: attribute_values(conn, &id_str, AttributeKind::Subcategories)?,
          personnel:     attribute_values(conn, &id_str, AttributeKind::Personnel)?,
        }))
      })
      .await?;

    raw
      .map(|r| {
        Ok(CompanyProfile {
          company:       r.company.into_company()?,
          category:      r.category,
          turnover:      r.turnover.into_band()?,
          locations:     aggregate(r.locations),
          subcategories: aggregate(r.subcategories),
          personnel:     aggregate(r.personnel),
        })
      })
      .transpose()
  }

  async fn listings(&self) -> Result<Vec<Listing>> {
    let (raws, location_rows): (Vec<RawListing>, Vec<(String, String)>) = self
      .read(|conn| {
        let mut stmt = conn.prepare(
          "SELECT c.company_id, c.name, cat.name, t.turnover_id, t.display, t.short
           FROM companies c
           JOIN categories     cat ON cat.category_id = c.category_id
           JOIN turnover_bands t   ON t.turnover_id   = c.turnover_id
           WHERE c.status = 'active'",
        )?;
        let listings = stmt
          .query_map([], |row| {
            Ok(RawListing {
              company_id: row.get(0)?,
              name:       row.get(1)?,
              category:   row.get(2)?,
              turnover:   RawTurnover {
                turnover_id: row.get(3)?,
                display:     row.get(4)?,
                short:       row.get(5)?,
              },
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT cl.company_id, l.name
           FROM company_locations cl
           JOIN locations l ON l.location_id = cl.location_id
           JOIN companies c ON c.company_id  = cl.company_id
           WHERE c.status = 'active'",
        )?;
        let locations = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((listings, locations))
      })
      .await?;

    let mut by_company: HashMap<String, Vec<String>> = HashMap::new();
    for (company_id, name) in location_rows {
      by_company.entry(company_id).or_default().push(name);
    }

    raws
      .into_iter()
      .map(|raw| {
        let locations =
          aggregate(by_company.remove(&raw.company_id).unwrap_or_default());
        raw.into_listing(locations)
      })
      .collect()
  }

  // ── Connections ───────────────────────────────────────────────────────────

  async fn request_connection(&self, input: NewConnection) -> Result<Connection> {
    input.validate()?;

    let connection = Connection {
      connection_id:       Uuid::new_v4(),
      sender_company_id:   input.sender_company_id,
      receiver_company_id: input.receiver_company_id,
      status:              ConnectionState::Pending,
      message:             input.message.trim().to_owned(),
      reply_message:       None,
      created_at:          Utc::now(),
      updated_at:          None,
    };

    let id_str       = encode_uuid(connection.connection_id);
    let sender       = connection.sender_company_id;
    let receiver     = connection.receiver_company_id;
    let sender_str   = encode_uuid(sender);
    let receiver_str = encode_uuid(receiver);
    let status       = connection.status;
    let message      = connection.message.clone();
    let at_str       = encode_dt(connection.created_at);

    self
      .call(move |conn| {
        if !exists(conn, ACTIVE_COMPANY_EXISTS, &sender_str)? {
          return Ok(Err(bizdir_core::Error::CompanyNotFound(sender)));
        }
        if !exists(conn, ACTIVE_COMPANY_EXISTS, &receiver_str)? {
          return Ok(Err(bizdir_core::Error::CompanyNotFound(receiver)));
        }
        let inserted = conn.execute(
          "INSERT INTO connections (
             connection_id, sender_company_id, receiver_company_id,
             status, constatus, message, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (sender_company_id, receiver_company_id) DO NOTHING",
          rusqlite::params![
            id_str,
            sender_str,
            receiver_str,
            status.as_ref(),
            status.constatus(),
            message,
            at_str,
          ],
        )?;
        if inserted == 0 {
          return Ok(Err(bizdir_core::Error::DuplicateRequest { sender, receiver }));
        }
        Ok(Ok(()))
      })
      .await??;

    tracing::debug!(
      connection_id = %connection.connection_id,
      %sender,
      %receiver,
      "connection requested"
    );
    Ok(connection)
  }

  async fn act_on_connection(
    &self,
    connection_id: Uuid,
    actor: Uuid,
    action: ConnectionAction,
    reply_message: Option<String>,
  ) -> Result<Connection> {
    let reply = reply_message
      .map(|r| r.trim().to_owned())
      .filter(|r| !r.is_empty());
    if reply.as_ref().is_some_and(|r| r.chars().count() > MAX_MESSAGE_LEN) {
      return Err(
        bizdir_core::Error::Validation(format!(
          "reply exceeds {MAX_MESSAGE_LEN} characters"
        ))
        .into(),
      );
    }

    let id_str    = encode_uuid(connection_id);
    let actor_str = encode_uuid(actor);
    let now_str   = encode_dt(Utc::now());

    // Read, decide and write under one IMMEDIATE transaction, so concurrent
    // actions on the same edge serialise and observe each other's result.
    let (raw, applied) = self
      .call(move |conn| -> tokio_rusqlite::Result<Result<(RawConnection, bool)>> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(raw) = select_connection(&tx, &id_str)? else {
          return Ok(Err(
            bizdir_core::Error::ConnectionNotFound(connection_id).into(),
          ));
        };
        if raw.receiver_company_id != actor_str {
          return Ok(Err(bizdir_core::Error::NotReceiver(connection_id).into()));
        }
        let current = match decode_connection_state(&raw.status) {
          Ok(state) => state,
          Err(e) => return Ok(Err(e)),
        };

        let next = match plan_transition(connection_id, current, action) {
          Ok(Transition::Apply(next)) => next,
          Ok(Transition::Unchanged) => return Ok(Ok((raw, false))),
          Err(e) => return Ok(Err(e.into())),
        };

        tx.execute(
          "UPDATE connections
           SET status = ?2, constatus = ?3, reply_message = ?4, updated_at = ?5
           WHERE connection_id = ?1 AND status = 'pending'",
          rusqlite::params![id_str, next.as_ref(), next.constatus(), reply, now_str],
        )?;
        let updated = select_connection(&tx, &id_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(Ok((updated, true)))
      })
      .await??;

    let connection = raw.into_connection()?;
    if applied {
      tracing::debug!(
        %connection_id,
        status = %connection.status,
        "connection transition applied"
      );
    } else {
      tracing::debug!(%connection_id, "connection action repeated; no change");
    }
    Ok(connection)
  }

  async fn get_connection(&self, connection_id: Uuid) -> Result<Option<Connection>> {
    let id_str = encode_uuid(connection_id);
    let raw = self
      .read(move |conn| Ok(select_connection(conn, &id_str)?))
      .await?;
    raw.map(RawConnection::into_connection).transpose()
  }

  async fn status_of(
    &self,
    sender: Uuid,
    receiver: Uuid,
  ) -> Result<Option<ConnectionState>> {
    let sender_str = encode_uuid(sender);
    let receiver_str = encode_uuid(receiver);

    let raw: Option<String> = self
      .read(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT status FROM connections
               WHERE sender_company_id = ?1 AND receiver_company_id = ?2",
              rusqlite::params![sender_str, receiver_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_connection_state).transpose()
  }

  async fn connected(&self, a: Uuid, b: Uuid) -> Result<bool> {
    let a_str = encode_uuid(a);
    let b_str = encode_uuid(b);

    self
      .read(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM connections
             WHERE status = 'accepted'
               AND ((sender_company_id = ?1 AND receiver_company_id = ?2)
                 OR (sender_company_id = ?2 AND receiver_company_id = ?1))
           )",
          rusqlite::params![a_str, b_str],
          |row| row.get(0),
        )?)
      })
      .await
  }

  async fn connected_companies(&self, company_id: Uuid) -> Result<Vec<Uuid>> {
    let id_str = encode_uuid(company_id);

    let raws: Vec<String> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT receiver_company_id FROM connections
           WHERE status = 'accepted' AND sender_company_id = ?1
           UNION
           SELECT sender_company_id FROM connections
           WHERE status = 'accepted' AND receiver_company_id = ?1",
        )?;
        let rows = stmt
          .query_map([&id_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn pending_for(&self, receiver: Uuid) -> Result<Vec<Connection>> {
    let id_str = encode_uuid(receiver);

    let raws: Vec<RawConnection> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM connections
           WHERE receiver_company_id = ?1 AND status = 'pending'
           ORDER BY created_at, rowid",
          RawConnection::COLUMNS
        ))?;
        let rows = stmt
          .query_map([&id_str], RawConnection::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConnection::into_connection).collect()
  }

  // ── Audit ─────────────────────────────────────────────────────────────────

  async fn record_search(
    &self,
    user_id: Uuid,
    criteria: SearchCriteria,
  ) -> Result<()> {
    let user_str = encode_uuid(user_id);
    let line     = criteria.audit_line();
    let at_str   = encode_dt(Utc::now());

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO search_criteria_log (user_id, criteria, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![user_str, line, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| Error::AuditWriteFailed(Box::new(e)))
  }
}
