//! SQL schema for the bizdir SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Reference data. Loaded from outside; the core only reads it.
CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subcategories (
    subcategory_id TEXT PRIMARY KEY,
    category_id    TEXT NOT NULL REFERENCES categories(category_id),
    name           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS locations (
    location_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS turnover_bands (
    turnover_id TEXT PRIMARY KEY,
    display     TEXT NOT NULL,
    short       TEXT NOT NULL
);

-- Companies are never deleted; `status` is a soft flag.
CREATE TABLE IF NOT EXISTS companies (
    company_id   TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    category_id  TEXT NOT NULL REFERENCES categories(category_id),
    turnover_id  TEXT NOT NULL REFERENCES turnover_bands(turnover_id),
    founded_year INTEGER NOT NULL,
    status       TEXT NOT NULL DEFAULT 'active'
                 CHECK (status IN ('active', 'inactive')),
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS company_locations (
    company_id  TEXT NOT NULL REFERENCES companies(company_id),
    location_id TEXT NOT NULL REFERENCES locations(location_id),
    PRIMARY KEY (company_id, location_id)
);

CREATE TABLE IF NOT EXISTS company_subcategories (
    company_id     TEXT NOT NULL REFERENCES companies(company_id),
    subcategory_id TEXT NOT NULL REFERENCES subcategories(subcategory_id),
    PRIMARY KEY (company_id, subcategory_id)
);

CREATE TABLE IF NOT EXISTS personnel (
    personnel_id TEXT PRIMARY KEY,
    company_id   TEXT NOT NULL REFERENCES companies(company_id),
    name         TEXT NOT NULL,
    designation  TEXT NOT NULL,
    phone        TEXT NOT NULL,
    email        TEXT NOT NULL
);

-- Directed connection requests. `constatus` mirrors `status` and is always
-- written together with it; the CHECK keeps them from diverging.
CREATE TABLE IF NOT EXISTS connections (
    connection_id       TEXT PRIMARY KEY,
    sender_company_id   TEXT NOT NULL REFERENCES companies(company_id),
    receiver_company_id TEXT NOT NULL REFERENCES companies(company_id),
    status              TEXT NOT NULL
                        CHECK (status IN ('pending', 'accepted', 'rejected')),
    constatus           TEXT NOT NULL
                        CHECK (constatus = CASE status WHEN 'accepted' THEN 'Y' ELSE 'N' END),
    message             TEXT NOT NULL,
    reply_message       TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT,
    UNIQUE (sender_company_id, receiver_company_id),
    CHECK  (sender_company_id != receiver_company_id)
);

-- Append-only. Never read by the directory core.
CREATE TABLE IF NOT EXISTS search_criteria_log (
    log_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    TEXT NOT NULL,
    criteria   TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS connections_receiver_idx
    ON connections(receiver_company_id, status, created_at);
CREATE INDEX IF NOT EXISTS personnel_company_idx ON personnel(company_id);
CREATE INDEX IF NOT EXISTS companies_status_idx  ON companies(status);

PRAGMA user_version = 1;
";
