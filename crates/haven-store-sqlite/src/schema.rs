//! SQL schema for the Haven SQLite store.
//!
//! Replayed at every connection startup; the DDL is idempotent, so no
//! version check is needed yet. `PRAGMA user_version` stamps the schema
//! revision for migrations to key off once a second revision exists.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id                     TEXT PRIMARY KEY,
    tenant_id              TEXT NOT NULL,
    email                  TEXT NOT NULL UNIQUE,
    password_hash          TEXT NOT NULL,   -- argon2 PHC string
    role                   TEXT NOT NULL DEFAULT 'resident',
    last_sign_in_at        TEXT,            -- ISO 8601 UTC; NULL until first login

    first_name             TEXT,
    last_name              TEXT,
    lot_id                 TEXT,

    phone                  TEXT,
    birthday               TEXT,            -- YYYY-MM-DD
    birth_country          TEXT,
    current_country        TEXT,
    languages              TEXT,            -- JSON array or NULL
    preferred_language     TEXT,
    journey_stage          TEXT,
    estimated_move_in_date TEXT,            -- YYYY-MM-DD
    profile_picture_url    TEXT,
    neighborhood_id        TEXT,
    family_unit_id         TEXT,
    family_role            TEXT,
    about                  TEXT,
    open_to_requests       INTEGER,         -- 0/1 or NULL
    interests              TEXT NOT NULL DEFAULT '[]',
    skills                 TEXT NOT NULL DEFAULT '[]'
);

-- Sessions hold only token digests, never tokens.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,            -- hex SHA-256 of the token
    user_id    TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL
);

-- One settings row per user; the payload is the serialised PrivacySettings.
CREATE TABLE IF NOT EXISTS privacy_settings (
    user_id       TEXT PRIMARY KEY REFERENCES users(id),
    settings_json TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS users_tenant_idx   ON users(tenant_id);
CREATE INDEX IF NOT EXISTS users_family_idx   ON users(family_unit_id);
CREATE INDEX IF NOT EXISTS sessions_user_idx  ON sessions(user_id);

PRAGMA user_version = 1;
";
