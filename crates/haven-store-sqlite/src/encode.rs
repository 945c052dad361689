//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as
//! `YYYY-MM-DD`, list fields as compact JSON arrays, UUIDs as hyphenated
//! lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use haven_core::resident::Resident;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── JSON string lists ───────────────────────────────────────────────────────

pub fn encode_list(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_list(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Raw resident row ────────────────────────────────────────────────────────

/// Column order used by every resident SELECT.
pub const RESIDENT_COLUMNS: &str = "id, tenant_id, first_name, last_name, \
  lot_id, email, phone, birthday, birth_country, current_country, languages, \
  preferred_language, journey_stage, estimated_move_in_date, \
  profile_picture_url, neighborhood_id, family_unit_id, family_role, about, \
  open_to_requests, interests, skills";

/// A resident row exactly as read from SQLite, before any decoding.
/// Decoding happens outside the connection closure so the closure only
/// deals with `rusqlite` errors.
pub struct RawResident {
  pub id:                     String,
  pub tenant_id:              String,
  pub first_name:             Option<String>,
  pub last_name:              Option<String>,
  pub lot_id:                 Option<String>,
  pub email:                  Option<String>,
  pub phone:                  Option<String>,
  pub birthday:               Option<String>,
  pub birth_country:          Option<String>,
  pub current_country:        Option<String>,
  pub languages:              Option<String>,
  pub preferred_language:     Option<String>,
  pub journey_stage:          Option<String>,
  pub estimated_move_in_date: Option<String>,
  pub profile_picture_url:    Option<String>,
  pub neighborhood_id:        Option<String>,
  pub family_unit_id:         Option<String>,
  pub family_role:            Option<String>,
  pub about:                  Option<String>,
  pub open_to_requests:       Option<bool>,
  pub interests:              String,
  pub skills:                 String,
}

impl RawResident {
  /// Read a row whose SELECT list is [`RESIDENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      tenant_id: row.get(1)?,
      first_name: row.get(2)?,
      last_name: row.get(3)?,
      lot_id: row.get(4)?,
      email: row.get(5)?,
      phone: row.get(6)?,
      birthday: row.get(7)?,
      birth_country: row.get(8)?,
      current_country: row.get(9)?,
      languages: row.get(10)?,
      preferred_language: row.get(11)?,
      journey_stage: row.get(12)?,
      estimated_move_in_date: row.get(13)?,
      profile_picture_url: row.get(14)?,
      neighborhood_id: row.get(15)?,
      family_unit_id: row.get(16)?,
      family_role: row.get(17)?,
      about: row.get(18)?,
      open_to_requests: row.get(19)?,
      interests: row.get(20)?,
      skills: row.get(21)?,
    })
  }

  pub fn into_resident(self) -> Result<Resident> {
    Ok(Resident {
      id: decode_uuid(&self.id)?,
      tenant_id: decode_uuid(&self.tenant_id)?,
      first_name: self.first_name,
      last_name: self.last_name,
      lot_id: decode_opt_uuid(self.lot_id)?,
      email: self.email,
      phone: self.phone,
      birthday: decode_opt_date(self.birthday)?,
      birth_country: self.birth_country,
      current_country: self.current_country,
      languages: self.languages.as_deref().map(decode_list).transpose()?,
      preferred_language: self.preferred_language,
      journey_stage: self.journey_stage,
      estimated_move_in_date: decode_opt_date(self.estimated_move_in_date)?,
      profile_picture_url: self.profile_picture_url,
      neighborhood_id: decode_opt_uuid(self.neighborhood_id)?,
      family_unit_id: decode_opt_uuid(self.family_unit_id)?,
      family_role: self.family_role,
      about: self.about,
      open_to_requests: self.open_to_requests,
      interests: decode_list(&self.interests)?,
      skills: decode_list(&self.skills)?,
    })
  }
}
