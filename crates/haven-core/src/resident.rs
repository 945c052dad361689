//! Resident — the directory record other community members can look up.
//!
//! A resident is read far more often than it is written, and almost every
//! read happens on behalf of some *other* resident. The record therefore
//! splits into a small always-visible identity core and a larger set of
//! conditionally-visible attributes, each paired with a toggle in
//! [`PrivacySettings`](crate::privacy::PrivacySettings).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A community member as stored in and served from the directory.
///
/// `id`, `tenant_id`, `first_name`, `last_name` and `lot_id` are never
/// redacted. Everything else is subject to the owner's privacy settings
/// when viewed by a stranger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resident {
  pub id:        Uuid,
  pub tenant_id: Uuid,

  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub lot_id:     Option<Uuid>,

  pub email:    Option<String>,
  pub phone:    Option<String>,
  pub birthday: Option<NaiveDate>,

  pub birth_country:      Option<String>,
  pub current_country:    Option<String>,
  pub languages:          Option<Vec<String>>,
  pub preferred_language: Option<String>,

  pub journey_stage:          Option<String>,
  pub estimated_move_in_date: Option<NaiveDate>,
  pub profile_picture_url:    Option<String>,

  pub neighborhood_id: Option<Uuid>,
  pub family_unit_id:  Option<Uuid>,
  /// Free-text relationship within the family unit (e.g. "parent").
  pub family_role:     Option<String>,

  pub about:            Option<String>,
  pub open_to_requests: Option<bool>,

  #[serde(default)]
  pub interests: Vec<String>,
  #[serde(default)]
  pub skills:    Vec<String>,
}

/// Input for creating a resident.
///
/// `email` doubles as the login identifier; `password_hash` is an argon2
/// PHC string produced by the caller. Profile fields default to empty.
#[derive(Debug, Clone)]
pub struct NewResident {
  pub tenant_id:     Uuid,
  pub email:         String,
  pub password_hash: String,
  pub role:          crate::tenant::Role,

  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub lot_id:     Option<Uuid>,

  pub phone:    Option<String>,
  pub birthday: Option<NaiveDate>,

  pub birth_country:      Option<String>,
  pub current_country:    Option<String>,
  pub languages:          Option<Vec<String>>,
  pub preferred_language: Option<String>,

  pub journey_stage:          Option<String>,
  pub estimated_move_in_date: Option<NaiveDate>,
  pub profile_picture_url:    Option<String>,

  pub neighborhood_id: Option<Uuid>,
  pub family_unit_id:  Option<Uuid>,
  pub family_role:     Option<String>,

  pub about:            Option<String>,
  pub open_to_requests: Option<bool>,

  pub interests: Vec<String>,
  pub skills:    Vec<String>,
}

impl NewResident {
  /// A bare resident with login credentials and nothing else filled in.
  pub fn bare(
    tenant_id: Uuid,
    email: impl Into<String>,
    password_hash: impl Into<String>,
    role: crate::tenant::Role,
  ) -> Self {
    Self {
      tenant_id,
      email: email.into(),
      password_hash: password_hash.into(),
      role,
      first_name: None,
      last_name: None,
      lot_id: None,
      phone: None,
      birthday: None,
      birth_country: None,
      current_country: None,
      languages: None,
      preferred_language: None,
      journey_stage: None,
      estimated_move_in_date: None,
      profile_picture_url: None,
      neighborhood_id: None,
      family_unit_id: None,
      family_role: None,
      about: None,
      open_to_requests: None,
      interests: Vec::new(),
      skills: Vec::new(),
    }
  }
}

/// The provider-owned record of an authenticated caller.
///
/// `last_sign_in_at` belongs to the identity provider and is refreshed on
/// every successful login; the session gate keys its grace window off it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
  pub id:              Uuid,
  pub email:           String,
  pub last_sign_in_at: DateTime<Utc>,
}

/// Login credentials looked up by email.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user_id:       Uuid,
  /// Argon2 PHC string, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}
