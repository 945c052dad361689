//! [`SqliteStore`] — the SQLite implementation of [`CommunityStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use haven_core::{
  privacy::{PrivacySettings, effective_settings},
  resident::{Credentials, Identity, NewResident, Resident},
  store::CommunityStore,
  tenant::{Membership, Role},
};

use crate::{
  Error, Result,
  encode::{
    RESIDENT_COLUMNS, RawResident, encode_date, encode_dt, encode_list,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Haven community store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── CommunityStore implementation ───────────────────────────────────────────

impl CommunityStore for SqliteStore {
  type Error = Error;

  // ── Identity ──────────────────────────────────────────────────────────

  async fn resolve_session(
    &self,
    token_hash: &str,
  ) -> Result<Option<Identity>> {
    let hash = token_hash.to_owned();

    let row: Option<(String, String, String)> = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT u.id, u.email,
                    COALESCE(u.last_sign_in_at, s.created_at)
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?1",
            rusqlite::params![hash],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;
        Ok(row)
      })
      .await?;

    row
      .map(|(id, email, signed_in)| {
        Ok(Identity {
          id:              crate::encode::decode_uuid(&id)?,
          email,
          last_sign_in_at: crate::encode::decode_dt(&signed_in)?,
        })
      })
      .transpose()
  }

  async fn start_session(
    &self,
    user_id: Uuid,
    token_hash: &str,
  ) -> Result<Identity> {
    let id_str = encode_uuid(user_id);
    let hash = token_hash.to_owned();
    let now = Utc::now();
    let now_str = encode_dt(now);

    let email: Option<String> = self
      .conn
      .call(move |conn| {
        let email: Option<String> = conn
          .query_row(
            "SELECT email FROM users WHERE id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;

        if email.is_some() {
          conn.execute(
            "UPDATE users SET last_sign_in_at = ?2 WHERE id = ?1",
            rusqlite::params![id_str, now_str],
          )?;
          conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![hash, id_str, now_str],
          )?;
        }
        Ok(email)
      })
      .await?;

    let email = email.ok_or(Error::UserNotFound(user_id))?;
    Ok(Identity { id: user_id, email, last_sign_in_at: now })
  }

  async fn revoke_session(&self, token_hash: &str) -> Result<()> {
    let hash = token_hash.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![hash],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn credentials(&self, email: &str) -> Result<Option<Credentials>> {
    let email = email.to_owned();

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT id, password_hash FROM users WHERE email = ?1",
            rusqlite::params![email],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        Ok(row)
      })
      .await?;

    row
      .map(|(id, password_hash)| {
        Ok(Credentials {
          user_id: crate::encode::decode_uuid(&id)?,
          password_hash,
        })
      })
      .transpose()
  }

  // ── Membership ────────────────────────────────────────────────────────

  async fn membership(&self, user_id: Uuid) -> Result<Option<Membership>> {
    let id_str = encode_uuid(user_id);

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT tenant_id, role FROM users WHERE id = ?1",
            rusqlite::params![id_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        Ok(row)
      })
      .await?;

    row
      .map(|(tenant_id, role)| {
        Ok(Membership {
          tenant_id: crate::encode::decode_uuid(&tenant_id)?,
          role:      role.parse::<Role>().map_err(Error::Core)?,
        })
      })
      .transpose()
  }

  // ── Residents ─────────────────────────────────────────────────────────

  async fn create_resident(&self, input: NewResident) -> Result<Resident> {
    let id = Uuid::new_v4();

    let resident = Resident {
      id,
      tenant_id: input.tenant_id,
      first_name: input.first_name,
      last_name: input.last_name,
      lot_id: input.lot_id,
      email: Some(input.email.clone()),
      phone: input.phone,
      birthday: input.birthday,
      birth_country: input.birth_country,
      current_country: input.current_country,
      languages: input.languages,
      preferred_language: input.preferred_language,
      journey_stage: input.journey_stage,
      estimated_move_in_date: input.estimated_move_in_date,
      profile_picture_url: input.profile_picture_url,
      neighborhood_id: input.neighborhood_id,
      family_unit_id: input.family_unit_id,
      family_role: input.family_role,
      about: input.about,
      open_to_requests: input.open_to_requests,
      interests: input.interests,
      skills: input.skills,
    };

    let id_str = encode_uuid(id);
    let tenant_str = encode_uuid(resident.tenant_id);
    let email = input.email;
    let password_hash = input.password_hash;
    let role = input.role.to_string();
    let first_name = resident.first_name.clone();
    let last_name = resident.last_name.clone();
    let lot_id = resident.lot_id.map(encode_uuid);
    let phone = resident.phone.clone();
    let birthday = resident.birthday.map(encode_date);
    let birth_country = resident.birth_country.clone();
    let current_country = resident.current_country.clone();
    let languages = resident
      .languages
      .as_deref()
      .map(encode_list)
      .transpose()?;
    let preferred_language = resident.preferred_language.clone();
    let journey_stage = resident.journey_stage.clone();
    let move_in = resident.estimated_move_in_date.map(encode_date);
    let picture = resident.profile_picture_url.clone();
    let neighborhood = resident.neighborhood_id.map(encode_uuid);
    let family_unit = resident.family_unit_id.map(encode_uuid);
    let family_role = resident.family_role.clone();
    let about = resident.about.clone();
    let open_to_requests = resident.open_to_requests;
    let interests = encode_list(&resident.interests)?;
    let skills = encode_list(&resident.skills)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             id, tenant_id, email, password_hash, role,
             first_name, last_name, lot_id,
             phone, birthday, birth_country, current_country, languages,
             preferred_language, journey_stage, estimated_move_in_date,
             profile_picture_url, neighborhood_id, family_unit_id,
             family_role, about, open_to_requests, interests, skills
           ) VALUES (
             ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
             ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
           )",
          rusqlite::params![
            id_str,
            tenant_str,
            email,
            password_hash,
            role,
            first_name,
            last_name,
            lot_id,
            phone,
            birthday,
            birth_country,
            current_country,
            languages,
            preferred_language,
            journey_stage,
            move_in,
            picture,
            neighborhood,
            family_unit,
            family_role,
            about,
            open_to_requests,
            interests,
            skills,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(resident)
  }

  async fn get_resident(&self, id: Uuid) -> Result<Option<Resident>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawResident> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {RESIDENT_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![id_str],
            RawResident::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawResident::into_resident).transpose()
  }

  async fn list_residents(&self, tenant_id: Uuid) -> Result<Vec<Resident>> {
    let tenant_str = encode_uuid(tenant_id);

    let raws: Vec<RawResident> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RESIDENT_COLUMNS} FROM users
           WHERE tenant_id = ?1
           ORDER BY last_name, first_name"
        ))?;
        let raws = stmt
          .query_map(rusqlite::params![tenant_str], RawResident::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawResident::into_resident).collect()
  }

  // ── Privacy settings ──────────────────────────────────────────────────

  async fn privacy_settings(
    &self,
    user_id: Uuid,
  ) -> Result<Option<PrivacySettings>> {
    let id_str = encode_uuid(user_id);

    let rows: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT settings_json FROM privacy_settings
           WHERE user_id = ?1
           ORDER BY updated_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    // The newest row is authoritative should the table ever hold more
    // than one per user.
    let parsed = rows
      .into_iter()
      .map(|j| serde_json::from_str(&j).map_err(Error::Json))
      .collect::<Result<Vec<_>>>()?;
    Ok(effective_settings(parsed))
  }

  async fn upsert_privacy_settings(
    &self,
    user_id: Uuid,
    settings: &PrivacySettings,
  ) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let json = serde_json::to_string(settings)?;
    let now_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO privacy_settings (user_id, settings_json, updated_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(user_id) DO UPDATE SET
             settings_json = excluded.settings_json,
             updated_at    = excluded.updated_at",
          rusqlite::params![id_str, json, now_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
