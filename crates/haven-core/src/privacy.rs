//! Per-field privacy policy over resident records.
//!
//! Every redactable field on [`Resident`] is paired with one toggle here.
//! A toggle that is absent (`None`) means *visible*; only an explicit
//! `Some(false)` hides the field. A subject with no settings row at all is
//! fully visible to everyone. Both rules fail open on purpose: the
//! directory serves a trusted community, and a resident who never touched
//! their settings expects to be findable. Revisit before exposing the
//! directory more widely.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resident::Resident;

// ─── Settings ────────────────────────────────────────────────────────────────

/// The owner-controlled visibility toggles for one resident.
///
/// Serialised as a flat JSON object; unset toggles are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
  pub show_email:                  Option<bool>,
  pub show_phone:                  Option<bool>,
  pub show_birthday:               Option<bool>,
  pub show_birth_country:          Option<bool>,
  pub show_current_country:        Option<bool>,
  pub show_languages:              Option<bool>,
  pub show_preferred_language:     Option<bool>,
  pub show_journey_stage:          Option<bool>,
  pub show_estimated_move_in_date: Option<bool>,
  pub show_profile_picture:        Option<bool>,
  pub show_neighborhood:           Option<bool>,
  pub show_family:                 Option<bool>,
  pub show_family_relationships:   Option<bool>,
  pub show_interests:              Option<bool>,
  pub show_skills:                 Option<bool>,
  pub show_open_to_requests:       Option<bool>,
  pub show_about:                  Option<bool>,
}

/// Absent toggles fail open: only an explicit `false` hides a field.
fn shown(toggle: Option<bool>) -> bool {
  toggle != Some(false)
}

/// Normalise zero-or-more stored settings rows to the single effective
/// policy. The first row is authoritative; no rows means no policy.
pub fn effective_settings(
  rows: Vec<PrivacySettings>,
) -> Option<PrivacySettings> {
  rows.into_iter().next()
}

// ─── Viewer classification ───────────────────────────────────────────────────

/// How the viewer relates to the subject being read.
///
/// Anything other than `Stranger` grants full visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerRelationship {
  /// The subject reading their own record.
  Own,
  /// Viewer and subject share a family unit.
  Family,
  /// Viewer holds an elevated role in the subject's tenant.
  TenantAdmin,
  Stranger,
}

impl ViewerRelationship {
  /// Classify `viewer` against `subject`. Precedence: own, then admin,
  /// then family — though all three short-circuit redaction identically.
  pub fn classify(
    viewer_id: Uuid,
    viewer_family_unit_id: Option<Uuid>,
    viewer_is_admin: bool,
    subject: &Resident,
  ) -> Self {
    if viewer_id == subject.id {
      ViewerRelationship::Own
    } else if viewer_is_admin {
      ViewerRelationship::TenantAdmin
    } else if are_family_members(viewer_family_unit_id, subject.family_unit_id)
    {
      ViewerRelationship::Family
    } else {
      ViewerRelationship::Stranger
    }
  }

  pub fn bypasses_privacy(self) -> bool {
    !matches!(self, ViewerRelationship::Stranger)
  }
}

/// Two residents are family members when they share a family unit.
/// A missing unit on either side never matches.
pub fn are_family_members(a: Option<Uuid>, b: Option<Uuid>) -> bool {
  matches!((a, b), (Some(a), Some(b)) if a == b)
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Redact `subject` for a viewer who is not the subject themselves.
///
/// The self-view check is the caller's job (see
/// [`ViewerRelationship::classify`]); this function only applies the
/// per-field policy. It is pure and total: malformed or missing settings
/// degrade to full visibility, never to an error.
///
/// Identity fields (`id`, `tenant_id`, name, `lot_id`) are never redacted.
/// List-typed fields (`interests`, `skills`) are emptied rather than
/// nulled; `languages` is nullable in the record and is nulled.
pub fn filter_resident(
  subject: &Resident,
  settings: Option<&PrivacySettings>,
  viewer_is_family: bool,
  viewer_is_admin: bool,
) -> Resident {
  let mut out = subject.clone();

  if viewer_is_family || viewer_is_admin {
    return out;
  }
  let Some(s) = settings else {
    return out;
  };

  if !shown(s.show_email) {
    out.email = None;
  }
  if !shown(s.show_phone) {
    out.phone = None;
  }
  if !shown(s.show_birthday) {
    out.birthday = None;
  }
  if !shown(s.show_birth_country) {
    out.birth_country = None;
  }
  if !shown(s.show_current_country) {
    out.current_country = None;
  }
  if !shown(s.show_languages) {
    out.languages = None;
  }
  if !shown(s.show_preferred_language) {
    out.preferred_language = None;
  }
  if !shown(s.show_journey_stage) {
    out.journey_stage = None;
  }
  if !shown(s.show_estimated_move_in_date) {
    out.estimated_move_in_date = None;
  }
  if !shown(s.show_profile_picture) {
    out.profile_picture_url = None;
  }
  if !shown(s.show_neighborhood) {
    out.neighborhood_id = None;
  }
  if !shown(s.show_family) {
    out.family_unit_id = None;
  }
  if !shown(s.show_family_relationships) {
    out.family_role = None;
  }
  if !shown(s.show_interests) {
    out.interests = Vec::new();
  }
  if !shown(s.show_skills) {
    out.skills = Vec::new();
  }
  if !shown(s.show_open_to_requests) {
    out.open_to_requests = None;
  }
  if !shown(s.show_about) {
    out.about = None;
  }

  out
}
