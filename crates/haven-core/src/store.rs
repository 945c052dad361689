//! The `CommunityStore` trait.
//!
//! Implemented by storage backends (e.g. `haven-store-sqlite`) covering
//! both the identity side (sessions, credentials, membership) and the
//! directory side (residents, privacy settings). Higher layers
//! (`haven-api`) depend on this abstraction, not on any concrete backend.
//!
//! Session tokens never reach the store in the clear: callers pass the hex
//! SHA-256 digest of the token, and only digests are persisted.

use std::future::Future;

use uuid::Uuid;

use crate::{
  privacy::PrivacySettings,
  resident::{Credentials, Identity, NewResident, Resident},
  tenant::Membership,
};

/// Abstraction over the identity/record store backing a Haven deployment.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CommunityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identity ──────────────────────────────────────────────────────────

  /// Resolve a session-token digest to the identity that owns it.
  /// Returns `None` for unknown or revoked tokens.
  fn resolve_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Record a new session for `user_id` and refresh the identity's
  /// `last_sign_in_at` to now. Returns the refreshed identity.
  fn start_session<'a>(
    &'a self,
    user_id: Uuid,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + 'a;

  /// Revoke a session. Revoking an unknown token is not an error.
  fn revoke_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Look up login credentials by email. Returns `None` for unknown
  /// addresses; the caller decides how to report that without leaking
  /// which addresses exist.
  fn credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  // ── Membership ────────────────────────────────────────────────────────

  /// Resolve a user's tenant membership. Re-queried on every request;
  /// never cached by callers.
  fn membership(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Membership>, Self::Error>> + Send + '_;

  // ── Residents ─────────────────────────────────────────────────────────

  /// Create and persist a new resident.
  fn create_resident(
    &self,
    input: NewResident,
  ) -> impl Future<Output = Result<Resident, Self::Error>> + Send + '_;

  /// Retrieve a resident by id. Returns `None` if not found.
  fn get_resident(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Resident>, Self::Error>> + Send + '_;

  /// List all residents of one tenant, ordered by last then first name.
  fn list_residents(
    &self,
    tenant_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Resident>, Self::Error>> + Send + '_;

  // ── Privacy settings ──────────────────────────────────────────────────

  /// The effective privacy settings for a resident, already normalised to
  /// zero-or-one rows. `None` means no policy (fully visible).
  fn privacy_settings(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<PrivacySettings>, Self::Error>>
  + Send
  + '_;

  /// Replace a resident's privacy settings. Only the record's owner may
  /// reach this through the API.
  fn upsert_privacy_settings<'a>(
    &'a self,
    user_id: Uuid,
    settings: &'a PrivacySettings,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
