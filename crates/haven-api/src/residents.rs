//! Handlers for the resident directory and privacy settings.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/residents` | Paginated; privacy-filtered per viewer |
//! | `GET`  | `/api/residents/{id}` | 404 if missing, 403 cross-tenant |
//! | `GET`  | `/api/privacy` | The caller's own settings |
//! | `PUT`  | `/api/privacy` | Replace the caller's settings |
//! | `GET`  | `/api/admin/residents` | Unfiltered; admin roles only |

use axum::{
  Json,
  extract::{Path, Query, State},
  response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

use haven_core::{
  privacy::{PrivacySettings, ViewerRelationship, filter_resident},
  resident::Resident,
  store::CommunityStore,
  tenant::Role,
};

use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  response::{self, Meta},
  tenant::TenantScope,
};

const MAX_PAGE_SIZE: u64 = 100;

// ─── Privacy application ─────────────────────────────────────────────────────

/// Redact `subject` for the caller. The self/family/admin classification
/// happens here; the filter itself only applies the per-field policy.
async fn redact_for_viewer<S>(
  state: &AppState<S>,
  scope: &TenantScope,
  viewer_family_unit: Option<Uuid>,
  subject: Resident,
) -> Result<Resident, ApiError>
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  let relationship = ViewerRelationship::classify(
    scope.user.id,
    viewer_family_unit,
    scope.role.sees_private_fields(),
    &subject,
  );
  if relationship.bypasses_privacy() {
    return Ok(subject);
  }

  let settings = state
    .store
    .privacy_settings(subject.id)
    .await
    .map_err(ApiError::store)?;
  Ok(filter_resident(&subject, settings.as_ref(), false, false))
}

/// The viewer's own family unit, needed to classify family members.
async fn viewer_family_unit<S>(
  state: &AppState<S>,
  scope: &TenantScope,
) -> Result<Option<Uuid>, ApiError>
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  Ok(
    state
      .store
      .get_resident(scope.user.id)
      .await
      .map_err(ApiError::store)?
      .and_then(|r| r.family_unit_id),
  )
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Explicit target tenant; isolation is enforced by [`TenantScope`].
  pub tenant_id: Option<Uuid>,
  pub page:      Option<u64>,
  pub limit:     Option<u64>,
}

/// `GET /api/residents[?tenant_id=…&page=…&limit=…]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  scope: TenantScope,
  Query(params): Query<ListParams>,
) -> Result<Response, ApiError>
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  let tenant = params.tenant_id.unwrap_or(scope.tenant_id);
  let page = params.page.unwrap_or(1).max(1);
  let limit = params.limit.unwrap_or(50);
  if limit == 0 || limit > MAX_PAGE_SIZE {
    return Err(ApiError::Validation(format!(
      "limit must be between 1 and {MAX_PAGE_SIZE}"
    )));
  }

  let family_unit = viewer_family_unit(&state, &scope).await?;

  let all = state
    .store
    .list_residents(tenant)
    .await
    .map_err(ApiError::store)?;
  let total = all.len() as u64;
  // `page` comes straight off the query string; saturate rather than
  // trust it to multiply within range. An absurd page is an empty page.
  let start = page.saturating_sub(1).saturating_mul(limit) as usize;

  let mut data = Vec::new();
  for subject in all.into_iter().skip(start).take(limit as usize) {
    data.push(redact_for_viewer(&state, &scope, family_unit, subject).await?);
  }

  let has_more = (start as u64).saturating_add(data.len() as u64) < total;
  Ok(response::page(data, Meta { page, limit, total, has_more }))
}

/// `GET /api/residents/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  scope: TenantScope,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  let subject = state
    .store
    .get_resident(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("resident {id} not found")))?;

  scope.assert_tenant(subject.tenant_id)?;

  let family_unit = viewer_family_unit(&state, &scope).await?;
  let filtered = redact_for_viewer(&state, &scope, family_unit, subject).await?;
  Ok(response::ok(filtered))
}

// ─── Privacy settings ────────────────────────────────────────────────────────

/// `GET /api/privacy` — the caller's own settings; `null` when none set.
pub async fn get_settings<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Response, ApiError>
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  let settings = state
    .store
    .privacy_settings(user.identity.id)
    .await
    .map_err(ApiError::store)?;
  Ok(response::ok(settings))
}

/// `PUT /api/privacy` — replace the caller's settings wholesale.
pub async fn put_settings<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(settings): Json<PrivacySettings>,
) -> Result<Response, ApiError>
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .upsert_privacy_settings(user.identity.id, &settings)
    .await
    .map_err(ApiError::store)?;
  Ok(response::ok(settings))
}

// ─── Admin ───────────────────────────────────────────────────────────────────

/// `GET /api/admin/residents` — the unfiltered roster for the caller's
/// tenant. Requires an admin role.
pub async fn admin_list<S>(
  State(state): State<AppState<S>>,
  scope: TenantScope,
) -> Result<Response, ApiError>
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  scope.require_role(&[Role::TenantAdmin, Role::SuperAdmin])?;

  let all = state
    .store
    .list_residents(scope.tenant_id)
    .await
    .map_err(ApiError::store)?;
  Ok(response::ok(all))
}
