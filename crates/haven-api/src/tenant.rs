//! Tenant isolation and role checks.
//!
//! Extraction order is fixed by construction: [`TenantScope`] runs the
//! [`CurrentUser`] extractor before touching membership, and
//! [`TenantScope::require_role`] needs a resolved scope. Auth strictly
//! precedes tenant resolution, which strictly precedes the role check.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use haven_core::{
  resident::Identity,
  store::CommunityStore,
  tenant::{Membership, Role},
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// The authenticated caller with their tenant membership resolved.
///
/// When the request names a target tenant via the `tenant_id` query
/// parameter, extraction verifies the caller may access it; only
/// super-admins cross tenant boundaries.
pub struct TenantScope {
  pub user:      Identity,
  pub tenant_id: Uuid,
  pub role:      Role,
}

impl TenantScope {
  fn membership(&self) -> Membership {
    Membership { tenant_id: self.tenant_id, role: self.role }
  }

  /// Reject resources belonging to a tenant the caller may not access.
  pub fn assert_tenant(&self, tenant_id: Uuid) -> Result<(), ApiError> {
    if self.membership().may_access_tenant(tenant_id) {
      Ok(())
    } else {
      Err(ApiError::TenantIsolation(
        "Access denied to this tenant".to_string(),
      ))
    }
  }

  /// Role gate: 401 with the required set spelled out.
  pub fn require_role(&self, required: &[Role]) -> Result<(), ApiError> {
    if required.contains(&self.role) {
      return Ok(());
    }
    let wanted: Vec<String> = required.iter().map(Role::to_string).collect();
    Err(ApiError::Auth(format!("Required role: {}", wanted.join(" or "))))
  }
}

impl<S> FromRequestParts<AppState<S>> for TenantScope
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let current = CurrentUser::from_request_parts(parts, state).await?;

    // Any failure to establish the caller's tenant is an isolation
    // failure, not a plain 500 — without a tenant there is no safe way
    // to serve the request.
    let membership = match state.store.membership(current.identity.id).await {
      Ok(Some(membership)) => membership,
      Ok(None) => {
        return Err(ApiError::TenantIsolation(
          "Unable to verify tenant access".to_string(),
        ));
      }
      Err(e) => {
        tracing::error!(error = %e, "membership lookup failed");
        return Err(ApiError::TenantIsolation(
          "Unable to verify tenant access".to_string(),
        ));
      }
    };

    if let Some(requested) = requested_tenant(parts.uri.query())? {
      if !membership.may_access_tenant(requested) {
        return Err(ApiError::TenantIsolation(
          "Access denied to this tenant".to_string(),
        ));
      }
    }

    Ok(TenantScope {
      user:      current.identity,
      tenant_id: membership.tenant_id,
      role:      membership.role,
    })
  }
}

/// Parse an explicit `tenant_id` query parameter, if present.
fn requested_tenant(query: Option<&str>) -> Result<Option<Uuid>, ApiError> {
  let Some(raw) = query.and_then(|q| {
    q.split('&')
      .find_map(|pair| pair.strip_prefix("tenant_id="))
  }) else {
    return Ok(None);
  };
  let id = Uuid::parse_str(raw).map_err(|_| {
    ApiError::Validation("tenant_id is not a valid UUID".to_string())
  })?;
  Ok(Some(id))
}
