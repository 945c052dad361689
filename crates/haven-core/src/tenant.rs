//! Tenancy and roles.
//!
//! A tenant is an isolated community: nothing inside it is visible to
//! callers from another tenant, with the single exception of super-admins.
//! Membership is resolved from the store on every request — it is never
//! cached across requests.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// The caller's role within their tenant.
///
/// `SuperAdmin` is the only role allowed to cross tenant boundaries.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  #[default]
  Resident,
  TenantAdmin,
  SuperAdmin,
}

impl Role {
  /// Whether this role bypasses per-field privacy within its own tenant.
  pub fn sees_private_fields(self) -> bool {
    matches!(self, Role::TenantAdmin | Role::SuperAdmin)
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Role::Resident => "resident",
      Role::TenantAdmin => "tenant_admin",
      Role::SuperAdmin => "super_admin",
    };
    f.write_str(s)
  }
}

impl FromStr for Role {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "resident" => Ok(Role::Resident),
      "tenant_admin" => Ok(Role::TenantAdmin),
      "super_admin" => Ok(Role::SuperAdmin),
      other => Err(Error::UnknownRole(other.to_string())),
    }
  }
}

/// The caller's tenant membership, resolved per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
  pub tenant_id: Uuid,
  pub role:      Role,
}

impl Membership {
  /// Tenant-isolation invariant: a non-super-admin may only touch
  /// resources in their own tenant.
  pub fn may_access_tenant(&self, requested: Uuid) -> bool {
    self.role == Role::SuperAdmin || self.tenant_id == requested
  }
}
