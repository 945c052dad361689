//! Inactivity-timeout gate.
//!
//! Runs before every route as an axum middleware. For requests carrying a
//! resolvable session it either lets the request through (rewriting the
//! `last-active` cookie) or terminates the session: best-effort revocation
//! at the store plus a redirect to the tenant's login page with
//! `?reason=timeout`. Requests without a session pass through untouched —
//! enforcing authentication is the extractors' job.
//!
//! The decision itself is a pure function over the identity, the cookies
//! and the clock, so every rule has a direct unit test.

use axum::{
  extract::{Request, State},
  http::{HeaderValue, header},
  middleware::Next,
  response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};

use haven_core::{resident::Identity, store::CommunityStore};

use crate::{
  AppState,
  auth::{SESSION_COOKIE, clear_cookie, cookie_value, set_cookie, token_digest},
};

/// Presence of this cookie disables timeout enforcement entirely.
pub const REMEMBER_COOKIE: &str = "remember-me";

/// Millisecond timestamp of the last request that passed the gate.
pub const LAST_ACTIVE_COOKIE: &str = "last-active";

/// A session with no activity for this long is terminated.
pub const INACTIVITY_TIMEOUT_SECS: i64 = 2 * 60 * 60;

/// With no activity baseline at all, cookie absence alone says nothing
/// about staleness; a sign-in within this window is let through and seeds
/// the baseline, anything older is treated as stale.
pub const LOGIN_GRACE_SECS: i64 = 5 * 60;

// ─── Decision ────────────────────────────────────────────────────────────────

/// Outcome of evaluating one request against the timeout rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionVerdict {
  Continue {
    /// Millisecond timestamp to write back as `last-active`, when the
    /// baseline should be refreshed or seeded.
    refresh_last_active: Option<i64>,
  },
  Expire {
    /// Tenant-scoped login path with `reason=timeout`.
    location: String,
  },
}

/// Apply the timeout rules for an authenticated request.
///
/// Rules, in order:
/// 1. Login paths and remembered sessions always continue, untouched.
/// 2. A `last-active` baseline within [`INACTIVITY_TIMEOUT_SECS`]
///    continues and is refreshed to `now`.
/// 3. A baseline older than the timeout expires the session.
/// 4. No baseline (or an unparseable one): a sign-in within
///    [`LOGIN_GRACE_SECS`] continues and seeds the baseline; anything
///    older is treated as stale.
pub fn evaluate_session(
  identity: &Identity,
  remember_me: bool,
  last_active: Option<&str>,
  path: &str,
  now: DateTime<Utc>,
) -> SessionVerdict {
  if is_login_path(path) || remember_me {
    return SessionVerdict::Continue { refresh_last_active: None };
  }

  let now_ms = now.timestamp_millis();

  match last_active.and_then(|s| s.parse::<i64>().ok()) {
    Some(active_ms) => {
      if now_ms - active_ms > INACTIVITY_TIMEOUT_SECS * 1000 {
        SessionVerdict::Expire { location: timeout_redirect(path) }
      } else {
        SessionVerdict::Continue { refresh_last_active: Some(now_ms) }
      }
    }
    None => {
      let since_sign_in = (now - identity.last_sign_in_at).num_seconds();
      if since_sign_in <= LOGIN_GRACE_SECS {
        SessionVerdict::Continue { refresh_last_active: Some(now_ms) }
      } else {
        SessionVerdict::Expire { location: timeout_redirect(path) }
      }
    }
  }
}

/// `/t/<slug>/login?reason=timeout` when the request path carries a tenant
/// segment, bare `/login?reason=timeout` otherwise.
pub fn timeout_redirect(path: &str) -> String {
  match tenant_slug(path) {
    Some(slug) => format!("/t/{slug}/login?reason=timeout"),
    None => "/login?reason=timeout".to_string(),
  }
}

fn tenant_slug(path: &str) -> Option<&str> {
  let rest = path.strip_prefix("/t/")?;
  let slug = rest.split('/').next()?;
  (!slug.is_empty()).then_some(slug)
}

fn is_login_path(path: &str) -> bool {
  path == "/login" || path.ends_with("/login")
}

// ─── Middleware ──────────────────────────────────────────────────────────────

/// Axum middleware applying [`evaluate_session`] to every request.
pub async fn session_gate<S>(
  State(state): State<AppState<S>>,
  request: Request,
  next: Next,
) -> Response
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  let headers = request.headers();
  let path = request.uri().path().to_string();

  // No token, or a token the store does not recognise: pass through and
  // let the auth extractor produce the 401. A store failure here also
  // passes through — the gate only ever terminates sessions it could
  // positively identify as stale.
  let Some(token) = cookie_value(headers, SESSION_COOKIE) else {
    return next.run(request).await;
  };
  let token_hash = token_digest(&token);
  let identity = match state.store.resolve_session(&token_hash).await {
    Ok(Some(identity)) => identity,
    Ok(None) => return next.run(request).await,
    Err(e) => {
      tracing::error!(error = %e, "session lookup failed in gate");
      return next.run(request).await;
    }
  };

  let remember_me = cookie_value(headers, REMEMBER_COOKIE).is_some();
  let last_active = cookie_value(headers, LAST_ACTIVE_COOKIE);

  match evaluate_session(
    &identity,
    remember_me,
    last_active.as_deref(),
    &path,
    Utc::now(),
  ) {
    SessionVerdict::Continue { refresh_last_active } => {
      let mut res = next.run(request).await;
      if let Some(ms) = refresh_last_active {
        res.headers_mut().append(
          header::SET_COOKIE,
          last_active_cookie(ms, state.config.production),
        );
      }
      res
    }
    SessionVerdict::Expire { location } => {
      tracing::info!(user = %identity.id, "session timed out");

      // Best effort: the security-relevant action is clearing the cookie
      // and redirecting, not guaranteeing store-side revocation.
      if let Err(e) = state.store.revoke_session(&token_hash).await {
        tracing::warn!(error = %e, "session revocation failed on timeout");
      }

      let secure = state.config.production;
      let mut res = Redirect::to(&location).into_response();
      let headers = res.headers_mut();
      headers.append(header::SET_COOKIE, clear_cookie(SESSION_COOKIE, secure));
      headers
        .append(header::SET_COOKIE, clear_cookie(LAST_ACTIVE_COOKIE, secure));
      res
    }
  }
}

/// The refreshed activity cookie: max-age equal to the timeout itself.
pub fn last_active_cookie(ms: i64, secure: bool) -> HeaderValue {
  set_cookie(
    LAST_ACTIVE_COOKIE,
    &ms.to_string(),
    Some(INACTIVITY_TIMEOUT_SECS),
    secure,
  )
}
