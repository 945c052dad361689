//! Identity resolution: session tokens, the `CurrentUser` extractor, the
//! per-user rate limit, and the login/logout handlers.
//!
//! Tokens are 32 bytes of OS entropy, sent to the client as a hex string
//! in an httpOnly cookie and persisted only as a SHA-256 digest. Password
//! verification uses argon2 PHC strings, as stored by the community store.

use std::{collections::HashMap, time::Duration};

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  Json,
  extract::{FromRequestParts, State},
  http::{HeaderMap, HeaderValue, header, request::Parts},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use parking_lot::Mutex;
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use uuid::Uuid;

use haven_core::{resident::Identity, store::CommunityStore};

use crate::{
  AppState,
  error::ApiError,
  response,
  session::{self, LAST_ACTIVE_COOKIE, REMEMBER_COOKIE},
};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session-token";

/// Lifetime of a remembered session's cookies.
const REMEMBER_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// Generate a fresh session token. Returns `(token, digest)`; only the
/// digest is ever handed to the store.
pub fn issue_token() -> (String, String) {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let token = hex::encode(bytes);
  let digest = token_digest(&token);
  (token, digest)
}

/// Hex SHA-256 digest of a session token.
pub fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

// ─── Cookies ─────────────────────────────────────────────────────────────────

/// Read a single cookie value from the `Cookie` header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
  let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
  cookies.split(';').find_map(|pair| {
    let (k, v) = pair.trim().split_once('=')?;
    (k == name).then(|| v.to_string())
  })
}

/// Build a `Set-Cookie` value: httpOnly, SameSite=Lax, Path=/, `Secure`
/// only in production.
pub fn set_cookie(
  name: &str,
  value: &str,
  max_age: Option<i64>,
  secure: bool,
) -> HeaderValue {
  let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
  if let Some(secs) = max_age {
    cookie.push_str(&format!("; Max-Age={secs}"));
  }
  if secure {
    cookie.push_str("; Secure");
  }
  // Names and values are internally generated ASCII.
  HeaderValue::from_str(&cookie).expect("cookie is valid ASCII")
}

/// A `Set-Cookie` value that deletes the named cookie.
pub fn clear_cookie(name: &str, secure: bool) -> HeaderValue {
  set_cookie(name, "", Some(0), secure)
}

// ─── Rate limiting ───────────────────────────────────────────────────────────

/// Fixed-window per-user request limiter, keyed by identity id.
///
/// In-process only; a multi-node deployment would move this to shared
/// storage.
pub struct RateLimiter {
  limit:   u32,
  window:  Duration,
  windows: Mutex<HashMap<Uuid, (Instant, u32)>>,
}

impl RateLimiter {
  pub fn new(limit: u32, window: Duration) -> Self {
    Self { limit, window, windows: Mutex::new(HashMap::new()) }
  }

  /// 10 requests per 10 seconds.
  pub fn default_policy() -> Self {
    Self::new(10, Duration::from_secs(10))
  }

  /// Count one request for `user`, rejecting when the window is full.
  pub fn check(&self, user: Uuid) -> Result<(), ApiError> {
    let now = Instant::now();
    let mut windows = self.windows.lock();
    let entry = windows.entry(user).or_insert((now, 0));

    if now.duration_since(entry.0) >= self.window {
      *entry = (now, 0);
    }
    entry.1 += 1;

    if entry.1 > self.limit {
      let reset = entry.0 + self.window;
      let retry_after = reset.saturating_duration_since(now).as_secs().max(1);
      return Err(ApiError::RateLimited { retry_after });
    }
    Ok(())
  }
}

// ─── CurrentUser extractor ───────────────────────────────────────────────────

/// The authenticated caller. Extraction fails with a 401 envelope when no
/// valid session token is presented, and with 429 when the caller exceeds
/// the per-user rate limit.
pub struct CurrentUser {
  pub identity:   Identity,
  /// Digest of the presented token; used for revocation on logout.
  pub token_hash: String,
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = cookie_value(&parts.headers, SESSION_COOKIE)
      .ok_or_else(|| ApiError::Auth("Authentication required".to_string()))?;
    let token_hash = token_digest(&token);

    let identity = state
      .store
      .resolve_session(&token_hash)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::Auth("Authentication required".to_string()))?;

    state.limiter.check(identity.id)?;

    Ok(CurrentUser { identity, token_hash })
  }
}

// ─── Login / logout ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
  #[serde(default)]
  pub remember_me: bool,
}

/// `POST /api/auth/login`
///
/// Verifies credentials, starts a session, and sets the session cookies.
/// The activity baseline (`last-active`) is seeded here so the inactivity
/// gate has something to compare against from the first request on.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Response, ApiError>
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  if body.email.is_empty() || body.password.is_empty() {
    return Err(ApiError::Validation(
      "email and password are required".to_string(),
    ));
  }

  // One failure message for unknown email and wrong password alike.
  let denied = || ApiError::Auth("invalid email or password".to_string());

  let creds = state
    .store
    .credentials(&body.email)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(denied)?;

  let parsed = PasswordHash::new(&creds.password_hash).map_err(|_| denied())?;
  Argon2::default()
    .verify_password(body.password.as_bytes(), &parsed)
    .map_err(|_| denied())?;

  let (token, token_hash) = issue_token();
  let identity = state
    .store
    .start_session(creds.user_id, &token_hash)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user = %identity.id, "login");

  let secure = state.config.production;
  let session_max_age =
    body.remember_me.then_some(REMEMBER_MAX_AGE_SECS);

  let mut res = response::ok(&identity);
  let headers = res.headers_mut();
  headers.append(
    header::SET_COOKIE,
    set_cookie(SESSION_COOKIE, &token, session_max_age, secure),
  );
  headers.append(
    header::SET_COOKIE,
    session::last_active_cookie(Utc::now().timestamp_millis(), secure),
  );
  if body.remember_me {
    headers.append(
      header::SET_COOKIE,
      set_cookie(REMEMBER_COOKIE, "1", Some(REMEMBER_MAX_AGE_SECS), secure),
    );
  }

  Ok(res)
}

/// `POST /api/auth/logout` — revoke the session and clear every cookie
/// this crate owns.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Response, ApiError>
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .revoke_session(&user.token_hash)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user = %user.identity.id, "logout");

  let secure = state.config.production;
  let mut res = response::ok(json!({ "signed_out": true })).into_response();
  let headers = res.headers_mut();
  for name in [SESSION_COOKIE, LAST_ACTIVE_COOKIE, REMEMBER_COOKIE] {
    headers.append(header::SET_COOKIE, clear_cookie(name, secure));
  }
  Ok(res)
}
