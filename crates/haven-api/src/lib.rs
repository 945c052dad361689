//! HTTP layer for the Haven community directory.
//!
//! Exposes an axum [`Router`] backed by any
//! [`haven_core::store::CommunityStore`]. Every request passes the
//! inactivity gate ([`session`]); protected handlers compose the
//! auth → tenant-isolation → role chain via the [`auth::CurrentUser`] and
//! [`tenant::TenantScope`] extractors; directory reads go through the
//! privacy filter before leaving the process.

pub mod auth;
pub mod error;
pub mod residents;
pub mod response;
pub mod session;
pub mod tenant;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use serde::Deserialize;

use haven_core::store::CommunityStore;

use auth::RateLimiter;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Marks cookies `Secure`. Off by default for local development.
  #[serde(default)]
  pub production: bool,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CommunityStore> {
  pub store:   Arc<S>,
  pub config:  Arc<ServerConfig>,
  pub limiter: Arc<RateLimiter>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the Haven API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CommunityStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Auth
    .route("/api/auth/login", post(auth::login::<S>))
    .route("/api/auth/logout", post(auth::logout::<S>))
    // Directory
    .route("/api/residents", get(residents::list::<S>))
    .route("/api/residents/{id}", get(residents::get_one::<S>))
    // Privacy settings
    .route(
      "/api/privacy",
      get(residents::get_settings::<S>).put(residents::put_settings::<S>),
    )
    // Admin
    .route("/api/admin/residents", get(residents::admin_list::<S>))
    .layer(middleware::from_fn_with_state(
      state.clone(),
      session::session_gate::<S>,
    ))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::Utc;
  use haven_core::{
    privacy::PrivacySettings,
    resident::NewResident,
    store::CommunityStore as _,
    tenant::Role,
  };
  use haven_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  const PASSWORD: &str = "correct horse battery staple";

  struct Fixture {
    state:    AppState<SqliteStore>,
    tenant_b: Uuid,
    ana:      Uuid,
    carol:    Uuid,
    dana:     Uuid,
  }

  fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  /// Two tenants; in tenant A: Ana and Bea share a family unit, Carol is
  /// unrelated, plus a tenant admin and a super admin. Dana lives in
  /// tenant B. Ana hides her email and phone.
  async fn fixture() -> Fixture {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let hash = hash_password(PASSWORD);
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    let family = Uuid::new_v4();

    let mut ana =
      NewResident::bare(tenant_a, "ana@example.com", &hash, Role::Resident);
    ana.first_name = Some("Ana".into());
    ana.phone = Some("555-0100".into());
    ana.family_unit_id = Some(family);
    let ana = store.create_resident(ana).await.unwrap().id;

    let mut bea =
      NewResident::bare(tenant_a, "bea@example.com", &hash, Role::Resident);
    bea.first_name = Some("Bea".into());
    bea.family_unit_id = Some(family);
    store.create_resident(bea).await.unwrap();

    let mut carol =
      NewResident::bare(tenant_a, "carol@example.com", &hash, Role::Resident);
    carol.first_name = Some("Carol".into());
    let carol = store.create_resident(carol).await.unwrap().id;

    store
      .create_resident(NewResident::bare(
        tenant_a,
        "admin@example.com",
        &hash,
        Role::TenantAdmin,
      ))
      .await
      .unwrap();

    store
      .create_resident(NewResident::bare(
        tenant_a,
        "root@example.com",
        &hash,
        Role::SuperAdmin,
      ))
      .await
      .unwrap();

    let dana = store
      .create_resident(NewResident::bare(
        tenant_b,
        "dana@example.com",
        &hash,
        Role::Resident,
      ))
      .await
      .unwrap()
      .id;

    store
      .upsert_privacy_settings(ana, &PrivacySettings {
        show_email: Some(false),
        show_phone: Some(false),
        ..Default::default()
      })
      .await
      .unwrap();

    let state = AppState {
      store:   Arc::new(store),
      config:  Arc::new(ServerConfig {
        host:       "127.0.0.1".to_string(),
        port:       0,
        store_path: PathBuf::from(":memory:"),
        production: false,
      }),
      limiter: Arc::new(RateLimiter::default_policy()),
    };

    Fixture { state, tenant_b, ana, carol, dana }
  }

  async fn body_json(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  /// Log in and return the session token from the `Set-Cookie` headers.
  async fn login(fx: &Fixture, email: &str) -> String {
    let req = Request::builder()
      .method("POST")
      .uri("/api/auth/login")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(
        json!({ "email": email, "password": PASSWORD }).to_string(),
      ))
      .unwrap();
    let res = router(fx.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK, "login failed for {email}");

    res
      .headers()
      .get_all(header::SET_COOKIE)
      .iter()
      .find_map(|v| {
        let v = v.to_str().ok()?;
        let v = v.strip_prefix("session-token=")?;
        Some(v.split(';').next()?.to_string())
      })
      .expect("login sets session-token")
  }

  fn authed(
    method: &str,
    uri: &str,
    cookies: &str,
    body: Option<Value>,
  ) -> Request<Body> {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::COOKIE, cookies);
    if body.is_some() {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    builder
      .body(match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
      })
      .unwrap()
  }

  /// Cookie header with a fresh activity baseline.
  fn cookies(token: &str) -> String {
    format!(
      "session-token={token}; last-active={}",
      Utc::now().timestamp_millis()
    )
  }

  fn find_resident<'a>(data: &'a Value, id: Uuid) -> &'a Value {
    data
      .as_array()
      .unwrap()
      .iter()
      .find(|r| r["id"] == json!(id))
      .unwrap_or_else(|| panic!("resident {id} missing from listing"))
  }

  // ── Auth ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn login_rejects_bad_password() {
    let fx = fixture().await;
    let req = Request::builder()
      .method("POST")
      .uri("/api/auth/login")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(
        json!({ "email": "ana@example.com", "password": "wrong" }).to_string(),
      ))
      .unwrap();
    let res = router(fx.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
  }

  #[tokio::test]
  async fn unauthenticated_request_is_401() {
    let fx = fixture().await;
    let req = Request::builder()
      .uri("/api/residents")
      .body(Body::empty())
      .unwrap();
    let res = router(fx.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(res).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
  }

  #[tokio::test]
  async fn logout_revokes_the_session() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed("POST", "/api/auth/logout", &cookies(&token), None))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = router(fx.state.clone())
      .oneshot(authed("GET", "/api/privacy", &cookies(&token), None))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Privacy filtering ───────────────────────────────────────────────────

  #[tokio::test]
  async fn stranger_sees_redacted_record() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed("GET", "/api/residents", &cookies(&token), None))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["success"], json!(true));

    let ana = find_resident(&body["data"], fx.ana);
    assert_eq!(ana["email"], Value::Null);
    assert_eq!(ana["phone"], Value::Null);
    // Name is always visible.
    assert_eq!(ana["first_name"], "Ana");
  }

  #[tokio::test]
  async fn family_member_sees_private_fields() {
    let fx = fixture().await;
    let token = login(&fx, "bea@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        &format!("/api/residents/{}", fx.ana),
        &cookies(&token),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["email"], "ana@example.com");
    assert_eq!(body["data"]["phone"], "555-0100");
  }

  #[tokio::test]
  async fn self_view_is_unredacted() {
    let fx = fixture().await;
    let token = login(&fx, "ana@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        &format!("/api/residents/{}", fx.ana),
        &cookies(&token),
        None,
      ))
      .await
      .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["data"]["email"], "ana@example.com");
  }

  #[tokio::test]
  async fn tenant_admin_sees_private_fields() {
    let fx = fixture().await;
    let token = login(&fx, "admin@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed("GET", "/api/residents", &cookies(&token), None))
      .await
      .unwrap();
    let body = body_json(res).await;
    let ana = find_resident(&body["data"], fx.ana);
    assert_eq!(ana["email"], "ana@example.com");
  }

  #[tokio::test]
  async fn updated_settings_apply_to_the_next_read() {
    let fx = fixture().await;
    let carol_token = login(&fx, "carol@example.com").await;

    // Carol hides her phone number.
    let res = router(fx.state.clone())
      .oneshot(authed(
        "PUT",
        "/api/privacy",
        &cookies(&carol_token),
        Some(json!({ "show_phone": false })),
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = router(fx.state.clone())
      .oneshot(authed("GET", "/api/privacy", &cookies(&carol_token), None))
      .await
      .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["data"]["show_phone"], json!(false));

    // Ana (a stranger to Carol) no longer sees Carol's email either way,
    // but the explicit toggle hides the phone; email stays visible since
    // Carol never toggled it.
    let ana_token = login(&fx, "ana@example.com").await;
    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        &format!("/api/residents/{}", fx.carol),
        &cookies(&ana_token),
        None,
      ))
      .await
      .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["data"]["phone"], Value::Null);
    assert_eq!(body["data"]["email"], "carol@example.com");
  }

  // ── Tenant isolation ────────────────────────────────────────────────────

  #[tokio::test]
  async fn cross_tenant_listing_is_403() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        &format!("/api/residents?tenant_id={}", fx.tenant_b),
        &cookies(&token),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "TENANT_ISOLATION_ERROR");
  }

  #[tokio::test]
  async fn super_admin_crosses_tenants() {
    let fx = fixture().await;
    let token = login(&fx, "root@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        &format!("/api/residents?tenant_id={}", fx.tenant_b),
        &cookies(&token),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    find_resident(&body["data"], fx.dana);
  }

  #[tokio::test]
  async fn cross_tenant_get_one_is_403() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        &format!("/api/residents/{}", fx.dana),
        &cookies(&token),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "TENANT_ISOLATION_ERROR");
  }

  #[tokio::test]
  async fn missing_resident_is_404() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        &format!("/api/residents/{}", Uuid::new_v4()),
        &cookies(&token),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
  }

  // ── Role gate ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_roster_requires_an_admin_role() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed("GET", "/api/admin/residents", &cookies(&token), None))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
    assert!(
      body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Required role: tenant_admin or super_admin")
    );

    let admin_token = login(&fx, "admin@example.com").await;
    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        "/api/admin/residents",
        &cookies(&admin_token),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    // Unfiltered roster: Ana's hidden email is present.
    let ana = find_resident(&body["data"], fx.ana);
    assert_eq!(ana["email"], "ana@example.com");
  }

  // ── Pagination ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn listing_paginates_with_meta() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    // Tenant A holds five residents.
    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        "/api/residents?page=1&limit=2",
        &cookies(&token),
        None,
      ))
      .await
      .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["total"], 5);
    assert_eq!(body["meta"]["hasMore"], json!(true));

    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        "/api/residents?page=3&limit=2",
        &cookies(&token),
        None,
      ))
      .await
      .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["hasMore"], json!(false));
  }

  #[tokio::test]
  async fn absurd_page_number_yields_an_empty_page() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        &format!("/api/residents?page={}&limit=100", u64::MAX),
        &cookies(&token),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["meta"]["hasMore"], json!(false));
  }

  #[tokio::test]
  async fn oversized_limit_is_rejected() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        "/api/residents?limit=500",
        &cookies(&token),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
  }

  // ── Session timeout ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn stale_session_redirects_to_login_and_revokes() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let stale = Utc::now().timestamp_millis() - 3 * 60 * 60 * 1000;
    let stale_cookies = format!("session-token={token}; last-active={stale}");

    let res = router(fx.state.clone())
      .oneshot(authed("GET", "/api/residents", &stale_cookies, None))
      .await
      .unwrap();
    assert!(res.status().is_redirection(), "status: {}", res.status());
    assert_eq!(
      res.headers().get(header::LOCATION).unwrap(),
      "/login?reason=timeout"
    );

    // The token no longer resolves.
    let res = router(fx.state.clone())
      .oneshot(authed("GET", "/api/residents", &cookies(&token), None))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn remember_me_bypasses_the_timeout() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let stale = Utc::now().timestamp_millis() - 3 * 60 * 60 * 1000;
    let stale_cookies = format!(
      "session-token={token}; last-active={stale}; remember-me=1"
    );

    let res = router(fx.state.clone())
      .oneshot(authed("GET", "/api/residents", &stale_cookies, None))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn active_session_gets_a_refreshed_baseline() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    let res = router(fx.state.clone())
      .oneshot(authed("GET", "/api/residents", &cookies(&token), None))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let refreshed = res
      .headers()
      .get_all(header::SET_COOKIE)
      .iter()
      .any(|v| {
        v.to_str().is_ok_and(|s| s.starts_with("last-active="))
      });
    assert!(refreshed, "gate should rewrite last-active");
  }

  #[tokio::test]
  async fn fresh_login_without_baseline_passes_the_gate() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    // Only the session cookie; no last-active at all.
    let res = router(fx.state.clone())
      .oneshot(authed(
        "GET",
        "/api/residents",
        &format!("session-token={token}"),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
  }

  // ── Rate limiting ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn per_user_rate_limit_returns_429() {
    let fx = fixture().await;
    let token = login(&fx, "carol@example.com").await;

    for _ in 0..10 {
      let res = router(fx.state.clone())
        .oneshot(authed("GET", "/api/privacy", &cookies(&token), None))
        .await
        .unwrap();
      assert_eq!(res.status(), StatusCode::OK);
    }

    let res = router(fx.state.clone())
      .oneshot(authed("GET", "/api/privacy", &cookies(&token), None))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().contains_key(header::RETRY_AFTER));
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
  }
}
