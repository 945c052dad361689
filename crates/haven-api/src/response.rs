//! JSON success envelopes.
//!
//! Shape: `{ "success": true, "data": T }`, with an optional `meta` block
//! on paginated responses. The error counterpart lives in
//! [`crate::error`].

use axum::{
  Json,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Meta {
  pub page:     u64,
  pub limit:    u64,
  pub total:    u64,
  #[serde(rename = "hasMore")]
  pub has_more: bool,
}

/// `{ "success": true, "data": … }`
pub fn ok<T: Serialize>(data: T) -> Response {
  Json(json!({ "success": true, "data": data })).into_response()
}

/// `{ "success": true, "data": …, "meta": … }`
pub fn page<T: Serialize>(data: T, meta: Meta) -> Response {
  Json(json!({ "success": true, "data": data, "meta": meta }))
    .into_response()
}
