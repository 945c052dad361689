//! SQLite backend for the Haven community store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. One file holds everything a
//! deployment needs: users (residents with credentials), sessions (token
//! digests only), and per-user privacy settings.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
