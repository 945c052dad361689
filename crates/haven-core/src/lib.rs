//! Core types for the Haven community directory: residents, tenants and
//! roles, the privacy filter, and the [`store::CommunityStore`] trait.
//!
//! Everything here is plain data and pure functions — no HTTP, no
//! database. The other crates depend on this one and never on each other.

pub mod error;
pub mod privacy;
pub mod resident;
pub mod store;
pub mod tenant;

pub use error::{Error, Result};
