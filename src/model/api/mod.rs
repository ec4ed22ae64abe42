//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as plain `id` fields.
//! - Datetimes are serialised as RFC 3339 strings.

pub mod auth;
pub mod election;
pub mod organization;
pub mod user;
