//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - Datetimes are serialised in MongoDB's own format.
//! - IDs live in the `_id` field.

pub mod candidate;
pub mod election;
pub mod organization;
pub mod user;
pub mod vote;
