//! Data model types.
//!
//! - [`api`]: types exchanged with clients.
//! - [`common`]: types shared across layers.
//! - [`db`]: types as stored in the database.
//! - [`mongodb`]: MongoDB collection plumbing.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
