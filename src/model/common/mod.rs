//! Types compatible with both API and DB.

pub mod caller;
pub mod election;
pub mod user;
