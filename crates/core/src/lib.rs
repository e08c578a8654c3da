//! `wardgate-core` — shared foundation for the admin authorization toolkit.
//!
//! This crate contains only the pieces every layer agrees on: strongly-typed
//! identifiers and the data-access error model. Behavior lives in
//! `wardgate-auth`; adapters live in `wardgate-infra`.

pub mod error;
pub mod id;

pub use error::{StoreError, StoreResult};
pub use id::{MenuId, PermissionId, RoleId, UserId};
