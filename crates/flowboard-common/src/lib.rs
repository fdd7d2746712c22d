//! Domain types shared by every flowboard layer: entities, partial-update
//! payloads, and the [`Repository`] contract implemented by backing stores.

pub mod models;
pub mod repository;

pub use models::*;
pub use repository::{Repository, StoreError, StoreResult};
