//! HTTP handlers for registered CRUD endpoints.

pub mod endpoint;
pub use endpoint::{dispatch, handle, resolve_id, CrudRequest, HIDDEN_MASK};
