//! Router builders.

mod common;
mod endpoint;
pub use common::common_routes;
pub use endpoint::crud_routes;
