//! Request extractors.

mod permissions;
pub use permissions::GrantedPermissions;
