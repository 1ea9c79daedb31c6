//! Extract the caller's permissions from request extensions.
//!
//! Authentication middleware in front of the CRUD router inserts a [`Permissions`] value into the
//! request extensions. Absent that, every operation is allowed.

use crate::permissions::Permissions;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

#[derive(Clone, Debug)]
pub struct GrantedPermissions(pub Option<Permissions>);

#[async_trait]
impl<S> FromRequestParts<S> for GrantedPermissions
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(GrantedPermissions(parts.extensions.get::<Permissions>().cloned()))
    }
}
