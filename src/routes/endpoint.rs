//! CRUD routes: one fallback handler serves every registered endpoint prefix.
//! Prefixes are matched longest-first by the controller, so nested prefixes such as
//! `/users/` and `/users/password/` coexist. The body size cap (`AppState::body_limit`) is
//! enforced by the handler so that oversized bodies still get an envelope.

use crate::handlers::endpoint::handle;
use crate::state::AppState;
use axum::Router;

pub fn crud_routes(state: AppState) -> Router {
    Router::new().fallback(handle).with_state(state)
}
