//! Shared application state for the CRUD routes.

use crate::registry::Controller;
use std::sync::Arc;

/// Default cap on request body size (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    /// Largest request body accepted, in bytes.
    pub body_limit: usize,
}

impl AppState {
    pub fn new(controller: Controller) -> Self {
        AppState {
            controller: Arc::new(controller),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }
}
