//! Process settings read from the environment (after `.env` via dotenvy).

use crate::error::ConfigError;
use crate::registry::DEFAULT_TAG_NAME;
use crate::state::DEFAULT_BODY_LIMIT;
use std::path::PathBuf;

pub const DEFAULT_TABLE_PREFIX: &str = "p_";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9001";
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/shape_crud";

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub table_prefix: String,
    pub tag_name: String,
    pub bind_addr: String,
    pub body_limit: usize,
    /// Optional JSON descriptor file with shapes and endpoints.
    pub shapes_path: Option<PathBuf>,
}

impl Settings {
    /// Load `.env` if present, then read `DATABASE_URL`, `TABLE_PREFIX`, `CRUD_TAG_NAME`,
    /// `BIND_ADDR`, `BODY_LIMIT_BYTES` and `SHAPES_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Settings::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let body_limit = match lookup("BODY_LIMIT_BYTES").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Validation(format!("BODY_LIMIT_BYTES: invalid value '{}'", raw)))?,
            None => DEFAULT_BODY_LIMIT,
        };
        Ok(Settings {
            database_url: var("DATABASE_URL", DEFAULT_DATABASE_URL),
            table_prefix: var("TABLE_PREFIX", DEFAULT_TABLE_PREFIX),
            tag_name: var("CRUD_TAG_NAME", DEFAULT_TAG_NAME),
            bind_addr: var("BIND_ADDR", DEFAULT_BIND_ADDR),
            body_limit,
            shapes_path: lookup("SHAPES_PATH").filter(|v| !v.is_empty()).map(PathBuf::from),
        })
    }
}
