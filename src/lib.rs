//! Shape CRUD: generic REST CRUD endpoints over declaratively described record shapes.
//!
//! Register a base shape (plus optional per-operation shapes) under a route prefix; the
//! controller validates input against tag rules, translates list queries, applies the
//! permission gate and masks hidden fields, and answers with a `{ok, err, data}` envelope.

pub mod case;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod permissions;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod shape;
pub mod sql;
pub mod state;
pub mod storage;

pub use config::{load_shapes_from_path, resolve, FullConfig, ResolvedModel, Settings};
pub use error::{ConfigError, CrudError, RecordError, RegistrationError, StorageError};
pub use handlers::{dispatch, CrudRequest, HIDDEN_MASK};
pub use migration::{create_table, create_tables};
pub use permissions::{Operation, Operations, Permissions, ALL_SHAPES};
pub use registry::{Controller, ControllerConfig, Endpoint, EndpointOptions, ShapeView};
pub use response::{Envelope, Reply};
pub use routes::{common_routes, crud_routes};
pub use shape::{Field, FieldType, Record, Shape, ShapeFactory, StaticShape};
pub use state::AppState;
pub use storage::{MemoryStorage, PgStorage, Storage};
