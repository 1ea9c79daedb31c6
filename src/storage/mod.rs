//! Storage collaborator consumed by the controller, plus PostgreSQL and in-memory implementations.

mod catalog;
mod memory;
mod postgres;

pub use catalog::ShapeCatalog;
pub use memory::{CallCounts, MemoryStorage};
pub use postgres::PgStorage;

use crate::error::StorageError;
use crate::service::{ListQuery, Order};
use crate::shape::{Field, Record, Shape, ShapeFactory};
use async_trait::async_trait;
use std::sync::Arc;

/// Applied to every listed record before it is returned.
pub type ItemTransform<'a> = &'a (dyn Fn(Record) -> Record + Send + Sync);

/// ORM-like operations the controller needs. Every call is all-or-nothing; errors are
/// surfaced to the caller unchanged.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Register a shape. `primary` is the base shape for secondary views; `force_name`
    /// overrides the name the shape is registered under.
    fn register_shape(
        &self,
        shape: &Arc<Shape>,
        primary: Option<&Arc<Shape>>,
        force_name: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Load the record with identity `id` into `record`. A missing row leaves identity at zero.
    async fn load(&self, record: &mut Record, id: i64) -> Result<(), StorageError>;

    /// Insert (identity zero, assigns identity) or update the shape's fields.
    async fn save(&self, record: &mut Record) -> Result<(), StorageError>;

    async fn delete(&self, record: &Record) -> Result<(), StorageError>;

    async fn list(
        &self,
        factory: &dyn ShapeFactory,
        query: &ListQuery,
        transform: ItemTransform<'_>,
    ) -> Result<Vec<Record>, StorageError>;

    fn identity(&self, record: &Record) -> i64 {
        record.identity()
    }

    fn reset_fields(&self, record: &mut Record) {
        record.reset()
    }

    /// Resolve a storage column to a field of `shape`. Ok(None) for an unknown column,
    /// Err when the lookup itself fails.
    fn field_for_column(&self, shape: &Shape, column: &str) -> Result<Option<String>, StorageError>;
}

/// Resolve an order instruction against a shape by field name, then by column.
/// None when neither matches; storage then falls back to identity order.
pub(crate) fn resolve_order<'a>(shape: &'a Shape, order: &Order) -> Option<(&'a Field, bool)> {
    let field = shape
        .field(&order.field)
        .or_else(|| shape.field_by_column(&order.field))?;
    Some((field, order.is_descending()))
}
