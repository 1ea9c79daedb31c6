//! PostgreSQL storage: one table per base shape, secondary shapes read and write their column subset.

use super::{ItemTransform, ShapeCatalog, Storage};
use crate::error::StorageError;
use crate::service::ListQuery;
use crate::shape::{FieldType, Record, Shape, ShapeFactory};
use crate::sql::{self, bind_all, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::sync::Arc;

pub struct PgStorage {
    pool: PgPool,
    prefix: String,
    catalog: ShapeCatalog,
}

impl PgStorage {
    pub fn new(pool: PgPool, prefix: impl Into<String>) -> Self {
        PgStorage {
            pool,
            prefix: prefix.into(),
            catalog: ShapeCatalog::new(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Base table for records of `shape`.
    fn table_for(&self, shape: &Shape) -> Result<(String, Arc<Shape>), StorageError> {
        let base = self.catalog.base_of(shape)?;
        Ok((sql::table_name(&self.prefix, &base), base))
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<PgRow>, StorageError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, StorageError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let done = bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}

/// Decode the shape's columns of `row` into `record`.
fn fill_from_row(record: &mut Record, row: &PgRow) -> Result<(), StorageError> {
    let fields = record.shape().fields().to_vec();
    for f in fields {
        let col = f.column.as_str();
        let v = match f.field_type {
            FieldType::Int => Value::from(row.try_get::<i32, _>(col)?),
            FieldType::Int64 => Value::from(row.try_get::<i64, _>(col)?),
            FieldType::String => Value::from(row.try_get::<String, _>(col)?),
            FieldType::Bool => Value::from(row.try_get::<bool, _>(col)?),
            FieldType::Float => Value::from(row.try_get::<f64, _>(col)?),
        };
        record.set(&f.name, v)?;
    }
    Ok(())
}

#[async_trait]
impl Storage for PgStorage {
    fn register_shape(
        &self,
        shape: &Arc<Shape>,
        primary: Option<&Arc<Shape>>,
        force_name: Option<&str>,
    ) -> Result<(), StorageError> {
        self.catalog.register(shape, primary, force_name)
    }

    async fn load(&self, record: &mut Record, id: i64) -> Result<(), StorageError> {
        let (table, _) = self.table_for(record.shape())?;
        let q = sql::select_by_id(&table, record.shape(), id);
        record.reset();
        if let Some(row) = self.fetch_optional(&q).await? {
            fill_from_row(record, &row)?;
        }
        Ok(())
    }

    async fn save(&self, record: &mut Record) -> Result<(), StorageError> {
        let (table, _) = self.table_for(record.shape())?;
        if record.identity() == 0 {
            let q = sql::insert(&table, record);
            let row = self
                .fetch_optional(&q)
                .await?
                .ok_or_else(|| StorageError::Backend(format!("insert into {} returned no row", table)))?;
            let id: i64 = row.try_get(0)?;
            record.set_identity(id)?;
            return Ok(());
        }
        if let Some(q) = sql::update(&table, record) {
            let affected = self.execute(&q).await?;
            if affected == 0 {
                tracing::warn!(table = %table, id = record.identity(), "update matched no row");
            }
        }
        Ok(())
    }

    async fn delete(&self, record: &Record) -> Result<(), StorageError> {
        let (table, _) = self.table_for(record.shape())?;
        let q = sql::delete(&table, record.shape(), record.identity());
        self.execute(&q).await?;
        Ok(())
    }

    async fn list(
        &self,
        factory: &dyn ShapeFactory,
        query: &ListQuery,
        transform: ItemTransform<'_>,
    ) -> Result<Vec<Record>, StorageError> {
        let shape = factory.shape();
        let (table, base) = self.table_for(shape)?;
        let q = sql::select_list(&table, shape, &base, query)?;
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = factory.new_instance();
            fill_from_row(&mut record, row)?;
            out.push(transform(record));
        }
        Ok(out)
    }

    fn field_for_column(&self, shape: &Shape, column: &str) -> Result<Option<String>, StorageError> {
        self.catalog.field_for_column(shape, column)
    }
}
