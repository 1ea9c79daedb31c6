//! Create backing tables for base shapes. Idempotent (CREATE TABLE IF NOT EXISTS).

use crate::error::StorageError;
use crate::shape::Shape;
use crate::sql;
use sqlx::PgPool;

/// Create the table backing `base` (named prefix + snake_case shape name) if it does not exist.
pub async fn create_table(pool: &PgPool, base: &Shape, prefix: &str) -> Result<(), StorageError> {
    let table = sql::table_name(prefix, base);
    let ddl = sql::create_table(&table, base);
    tracing::debug!(sql = %ddl, "create table");
    sqlx::query(&ddl).execute(pool).await?;
    tracing::info!(table = %table, shape = base.name(), "table ready");
    Ok(())
}

/// Create tables for several base shapes in order.
pub async fn create_tables<'a, I>(pool: &PgPool, shapes: I, prefix: &str) -> Result<(), StorageError>
where
    I: IntoIterator<Item = &'a Shape>,
{
    for shape in shapes {
        create_table(pool, shape, prefix).await?;
    }
    Ok(())
}
