//! Builds parameterized CREATE TABLE, INSERT, SELECT, UPDATE, DELETE for a shape on its base table.

use super::params::PgBindValue;
use crate::case::to_snake_case;
use crate::error::StorageError;
use crate::service::ListQuery;
use crate::shape::{Field, FieldType, Record, Shape};
use crate::storage::resolve_order;

/// Quote identifier for PostgreSQL (identifiers come from shape descriptors only).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Table backing a base shape: prefix + snake_case shape name.
pub fn table_name(prefix: &str, base: &Shape) -> String {
    format!("{}{}", prefix, to_snake_case(base.name()))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: PgBindValue) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }
}

fn pg_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Int => "integer",
        FieldType::Int64 => "bigint",
        FieldType::String => "text",
        FieldType::Bool => "boolean",
        FieldType::Float => "double precision",
    }
}

fn zero_default(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Int | FieldType::Int64 => "0",
        FieldType::String => "''",
        FieldType::Bool => "FALSE",
        FieldType::Float => "0",
    }
}

/// SELECT list: every field of the shape cast to its declared type, aliased to its column,
/// so rows decode without guessing.
fn select_column_list(shape: &Shape) -> String {
    shape
        .fields()
        .iter()
        .map(|f| {
            let q = quoted(&f.column);
            format!("{}::{} AS {}", q, pg_type(f.field_type), q)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn writable_fields(shape: &Shape) -> impl Iterator<Item = &Field> {
    shape.fields().iter().filter(|f| !f.identity)
}

/// CREATE TABLE IF NOT EXISTS for a base shape. Identity is BIGSERIAL; every other column is
/// NOT NULL with the type's zero value as default, so secondary shapes can insert a subset.
pub fn create_table(table: &str, base: &Shape) -> String {
    let cols: Vec<String> = base
        .fields()
        .iter()
        .map(|f| {
            if f.identity {
                format!("{} BIGSERIAL PRIMARY KEY", quoted(&f.column))
            } else {
                format!(
                    "{} {} NOT NULL DEFAULT {}",
                    quoted(&f.column),
                    pg_type(f.field_type).to_uppercase(),
                    zero_default(f.field_type)
                )
            }
        })
        .collect();
    format!("CREATE TABLE IF NOT EXISTS {} ({})", quoted(table), cols.join(", "))
}

/// SELECT by identity. The id is the sole param.
pub fn select_by_id(table: &str, shape: &Shape, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(PgBindValue::I64(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        select_column_list(shape),
        quoted(table),
        quoted(&shape.identity().column),
        n
    );
    q
}

/// INSERT the shape's non-identity fields, returning the assigned identity.
pub fn insert(table: &str, record: &Record) -> QueryBuf {
    let shape = record.shape();
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in writable_fields(shape) {
        let n = q.push_param(PgBindValue::from_field(f.field_type, record.get(&f.name)));
        cols.push(quoted(&f.column));
        placeholders.push(format!("${}", n));
    }
    let id_col = quoted(&shape.identity().column);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", quoted(table), id_col)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(table),
            cols.join(", "),
            placeholders.join(", "),
            id_col
        )
    };
    q
}

/// UPDATE the shape's non-identity fields by identity. None when the shape has nothing to write.
pub fn update(table: &str, record: &Record) -> Option<QueryBuf> {
    let shape = record.shape();
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for f in writable_fields(shape) {
        let n = q.push_param(PgBindValue::from_field(f.field_type, record.get(&f.name)));
        sets.push(format!("{} = ${}", quoted(&f.column), n));
    }
    if sets.is_empty() {
        return None;
    }
    let id_param = q.push_param(PgBindValue::I64(record.identity()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        quoted(table),
        sets.join(", "),
        quoted(&shape.identity().column),
        id_param
    );
    Some(q)
}

/// DELETE by identity.
pub fn delete(table: &str, shape: &Shape, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(PgBindValue::I64(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${}",
        quoted(table),
        quoted(&shape.identity().column),
        n
    );
    q
}

/// SELECT list for `shape` with exact-match filters (field names resolved on `base`), ORDER BY
/// the requested field or identity, LIMIT/OFFSET.
pub fn select_list(table: &str, shape: &Shape, base: &Shape, query: &ListQuery) -> Result<QueryBuf, StorageError> {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (name, value) in &query.filters {
        let field = base
            .field(name)
            .ok_or_else(|| StorageError::InvalidFilters(name.clone()))?;
        let n = q.push_param(PgBindValue::from(value));
        where_parts.push(format!("{} = ${}", quoted(&field.column), n));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };

    let id_col = quoted(&shape.identity().column);
    let order_clause = match query.order.as_ref().and_then(|o| resolve_order(shape, o)) {
        Some((field, desc)) => format!(
            " ORDER BY {} {}, {}",
            quoted(&field.column),
            if desc { "DESC" } else { "ASC" },
            id_col
        ),
        None => format!(" ORDER BY {}", id_col),
    };

    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        select_column_list(shape),
        quoted(table),
        where_clause,
        order_clause,
        query.limit,
        query.offset
    );
    Ok(q)
}
