//! Typed query parameters bound to PostgreSQL statements.

use crate::service::FilterValue;
use crate::shape::FieldType;
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value that can be bound to a PostgreSQL query, typed by the field it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    I32(i32),
    I64(i64),
    F64(f64),
    Bool(bool),
    String(String),
}

impl PgBindValue {
    /// Convert a record value for a field of `field_type`. Missing or mistyped values bind as
    /// the type's zero value; records only ever hold values of their declared type.
    pub fn from_field(field_type: FieldType, v: Option<&Value>) -> Self {
        match field_type {
            FieldType::Int => PgBindValue::I32(
                v.and_then(Value::as_i64)
                    .and_then(|n| i32::try_from(n).ok())
                    .unwrap_or(0),
            ),
            FieldType::Int64 => PgBindValue::I64(v.and_then(Value::as_i64).unwrap_or(0)),
            FieldType::Float => PgBindValue::F64(v.and_then(Value::as_f64).unwrap_or(0.0)),
            FieldType::Bool => PgBindValue::Bool(v.and_then(Value::as_bool).unwrap_or(false)),
            FieldType::String => {
                PgBindValue::String(v.and_then(Value::as_str).unwrap_or_default().to_string())
            }
        }
    }
}

impl From<&FilterValue> for PgBindValue {
    fn from(v: &FilterValue) -> Self {
        match v {
            FilterValue::String(s) => PgBindValue::String(s.clone()),
            FilterValue::Int(n) => PgBindValue::I32(*n),
            FilterValue::Int64(n) => PgBindValue::I64(*n),
        }
    }
}

/// Bind every parameter in order.
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[PgBindValue],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            PgBindValue::I32(n) => query.bind(*n),
            PgBindValue::I64(n) => query.bind(*n),
            PgBindValue::F64(n) => query.bind(*n),
            PgBindValue::Bool(b) => query.bind(*b),
            PgBindValue::String(s) => query.bind(s.clone()),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_by_field_type() {
        assert_eq!(PgBindValue::from_field(FieldType::Int, Some(&Value::from(7))), PgBindValue::I32(7));
        assert_eq!(
            PgBindValue::from_field(FieldType::String, Some(&Value::from("bob"))),
            PgBindValue::String("bob".into())
        );
        assert_eq!(PgBindValue::from_field(FieldType::Bool, None), PgBindValue::Bool(false));
        assert_eq!(PgBindValue::from(&FilterValue::Int64(9)), PgBindValue::I64(9));
    }
}
