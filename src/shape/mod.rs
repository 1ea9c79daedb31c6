//! Record shapes: statically declared field descriptors that replace runtime type inspection.

mod factory;
mod record;

pub use factory::{ShapeFactory, StaticShape};
pub use record::Record;

use crate::case::to_snake_case;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Scalar type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 32-bit signed integer.
    Int,
    Int64,
    String,
    Bool,
    Float,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Int64 => "int64",
            FieldType::String => "string",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, FieldType::Int | FieldType::Int64)
    }

    pub fn zero_value(self) -> Value {
        match self {
            FieldType::Int | FieldType::Int64 => Value::from(0),
            FieldType::String => Value::String(String::new()),
            FieldType::Bool => Value::Bool(false),
            FieldType::Float => Value::from(0.0),
        }
    }

    /// Normalize a JSON value to this type. None when the value does not fit.
    pub fn coerce(self, v: &Value) -> Option<Value> {
        match self {
            FieldType::Int => v
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Value::from),
            FieldType::Int64 => v.as_i64().map(Value::from),
            FieldType::String => v.as_str().map(|s| Value::String(s.to_string())),
            FieldType::Bool => v.as_bool().map(Value::Bool),
            FieldType::Float => v.as_f64().map(Value::from),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Canonical field name; keys record values and filter maps.
    pub name: String,
    /// JSON key used for request bodies and responses.
    pub json: String,
    /// Storage column.
    pub column: String,
    pub field_type: FieldType,
    /// Metadata strings keyed by tag name, e.g. `crud` -> `req lenmin:2 lenmax:50`.
    pub tags: BTreeMap<String, String>,
    pub identity: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Field {
            json: name.clone(),
            column: to_snake_case(&name),
            name,
            field_type,
            tags: BTreeMap::new(),
            identity: false,
        }
    }

    /// Integer identity field; zero means the record has not been stored yet.
    pub fn id(name: impl Into<String>, field_type: FieldType) -> Self {
        let mut f = Field::new(name, field_type);
        f.identity = true;
        f
    }

    pub fn json(mut self, key: impl Into<String>) -> Self {
        self.json = key.into();
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn tag(mut self, tag_name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(tag_name.into(), value.into());
        self
    }

    pub fn tag_value(&self, tag_name: &str) -> Option<&str> {
        self.tags.get(tag_name).map(String::as_str)
    }
}

/// A named, ordered set of fields. One shape backs each operation's input or output.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    name: String,
    fields: Vec<Field>,
    identity: usize,
}

impl Shape {
    /// Build a shape, rejecting duplicate names/keys/columns and anything other than
    /// exactly one integer identity field.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::Validation("shape name must not be empty".into()));
        }
        let mut names = HashSet::new();
        let mut keys = HashSet::new();
        let mut columns = HashSet::new();
        for f in &fields {
            if !names.insert(f.name.as_str()) {
                return Err(ConfigError::Validation(format!("{}: duplicate field '{}'", name, f.name)));
            }
            if !keys.insert(f.json.as_str()) {
                return Err(ConfigError::Validation(format!("{}: duplicate json key '{}'", name, f.json)));
            }
            if !columns.insert(f.column.as_str()) {
                return Err(ConfigError::Validation(format!("{}: duplicate column '{}'", name, f.column)));
            }
        }
        let ids: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.identity)
            .map(|(i, _)| i)
            .collect();
        let identity = match ids.as_slice() {
            [i] => *i,
            [] => return Err(ConfigError::Validation(format!("{}: no identity field", name))),
            _ => return Err(ConfigError::Validation(format!("{}: more than one identity field", name))),
        };
        if !fields[identity].field_type.is_integer() {
            return Err(ConfigError::Validation(format!(
                "{}: identity field '{}' must be an integer",
                name, fields[identity].name
            )));
        }
        Ok(Shape { name, fields, identity })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_json(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.json == key)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.column == column)
    }

    pub fn identity(&self) -> &Field {
        &self.fields[self.identity]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_fields() -> Vec<Field> {
        vec![
            Field::id("id", FieldType::Int64).json("user_id"),
            Field::new("name", FieldType::String).tag("crud", "req"),
            Field::new("emailActivationKey", FieldType::String),
        ]
    }

    #[test]
    fn defaults_json_key_and_column_from_name() {
        let shape = Shape::new("User", user_fields()).unwrap();
        let key = shape.field("emailActivationKey").unwrap();
        assert_eq!(key.json, "emailActivationKey");
        assert_eq!(key.column, "email_activation_key");
        assert_eq!(shape.identity().json, "user_id");
        assert_eq!(shape.field_by_column("email_activation_key").unwrap().name, "emailActivationKey");
    }

    #[test]
    fn rejects_missing_or_non_integer_identity() {
        let no_id = vec![Field::new("name", FieldType::String)];
        assert!(Shape::new("User", no_id).is_err());
        let text_id = vec![Field::id("id", FieldType::String)];
        assert!(Shape::new("User", text_id).is_err());
    }

    #[test]
    fn rejects_duplicate_columns() {
        let fields = vec![
            Field::id("id", FieldType::Int64),
            Field::new("name", FieldType::String),
            Field::new("alias", FieldType::String).column("name"),
        ];
        assert!(Shape::new("User", fields).is_err());
    }

    #[test]
    fn coerces_values_by_type() {
        assert_eq!(FieldType::Int.coerce(&Value::from(5)), Some(Value::from(5)));
        assert_eq!(FieldType::Int.coerce(&Value::from(i64::MAX)), None);
        assert_eq!(FieldType::String.coerce(&Value::from(5)), None);
        assert_eq!(FieldType::Float.coerce(&Value::from(2)), Some(Value::from(2.0)));
    }
}
