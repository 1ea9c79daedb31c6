use super::{FieldType, Shape};
use crate::error::RecordError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One instance of a shape: a value per declared field, always of the field's type.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    shape: Arc<Shape>,
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Zero-valued instance (identity 0, empty strings).
    pub fn zero(shape: Arc<Shape>) -> Self {
        let values = shape
            .fields()
            .iter()
            .map(|f| (f.name.clone(), f.field_type.zero_value()))
            .collect();
        Record { shape, values }
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), RecordError> {
        let f = self.shape.field(field).ok_or_else(|| RecordError::UnknownField {
            shape: self.shape.name().to_string(),
            field: field.to_string(),
        })?;
        let value = f.field_type.coerce(&value.into()).ok_or_else(|| RecordError::TypeMismatch {
            field: f.name.clone(),
            expected: f.field_type.as_str(),
        })?;
        self.values.insert(f.name.clone(), value);
        Ok(())
    }

    pub fn identity(&self) -> i64 {
        self.values
            .get(&self.shape.identity().name)
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    pub fn set_identity(&mut self, id: i64) -> Result<(), RecordError> {
        let name = self.shape.identity().name.clone();
        self.set(&name, id)
    }

    /// Reset every field to its zero value.
    pub fn reset(&mut self) {
        for f in self.shape.fields() {
            self.values.insert(f.name.clone(), f.field_type.zero_value());
        }
    }

    /// Merge a JSON object onto this record by json key. Keys without a field are ignored,
    /// `null` keeps the current value. Returns the names of the fields that were assigned.
    pub fn merge_json(&mut self, body: &[u8]) -> Result<BTreeSet<String>, RecordError> {
        let parsed: Value = serde_json::from_slice(body)?;
        let obj = match parsed {
            Value::Object(obj) => obj,
            _ => return Err(RecordError::NotAnObject),
        };
        let mut assigned = BTreeSet::new();
        for (key, v) in obj {
            if v.is_null() {
                continue;
            }
            let Some(f) = self.shape.field_by_json(&key) else { continue };
            let value = f.field_type.coerce(&v).ok_or_else(|| RecordError::TypeMismatch {
                field: f.name.clone(),
                expected: f.field_type.as_str(),
            })?;
            self.values.insert(f.name.clone(), value);
            assigned.insert(f.name.clone());
        }
        Ok(assigned)
    }

    /// Replace the value of every string field in `fields` with `f(value)`.
    pub fn map_strings<'a, I, F>(&mut self, fields: I, f: F)
    where
        I: IntoIterator<Item = &'a String>,
        F: Fn(&str) -> String,
    {
        for name in fields {
            let is_string = self
                .shape
                .field(name)
                .map(|fd| fd.field_type == FieldType::String)
                .unwrap_or(false);
            if !is_string {
                continue;
            }
            if let Some(Value::String(s)) = self.values.get(name) {
                let next = f(s);
                self.values.insert(name.clone(), Value::String(next));
            }
        }
    }

    /// JSON object keyed by json keys, in field declaration order.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for f in self.shape.fields() {
            let v = self.values.get(&f.name).cloned().unwrap_or(Value::Null);
            map.insert(f.json.clone(), v);
        }
        Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.shape.fields();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for f in fields {
            let v = self.values.get(&f.name).unwrap_or(&Value::Null);
            map.serialize_entry(&f.json, v)?;
        }
        map.end()
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Value {
        record.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Field;

    fn user() -> Arc<Shape> {
        Arc::new(
            Shape::new(
                "User",
                vec![
                    Field::id("id", FieldType::Int64).json("user_id"),
                    Field::new("name", FieldType::String),
                    Field::new("email", FieldType::String),
                    Field::new("flags", FieldType::Int),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn zero_record_has_zero_identity() {
        let r = Record::zero(user());
        assert_eq!(r.identity(), 0);
        assert_eq!(r.get_str("name"), Some(""));
    }

    #[test]
    fn merge_keeps_fields_missing_from_body() {
        let mut r = Record::zero(user());
        r.set("name", "A").unwrap();
        r.set("email", "a@x.com").unwrap();
        let assigned = r.merge_json(br#"{"email":"b@x.com","unknown":1,"name":null}"#).unwrap();
        assert_eq!(r.get_str("name"), Some("A"));
        assert_eq!(r.get_str("email"), Some("b@x.com"));
        assert_eq!(assigned.into_iter().collect::<Vec<_>>(), vec!["email".to_string()]);
    }

    #[test]
    fn merge_rejects_type_mismatch_and_non_objects() {
        let mut r = Record::zero(user());
        assert!(matches!(
            r.merge_json(br#"{"flags":"many"}"#),
            Err(RecordError::TypeMismatch { .. })
        ));
        assert!(matches!(r.merge_json(b"[1,2]"), Err(RecordError::NotAnObject)));
        assert!(matches!(r.merge_json(b"{"), Err(RecordError::Json(_))));
    }

    #[test]
    fn serializes_with_json_keys_in_order() {
        let mut r = Record::zero(user());
        r.set_identity(3).unwrap();
        let s = serde_json::to_string(&r).unwrap();
        assert_eq!(s, r#"{"user_id":3,"name":"","email":"","flags":0}"#);
    }
}
