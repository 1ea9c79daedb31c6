//! Raw shape and endpoint descriptors matching the JSON config file.

use crate::permissions::Operation;
use crate::shape::{Field, FieldType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// JSON key; defaults to the field name.
    #[serde(default)]
    pub json: Option<String>,
    /// Storage column; defaults to snake_case of the field name.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub identity: bool,
}

impl FieldConfig {
    pub fn to_field(&self) -> Field {
        let mut field = if self.identity {
            Field::id(&self.name, self.field_type)
        } else {
            Field::new(&self.name, self.field_type)
        };
        if let Some(json) = &self.json {
            field = field.json(json);
        }
        if let Some(column) = &self.column {
            field = field.column(column);
        }
        for (tag, value) in &self.tags {
            field = field.tag(tag, value);
        }
        field
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShapeConfig {
    pub name: String,
    pub fields: Vec<FieldConfig>,
}

/// One endpoint: a prefix, its base shape and optional per-operation shapes, all by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub prefix: String,
    pub shape: String,
    #[serde(default)]
    pub create: Option<String>,
    #[serde(default)]
    pub read: Option<String>,
    #[serde(default)]
    pub update: Option<String>,
    #[serde(default)]
    pub list: Option<String>,
    /// Enabled operations; all when omitted.
    #[serde(default)]
    pub operations: Option<Vec<Operation>>,
    #[serde(default)]
    pub force_name: Option<String>,
}

impl EndpointConfig {
    /// Names of the per-operation shapes that are set.
    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        [&self.create, &self.read, &self.update, &self.list]
            .into_iter()
            .filter_map(|v| v.as_deref())
    }
}

/// Full config: shape descriptors plus the endpoints built from them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub shapes: Vec<ShapeConfig>,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}
