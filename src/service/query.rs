//! Query string to list query: pagination, ordering and typed column filters.

use crate::error::CrudError;
use crate::shape::{FieldType, Shape};
use crate::storage::Storage;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

pub const DEFAULT_LIMIT: u32 = 10;
pub const FILTER_PREFIX: &str = "filter_";

/// Typed filter value, coerced from the query string by the field's declared type.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    String(String),
    Int(i32),
    Int64(i64),
}

impl From<&FilterValue> for serde_json::Value {
    fn from(v: &FilterValue) -> Self {
        match v {
            FilterValue::String(s) => serde_json::Value::String(s.clone()),
            FilterValue::Int(n) => serde_json::Value::from(*n),
            FilterValue::Int64(n) => serde_json::Value::from(*n),
        }
    }
}

/// Ordering passed through to storage as given; storage resolves the name and direction.
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub field: String,
    pub direction: String,
}

impl Order {
    pub fn is_descending(&self) -> bool {
        self.direction.eq_ignore_ascii_case("desc")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    pub limit: u32,
    pub offset: u64,
    pub order: Option<Order>,
    /// Field name to value.
    pub filters: BTreeMap<String, FilterValue>,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            limit: DEFAULT_LIMIT,
            offset: 0,
            order: None,
            filters: BTreeMap::new(),
        }
    }
}

fn key_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-zA-Z_]+$").expect("static regex"))
}

fn escape_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%[0-9A-Fa-f]{2}").expect("static regex"))
}

/// Decode a query value: `+` is a space, `%XX` a byte. None on a malformed escape or when the
/// decoded bytes are not UTF-8.
fn decode_value(raw: &str) -> Option<String> {
    if raw.matches('%').count() != escape_pattern().find_iter(raw).count() {
        return None;
    }
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|v| v.into_owned())
}

/// Split `k=v&k2=v2` into a map. Pairs with an invalid key, no `=`, or an undecodable value
/// are dropped one by one. A later duplicate key wins.
pub fn parse_params(raw: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for pair in raw.split('&') {
        let Some((key, value)) = pair.split_once('=') else { continue };
        if !key_pattern().is_match(key) {
            continue;
        }
        let Some(value) = decode_value(value) else { continue };
        out.insert(key.to_string(), value);
    }
    out
}

/// Translate a raw query string for a list request on `shape`.
///
/// Filters on unknown columns are skipped. A malformed integer for a known column fails the
/// request with `invalid_filter`; a failing column lookup fails it with `get_helper`.
pub fn translate(raw: &str, shape: &Shape, storage: &dyn Storage) -> Result<ListQuery, CrudError> {
    let params = parse_params(raw);

    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LIMIT);
    let offset = params
        .get("offset")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let order = params
        .get("order")
        .filter(|o| !o.is_empty())
        .map(|field| Order {
            field: field.clone(),
            direction: params.get("order_direction").cloned().unwrap_or_default(),
        });

    let mut sorted: Vec<(&String, &String)> = params.iter().collect();
    sorted.sort();
    let mut filters = BTreeMap::new();
    for (key, value) in sorted {
        let Some(column) = key.strip_prefix(FILTER_PREFIX) else { continue };
        let Some(field_name) = storage.field_for_column(shape, column).map_err(CrudError::Lookup)? else {
            continue;
        };
        let Some(field) = shape.field(&field_name) else { continue };
        let invalid = || CrudError::InvalidFilter {
            column: column.to_string(),
            value: value.clone(),
        };
        let fv = match field.field_type {
            FieldType::Int => FilterValue::Int(value.parse().map_err(|_| invalid())?),
            FieldType::Int64 => FilterValue::Int64(value.parse().map_err(|_| invalid())?),
            FieldType::String => FilterValue::String(value.clone()),
            FieldType::Bool | FieldType::Float => continue,
        };
        filters.insert(field_name, fv);
    }

    Ok(ListQuery {
        limit,
        offset,
        order,
        filters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Field;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    fn registered() -> (MemoryStorage, Arc<Shape>) {
        let shape = Arc::new(
            Shape::new(
                "User",
                vec![
                    Field::id("id", FieldType::Int64),
                    Field::new("name", FieldType::String),
                    Field::new("age", FieldType::Int),
                    Field::new("score", FieldType::Float),
                ],
            )
            .unwrap(),
        );
        let storage = MemoryStorage::new();
        storage.register_shape(&shape, None, None).unwrap();
        (storage, shape)
    }

    #[test]
    fn drops_bad_keys_and_bad_escapes_only() {
        let p = parse_params("a-b=1&ok=1&bad=%zz&name=bob%20smith&plus=a+b&noval&x=%41");
        assert_eq!(p.get("ok").map(String::as_str), Some("1"));
        assert_eq!(p.get("name").map(String::as_str), Some("bob smith"));
        assert_eq!(p.get("plus").map(String::as_str), Some("a b"));
        assert_eq!(p.get("x").map(String::as_str), Some("A"));
        assert!(!p.contains_key("a-b"));
        assert!(!p.contains_key("bad"));
        assert!(!p.contains_key("noval"));
    }

    #[test]
    fn invalid_utf8_drops_only_that_pair() {
        let p = parse_params("name=%FF&other=%C3%A9t%C3%A9&sum=1%2B1");
        assert!(!p.contains_key("name"));
        assert_eq!(p.get("other").map(String::as_str), Some("été"));
        assert_eq!(p.get("sum").map(String::as_str), Some("1+1"));
    }

    #[test]
    fn pagination_defaults() {
        let (storage, shape) = registered();
        let q = translate("limit=0&offset=-5", &shape, &storage).unwrap();
        assert_eq!((q.limit, q.offset), (10, 0));
        let q = translate("limit=abc&offset=x", &shape, &storage).unwrap();
        assert_eq!((q.limit, q.offset), (10, 0));
        let q = translate("limit=25&offset=50", &shape, &storage).unwrap();
        assert_eq!((q.limit, q.offset), (25, 50));
    }

    #[test]
    fn order_requires_order_param() {
        let (storage, shape) = registered();
        let q = translate("order_direction=desc", &shape, &storage).unwrap();
        assert_eq!(q.order, None);
        let q = translate("order=name&order_direction=DESC", &shape, &storage).unwrap();
        let order = q.order.unwrap();
        assert_eq!(order.field, "name");
        assert!(order.is_descending());
    }

    #[test]
    fn typed_filters() {
        let (storage, shape) = registered();
        let q = translate("filter_name=bob&filter_age=42", &shape, &storage).unwrap();
        assert_eq!(q.filters.get("name"), Some(&FilterValue::String("bob".into())));
        assert_eq!(q.filters.get("age"), Some(&FilterValue::Int(42)));
    }

    #[test]
    fn unknown_columns_and_other_types_are_skipped() {
        let (storage, shape) = registered();
        let q = translate("filter_unknown=x&filter_score=1.5", &shape, &storage).unwrap();
        assert!(q.filters.is_empty());
    }

    #[test]
    fn malformed_value_for_known_column_fails() {
        let (storage, shape) = registered();
        let err = translate("filter_age=notanumber", &shape, &storage).unwrap_err();
        assert_eq!(err.code(), "invalid_filter");
    }

    #[test]
    fn lookup_failure_is_internal() {
        let storage = MemoryStorage::new();
        let shape = Shape::new("Ghost", vec![Field::id("id", FieldType::Int64)]).unwrap();
        let err = translate("filter_id=1", &shape, &storage).unwrap_err();
        assert_eq!(err.code(), "get_helper");
    }
}
