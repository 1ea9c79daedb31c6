//! Registered shapes and the base shape (table) each of them maps onto.

use crate::error::StorageError;
use crate::shape::{FieldType, Shape};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Entries {
    /// Registered name (shape name or forced name) -> shape.
    by_name: HashMap<String, Arc<Shape>>,
    /// Shape name -> base shape that owns the storage.
    base_of: HashMap<String, Arc<Shape>>,
}

/// Shared by storage implementations to resolve records onto their backing shape.
#[derive(Default)]
pub struct ShapeCatalog {
    entries: RwLock<Entries>,
}

impl ShapeCatalog {
    pub fn new() -> Self {
        ShapeCatalog::default()
    }

    /// Register `shape`. With `primary` unset the shape is its own base. A secondary shape must
    /// carry an identity and only fields that exist on the base with the same type and column.
    /// Registering an identical shape again is a no-op.
    pub fn register(
        &self,
        shape: &Arc<Shape>,
        primary: Option<&Arc<Shape>>,
        force_name: Option<&str>,
    ) -> Result<(), StorageError> {
        let base = match primary {
            Some(base) => {
                check_maps_onto(shape, base)?;
                Arc::clone(base)
            }
            None => Arc::clone(shape),
        };
        let name = force_name.unwrap_or(shape.name()).to_string();

        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Backend("shape catalog lock poisoned".to_string()))?;
        if let Some(existing) = entries.by_name.get(&name) {
            if **existing != **shape {
                return Err(StorageError::DuplicateShape(name));
            }
        }
        if let Some(existing) = entries.base_of.get(shape.name()) {
            if **existing != *base {
                return Err(StorageError::DuplicateShape(shape.name().to_string()));
            }
        }
        if primary.is_some() && !entries.base_of.contains_key(base.name()) {
            return Err(StorageError::UnknownShape(base.name().to_string()));
        }
        entries.by_name.insert(name, Arc::clone(shape));
        entries.base_of.insert(shape.name().to_string(), base);
        Ok(())
    }

    /// Base shape for records of `shape`.
    pub fn base_of(&self, shape: &Shape) -> Result<Arc<Shape>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Backend("shape catalog lock poisoned".to_string()))?;
        entries
            .base_of
            .get(shape.name())
            .cloned()
            .ok_or_else(|| StorageError::UnknownShape(shape.name().to_string()))
    }

    /// Field name of `shape` stored in `column`; None when the shape has no such column.
    pub fn field_for_column(&self, shape: &Shape, column: &str) -> Result<Option<String>, StorageError> {
        self.base_of(shape)?;
        Ok(shape.field_by_column(column).map(|f| f.name.clone()))
    }
}

fn check_maps_onto(shape: &Shape, base: &Shape) -> Result<(), StorageError> {
    let incompatible = |reason: String| StorageError::IncompatibleShape {
        shape: shape.name().to_string(),
        base: base.name().to_string(),
        reason,
    };
    let id = shape.identity();
    if id.name != base.identity().name || id.column != base.identity().column {
        return Err(incompatible(format!("identity '{}' differs from base identity", id.name)));
    }
    for f in shape.fields() {
        let Some(bf) = base.field(&f.name) else {
            return Err(incompatible(format!("field '{}' missing on base", f.name)));
        };
        if bf.column != f.column {
            return Err(incompatible(format!("field '{}' uses column '{}'", f.name, f.column)));
        }
        // a view may widen int to int64, never narrow: stored ids and values must always fit
        let widens = bf.field_type == FieldType::Int && f.field_type == FieldType::Int64;
        if bf.field_type == FieldType::Int64 && f.field_type == FieldType::Int {
            return Err(incompatible(format!("field '{}' is int but the base stores int64", f.name)));
        }
        if bf.field_type != f.field_type && !widens {
            return Err(incompatible(format!("field '{}' type {} differs", f.name, f.field_type.as_str())));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Field, FieldType};

    fn user() -> Arc<Shape> {
        Arc::new(
            Shape::new(
                "User",
                vec![
                    Field::id("id", FieldType::Int64),
                    Field::new("name", FieldType::String),
                    Field::new("password", FieldType::String),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn secondary_shapes_resolve_to_base() {
        let catalog = ShapeCatalog::new();
        let base = user();
        catalog.register(&base, None, None).unwrap();
        let list = Arc::new(
            Shape::new(
                "User_List",
                vec![Field::id("id", FieldType::Int64), Field::new("name", FieldType::String)],
            )
            .unwrap(),
        );
        catalog.register(&list, Some(&base), None).unwrap();
        assert_eq!(catalog.base_of(&list).unwrap().name(), "User");
        assert_eq!(catalog.field_for_column(&list, "name").unwrap(), Some("name".to_string()));
        assert_eq!(catalog.field_for_column(&list, "password").unwrap(), None);
    }

    #[test]
    fn rejects_fields_missing_from_base() {
        let catalog = ShapeCatalog::new();
        let base = user();
        catalog.register(&base, None, None).unwrap();
        let bad = Arc::new(
            Shape::new(
                "User_Bad",
                vec![Field::id("id", FieldType::Int64), Field::new("nickname", FieldType::String)],
            )
            .unwrap(),
        );
        assert!(matches!(
            catalog.register(&bad, Some(&base), None),
            Err(StorageError::IncompatibleShape { .. })
        ));
    }

    #[test]
    fn narrower_integers_are_rejected() {
        let catalog = ShapeCatalog::new();
        let base = Arc::new(
            Shape::new(
                "Counter",
                vec![Field::id("id", FieldType::Int64), Field::new("hits", FieldType::Int)],
            )
            .unwrap(),
        );
        catalog.register(&base, None, None).unwrap();

        let narrow_id = Arc::new(Shape::new("Counter_Narrow", vec![Field::id("id", FieldType::Int)]).unwrap());
        assert!(matches!(
            catalog.register(&narrow_id, Some(&base), None),
            Err(StorageError::IncompatibleShape { .. })
        ));

        let wide_hits = Arc::new(
            Shape::new(
                "Counter_Wide",
                vec![Field::id("id", FieldType::Int64), Field::new("hits", FieldType::Int64)],
            )
            .unwrap(),
        );
        catalog.register(&wide_hits, Some(&base), None).unwrap();
    }

    #[test]
    fn duplicate_names_need_identical_shapes() {
        let catalog = ShapeCatalog::new();
        let base = user();
        catalog.register(&base, None, None).unwrap();
        catalog.register(&base, None, None).unwrap();
        let other = Arc::new(Shape::new("User", vec![Field::id("id", FieldType::Int64)]).unwrap());
        assert!(matches!(
            catalog.register(&other, None, None),
            Err(StorageError::DuplicateShape(_))
        ));
        catalog.register(&base, None, Some("Account")).unwrap();
    }

    #[test]
    fn unregistered_shape_lookup_fails() {
        let catalog = ShapeCatalog::new();
        assert!(catalog.field_for_column(&user(), "name").is_err());
    }
}
