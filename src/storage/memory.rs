//! In-memory storage for tests and demos. Same semantics as the PostgreSQL storage.

use super::{ItemTransform, ShapeCatalog, Storage};
use crate::error::StorageError;
use crate::service::ListQuery;
use crate::shape::{Record, Shape, ShapeFactory};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

type Row = BTreeMap<String, Value>;

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Row>,
}

/// Number of data calls made so far, per operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub load: usize,
    pub save: usize,
    pub delete: usize,
    pub list: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.load + self.save + self.delete + self.list
    }
}

#[derive(Default)]
struct Counters {
    load: AtomicUsize,
    save: AtomicUsize,
    delete: AtomicUsize,
    list: AtomicUsize,
}

#[derive(Default)]
pub struct MemoryStorage {
    catalog: ShapeCatalog,
    /// Base shape name -> rows keyed by identity.
    tables: Mutex<BTreeMap<String, Table>>,
    counters: Counters,
    failing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            load: self.counters.load.load(AtomicOrdering::SeqCst),
            save: self.counters.save.load(AtomicOrdering::SeqCst),
            delete: self.counters.delete.load(AtomicOrdering::SeqCst),
            list: self.counters.list.load(AtomicOrdering::SeqCst),
        }
    }

    /// Make every data call fail with a backend error until switched off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    /// Stored row of the base table, keyed by field name.
    pub fn row(&self, base: &str, id: i64) -> Option<BTreeMap<String, Value>> {
        let tables = self.tables.lock().ok()?;
        tables.get(base).and_then(|t| t.rows.get(&id)).cloned()
    }

    fn enter(&self, counter: &AtomicUsize) -> Result<(), StorageError> {
        counter.fetch_add(1, AtomicOrdering::SeqCst);
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(StorageError::Backend("memory storage set to fail".to_string()));
        }
        Ok(())
    }

    fn tables(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Table>>, StorageError> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Backend("memory storage mutex poisoned".to_string()))
    }
}

/// Copy the record's shape fields out of a base row.
fn fill_from_row(record: &mut Record, row: &Row) -> Result<(), StorageError> {
    let names: Vec<String> = record.shape().fields().iter().map(|f| f.name.clone()).collect();
    for name in names {
        if let Some(v) = row.get(&name) {
            record.set(&name, v.clone())?;
        }
    }
    Ok(())
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .unwrap_or(0.0)
                .partial_cmp(&y.as_f64().unwrap_or(0.0))
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn register_shape(
        &self,
        shape: &Arc<Shape>,
        primary: Option<&Arc<Shape>>,
        force_name: Option<&str>,
    ) -> Result<(), StorageError> {
        self.catalog.register(shape, primary, force_name)?;
        if primary.is_none() {
            self.tables()?.entry(shape.name().to_string()).or_default();
        }
        Ok(())
    }

    async fn load(&self, record: &mut Record, id: i64) -> Result<(), StorageError> {
        self.enter(&self.counters.load)?;
        let base = self.catalog.base_of(record.shape())?;
        record.reset();
        let tables = self.tables()?;
        if let Some(row) = tables.get(base.name()).and_then(|t| t.rows.get(&id)) {
            fill_from_row(record, row)?;
        }
        Ok(())
    }

    async fn save(&self, record: &mut Record) -> Result<(), StorageError> {
        self.enter(&self.counters.save)?;
        let base = self.catalog.base_of(record.shape())?;
        let id_field = record.shape().identity().name.clone();
        let mut tables = self.tables()?;
        let table = tables.entry(base.name().to_string()).or_default();

        let mut id = record.identity();
        if id == 0 {
            table.next_id += 1;
            id = table.next_id;
            let row: Row = base
                .fields()
                .iter()
                .map(|f| (f.name.clone(), f.field_type.zero_value()))
                .collect();
            table.rows.insert(id, row);
        }
        let row = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| StorageError::Backend(format!("{} {} does not exist", base.name(), id)))?;
        for f in record.shape().fields() {
            if f.name == id_field {
                continue;
            }
            if let Some(v) = record.get(&f.name) {
                row.insert(f.name.clone(), v.clone());
            }
        }
        row.insert(base.identity().name.clone(), Value::from(id));
        drop(tables);
        record.set_identity(id)?;
        Ok(())
    }

    async fn delete(&self, record: &Record) -> Result<(), StorageError> {
        self.enter(&self.counters.delete)?;
        let base = self.catalog.base_of(record.shape())?;
        let mut tables = self.tables()?;
        if let Some(table) = tables.get_mut(base.name()) {
            table.rows.remove(&record.identity());
        }
        Ok(())
    }

    async fn list(
        &self,
        factory: &dyn ShapeFactory,
        query: &ListQuery,
        transform: ItemTransform<'_>,
    ) -> Result<Vec<Record>, StorageError> {
        self.enter(&self.counters.list)?;
        let shape = factory.shape();
        let base = self.catalog.base_of(shape)?;
        for name in query.filters.keys() {
            if base.field(name).is_none() {
                return Err(StorageError::InvalidFilters(name.clone()));
            }
        }

        let tables = self.tables()?;
        let mut rows: Vec<&Row> = tables
            .get(base.name())
            .map(|t| t.rows.values().collect())
            .unwrap_or_default();
        rows.retain(|row| {
            query
                .filters
                .iter()
                .all(|(name, fv)| row.get(name) == Some(&Value::from(fv)))
        });

        let order = query
            .order
            .as_ref()
            .and_then(|o| super::resolve_order(shape, o))
            .map(|(f, desc)| (f.name.clone(), desc));
        if let Some((field, desc)) = order {
            rows.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(&field).unwrap_or(&Value::Null),
                    b.get(&field).unwrap_or(&Value::Null),
                );
                if desc {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let mut out = Vec::new();
        for row in rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
        {
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
