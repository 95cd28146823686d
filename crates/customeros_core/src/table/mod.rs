//! Filter and sort adapters for table views over cached entities.
//!
//! # Responsibility
//! - Give a generic table engine one predicate shape per column:
//!   `filter(row, column_id, value)` plus `auto_remove(value)`.
//! - Resolve relational columns through the row's root store.
//!
//! # Invariants
//! - Adapters only read; they never write to an entity or a collection.
//! - `auto_remove` is true exactly for an absent value, `null`, `false` or
//!   an empty array, for every adapter.
//! - Date comparisons use only the `YYYY-MM-DD` prefix of a timestamp.
//!
//! # See also
//! - `organization_filters`, `contract_filters`, `invoice_filters`,
//!   `contact_filters` for the per-kind rules.

pub mod contact_filters;
pub mod contract_filters;
pub mod invoice_filters;
pub mod organization_filters;
pub mod sort;

use crate::error::{StoreError, StoreResult};
use crate::model::Record;
use crate::store::entity::EntityStore;
use crate::store::root::RootStore;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Value a table column filter is set to; `None` is "never set".
pub type FilterValue = Option<Value>;

/// Whether a filter value counts as cleared.
pub fn is_empty_filter_value(value: &FilterValue) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Column accessors of one record kind.
pub trait ColumnAccess: Record {
    fn column_value(&self, column_id: &str) -> Option<Value>;
}

/// One table row backed by a cached entity.
#[derive(Debug, Clone)]
pub struct Row<T: Record> {
    store: EntityStore<T>,
}

impl<T: Record> Row<T> {
    pub fn new(store: EntityStore<T>) -> Self {
        Self { store }
    }

    /// The entity behind this row.
    pub fn original(&self) -> &EntityStore<T> {
        &self.store
    }

    /// Root store used for relational columns.
    pub fn root(&self) -> Option<Arc<RootStore>> {
        self.store.root()
    }
}

impl<T: ColumnAccess> Row<T> {
    pub fn value(&self, column_id: &str) -> Option<Value> {
        self.store.read(|record| record.column_value(column_id))
    }
}

/// Column predicate plus its auto-remove companion.
pub trait FilterAdapter<T: Record>: Send + Sync {
    fn filter(&self, row: &Row<T>, column_id: &str, value: &FilterValue) -> bool;

    fn auto_remove(&self, value: &FilterValue) -> bool {
        is_empty_filter_value(value)
    }
}

/// Adapters keyed by column id together with the active filter values.
pub struct ColumnFilters<T: Record> {
    adapters: BTreeMap<String, Box<dyn FilterAdapter<T>>>,
    active: BTreeMap<String, Value>,
}

impl<T: Record> Default for ColumnFilters<T> {
    fn default() -> Self {
        Self {
            adapters: BTreeMap::new(),
            active: BTreeMap::new(),
        }
    }
}

impl<T: Record> ColumnFilters<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column_id: &str, adapter: impl FilterAdapter<T> + 'static) -> Self {
        self.adapters.insert(column_id.to_string(), Box::new(adapter));
        self
    }

    /// Sets or clears the filter of one column.
    ///
    /// Returns whether the column is active afterwards.
    ///
    /// # Errors
    /// - `Configuration` when no adapter is registered for `column_id`.
    pub fn set(&mut self, column_id: &str, value: FilterValue) -> StoreResult<bool> {
        let adapter = self.adapters.get(column_id).ok_or_else(|| {
            StoreError::Configuration(format!("no filter registered for column `{column_id}`"))
        })?;
        if adapter.auto_remove(&value) {
            self.active.remove(column_id);
            return Ok(false);
        }
        match value {
            Some(value) => {
                self.active.insert(column_id.to_string(), value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Column ids with an active filter, sorted.
    pub fn active_columns(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }

    pub fn columns(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    /// Whether a row passes every active filter.
    pub fn matches(&self, row: &Row<T>) -> bool {
        self.active.iter().all(|(column_id, value)| {
            let value = Some(value.clone());
            self.adapters
                .get(column_id)
                .map_or(true, |adapter| adapter.filter(row, column_id, &value))
        })
    }

    /// Rows passing every active filter, in input order.
    pub fn apply(&self, stores: &[EntityStore<T>]) -> Vec<EntityStore<T>> {
        stores
            .iter()
            .filter(|store| self.matches(&Row::new((*store).clone())))
            .cloned()
            .collect()
    }
}

/// String items of a list filter; an object filter contributes its `value`.
pub(crate) fn string_items(value: &FilterValue) -> Vec<String> {
    list_items(value)
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect()
}

pub(crate) fn number_items(value: &FilterValue) -> Vec<i64> {
    list_items(value).iter().filter_map(Value::as_i64).collect()
}

fn list_items(value: &FilterValue) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Object(map)) => match map.get("value") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Text of a string filter or of an object filter's `value`.
pub(crate) fn text_value(value: &FilterValue) -> Option<String> {
    match value {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Object(map)) => map.get("value").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
    .map(|text| text.trim().to_lowercase())
}

/// `showEmpty` flag of an object filter.
pub(crate) fn show_empty(value: &FilterValue) -> bool {
    match value {
        Some(Value::Object(map)) => map.get("showEmpty").and_then(Value::as_bool).unwrap_or(false),
        _ => false,
    }
}

/// Date portion of a timestamp, sliced before parsing.
pub(crate) fn date_part(value: &str) -> Option<NaiveDate> {
    let day = value.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub(crate) fn date_filter(value: &FilterValue) -> Option<NaiveDate> {
    match value {
        Some(Value::String(text)) => date_part(text),
        Some(Value::Object(map)) => map.get("value").and_then(Value::as_str).and_then(date_part),
        _ => None,
    }
}

pub(crate) fn contains_text(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
