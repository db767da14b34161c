//! User record model.
//!
//! A record is one row of the `users` table, keyed by the column names the
//! query reported. Its shape is decided by the database at query time, so
//! the record is an ordered JSON object rather than a fixed struct.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// One row of the `users` table, column name to value, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct UserRecord(Map<String, Value>);

impl UserRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column. A repeated column name replaces the earlier value
    /// but keeps its position.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Column names in the order they were inserted.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for UserRecord {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}
