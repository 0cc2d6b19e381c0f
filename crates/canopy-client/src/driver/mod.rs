//! Storage driver interface.
//!
//! The engine never talks to a database directly. It submits statements
//! through a `StorageDriver`, which owns the connection and the
//! transaction semantics:
//!
//! - `StorageDriver` trait: the narrow capability set the engine consumes
//! - `MemoryDriver`: an in-memory reference driver for tests and embedding
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  Vec<Statement>   ┌──────────────────┐
//! │ Tree Manager │──────────────────▶│  StorageDriver   │
//! │              │◀──────────────────│ (exec, get_rows, │
//! └──────────────┘   rows / scalar   │  get_scalar)     │
//!                                    └──────────────────┘
//! ```
//!
//! `exec` must apply a whole batch atomically: either every statement takes
//! effect or none does.

mod memory;

pub use memory::{DriverStats, MemoryDriver};

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use canopy_common::{CanopyError, CanopyResult, DriverConfig, Value};

use crate::query::Statement;

/// Boxed future returned by driver methods.
pub type DriverFuture<'a, T> = Pin<Box<dyn Future<Output = CanopyResult<T>> + Send + 'a>>;

/// Trait for storage driver implementations.
///
/// This trait abstracts the relational store, allowing different
/// implementations for production databases and testing (in-memory).
pub trait StorageDriver: Send + Sync {
    /// Opens the connection.
    fn open<'a>(&'a self, config: &'a DriverConfig) -> DriverFuture<'a, ()>;

    /// Closes the connection.
    fn close(&self) -> DriverFuture<'_, ()>;

    /// Returns true once the driver is open and usable.
    fn is_ready(&self) -> bool;

    /// Applies all statements atomically and returns the number of
    /// affected rows.
    fn exec<'a>(&'a self, batch: &'a [Statement]) -> DriverFuture<'a, u64>;

    /// Runs a query and returns its rows.
    fn get_rows<'a>(&'a self, statement: &'a Statement) -> DriverFuture<'a, Vec<Row>>;

    /// Runs a query and returns the first column of its first row.
    ///
    /// Returns `Value::Null` when the query produces no rows.
    fn get_scalar<'a>(&'a self, statement: &'a Statement) -> DriverFuture<'a, Value>;
}

/// Connection state of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// Connected and ready.
    Connected,
    /// Connection closed.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// A result row: column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from `(column, value)` pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns the value of a column, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Sets the value of a column.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    /// Removes a column and returns its value.
    pub fn take(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    /// Returns a column converted to `T`.
    ///
    /// Fails with `ColumnNotFound` when the column is missing and with
    /// `TypeMismatch` when the value cannot be converted.
    pub fn try_get<T: FromValue>(&self, column: &str) -> CanopyResult<T> {
        let value = self.get(column).ok_or_else(|| CanopyError::ColumnNotFound {
            column: column.to_string(),
        })?;
        T::from_value(value).ok_or_else(|| CanopyError::TypeMismatch {
            expected: T::type_name().to_string(),
            actual: value.type_name().to_string(),
        })
    }

    /// Iterates over `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Trait for converting from Value.
pub trait FromValue: Sized {
    /// Converts from a Value.
    fn from_value(value: &Value) -> Option<Self>;

    /// Name of the target type, for error messages.
    fn type_name() -> &'static str;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(*i),
            // Some stores report integral columns as floats.
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    fn type_name() -> &'static str {
        "integer"
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn type_name() -> &'static str {
        "float"
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn type_name() -> &'static str {
        "boolean"
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(|s| s.to_string())
    }

    fn type_name() -> &'static str {
        "string"
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }

    fn type_name() -> &'static str {
        "value"
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }

    fn type_name() -> &'static str {
        T::type_name()
    }
}
