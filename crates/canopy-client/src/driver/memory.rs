//! In-memory storage driver.
//!
//! Interprets `Statement`s directly against tables held in memory. It is
//! the reference driver for tests and for embedding small trees, and it
//! can inject batch failures to exercise error paths.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use parking_lot::RwLock;

use canopy_common::{CanopyError, CanopyResult, DriverConfig, Value};

use super::{ConnectionState, DriverFuture, Row, StorageDriver};
use crate::query::{Condition, Delete, Expr, Insert, Projection, Select, Statement, Update};

/// Name of the column produced by `COUNT(*)`.
const COUNT_COLUMN: &str = "count";

/// Statistics about driver usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Batches applied successfully.
    pub batches_executed: u64,
    /// Statements inside successful batches.
    pub statements_executed: u64,
    /// Rows inserted, updated or deleted by successful batches.
    pub rows_affected: u64,
    /// Batches that failed and were discarded.
    pub failed_batches: u64,
    /// Read queries answered.
    pub queries_executed: u64,
}

type Tables = HashMap<String, Vec<Row>>;

/// In-memory driver.
///
/// `exec` applies a batch to a copy of the tables and swaps the copy in only
/// when every statement succeeded, so a failing batch leaves no trace.
#[derive(Debug)]
pub struct MemoryDriver {
    /// Connection state.
    state: RwLock<ConnectionState>,
    /// Tables by name.
    tables: RwLock<Tables>,
    /// Fail the next batch without applying it.
    fail_next_exec: AtomicBool,
    /// Statistics.
    stats: RwLock<DriverStats>,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    /// Creates a disconnected driver with no tables.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ConnectionState::Disconnected),
            tables: RwLock::new(HashMap::new()),
            fail_next_exec: AtomicBool::new(false),
            stats: RwLock::new(DriverStats::default()),
        }
    }

    /// Creates an empty table. Existing tables are left untouched.
    pub fn create_table(&self, name: impl Into<String>) {
        self.tables.write().entry(name.into()).or_default();
    }

    /// Returns true if the table exists.
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Returns a snapshot of all rows of a table in insertion order.
    pub fn table_rows(&self, name: &str) -> CanopyResult<Vec<Row>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CanopyError::TableNotFound {
                table: name.to_string(),
            })
    }

    /// Makes the next `exec` fail without applying anything.
    pub fn fail_next_exec(&self) {
        self.fail_next_exec.store(true, AtomicOrdering::SeqCst);
    }

    /// Returns the connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Returns driver statistics.
    pub fn stats(&self) -> DriverStats {
        self.stats.read().clone()
    }

    /// Ensures the driver is connected.
    fn ensure_connected(&self) -> CanopyResult<()> {
        match *self.state.read() {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Disconnected | ConnectionState::Closed => {
                Err(CanopyError::NotConnected)
            }
        }
    }

    fn exec_sync(&self, batch: &[Statement]) -> CanopyResult<u64> {
        self.ensure_connected()?;

        if self.fail_next_exec.swap(false, AtomicOrdering::SeqCst) {
            self.stats.write().failed_batches += 1;
            return Err(CanopyError::driver("injected batch failure"));
        }

        let mut tables = self.tables.write();
        let mut staged = tables.clone();
        let mut affected = 0u64;

        for statement in batch {
            match apply(&mut staged, statement) {
                Ok(count) => affected += count,
                Err(e) => {
                    tracing::debug!(error = %e, statement = %statement, "batch discarded");
                    self.stats.write().failed_batches += 1;
                    return Err(e);
                }
            }
        }

        *tables = staged;

        let mut stats = self.stats.write();
        stats.batches_executed += 1;
        stats.statements_executed += batch.len() as u64;
        stats.rows_affected += affected;

        Ok(affected)
    }

    fn query_sync(&self, statement: &Statement) -> CanopyResult<Vec<Row>> {
        self.ensure_connected()?;

        let Statement::Select(select) = statement else {
            return Err(CanopyError::invalid_argument(format!(
                "not a query: {}",
                statement
            )));
        };

        let tables = self.tables.read();
        let rows = run_select(&tables, select)?;
        self.stats.write().queries_executed += 1;
        Ok(rows)
    }

    fn scalar_sync(&self, statement: &Statement) -> CanopyResult<Value> {
        let first_column = match statement {
            Statement::Select(select) => match &select.projection {
                Projection::Count => COUNT_COLUMN.to_string(),
                Projection::Columns(columns) if !columns.is_empty() => columns[0].clone(),
                _ => {
                    return Err(CanopyError::invalid_argument(
                        "scalar query must project a column",
                    ))
                }
            },
            other => {
                return Err(CanopyError::invalid_argument(format!(
                    "not a query: {}",
                    other
                )))
            }
        };

        let rows = self.query_sync(statement)?;
        Ok(rows
            .first()
            .and_then(|row| row.get(&first_column).cloned())
            .unwrap_or(Value::Null))
    }
}

impl StorageDriver for MemoryDriver {
    fn open<'a>(&'a self, config: &'a DriverConfig) -> DriverFuture<'a, ()> {
        Box::pin(async move {
            if config.database.is_empty() {
                return Err(CanopyError::driver("database name must not be empty"));
            }
            *self.state.write() = ConnectionState::Connected;
            tracing::debug!(database = %config.database, "memory driver opened");
            Ok(())
        })
    }

    fn close(&self) -> DriverFuture<'_, ()> {
        Box::pin(async move {
            *self.state.write() = ConnectionState::Closed;
            Ok(())
        })
    }

    fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn exec<'a>(&'a self, batch: &'a [Statement]) -> DriverFuture<'a, u64> {
        Box::pin(async move { self.exec_sync(batch) })
    }

    fn get_rows<'a>(&'a self, statement: &'a Statement) -> DriverFuture<'a, Vec<Row>> {
        Box::pin(async move { self.query_sync(statement) })
    }

    fn get_scalar<'a>(&'a self, statement: &'a Statement) -> DriverFuture<'a, Value> {
        Box::pin(async move { self.scalar_sync(statement) })
    }
}

// =============================================================================
// Statement evaluation
// =============================================================================

fn table_mut<'t>(tables: &'t mut Tables, name: &str) -> CanopyResult<&'t mut Vec<Row>> {
    tables.get_mut(name).ok_or_else(|| CanopyError::TableNotFound {
        table: name.to_string(),
    })
}

/// Applies a modifying statement and returns the number of affected rows.
fn apply(tables: &mut Tables, statement: &Statement) -> CanopyResult<u64> {
    match statement {
        Statement::Select(select) => {
            // Reads inside a batch have no effect but must still be valid.
            run_select(tables, select).map(|_| 0)
        }
        Statement::Insert(insert) => run_insert(table_mut(tables, &insert.table)?, insert),
        Statement::Update(update) => run_update(table_mut(tables, &update.table)?, update),
        Statement::Delete(delete) => run_delete(table_mut(tables, &delete.table)?, delete),
    }
}

fn run_insert(rows: &mut Vec<Row>, insert: &Insert) -> CanopyResult<u64> {
    let mut staged = Vec::with_capacity(insert.rows.len());
    for values in &insert.rows {
        if values.len() != insert.columns.len() {
            return Err(CanopyError::driver(format!(
                "INSERT has {} columns but {} values",
                insert.columns.len(),
                values.len()
            )));
        }
        staged.push(Row::from_pairs(
            insert.columns.iter().cloned().zip(values.iter().cloned()),
        ));
    }
    let count = staged.len() as u64;
    rows.extend(staged);
    Ok(count)
}

fn run_update(rows: &mut [Row], update: &Update) -> CanopyResult<u64> {
    let mut count = 0u64;
    for row in rows.iter_mut() {
        if !matches_filter(row, update.filter.as_ref())? {
            continue;
        }
        // Evaluate every assignment against the original row first.
        let new_values = update
            .assignments
            .iter()
            .map(|(column, expr)| Ok((column.clone(), eval_expr(expr, row)?)))
            .collect::<CanopyResult<Vec<_>>>()?;
        for (column, value) in new_values {
            row.set(column, value);
        }
        count += 1;
    }
    Ok(count)
}

fn run_delete(rows: &mut Vec<Row>, delete: &Delete) -> CanopyResult<u64> {
    let mut kept = Vec::with_capacity(rows.len());
    let mut count = 0u64;
    for row in rows.drain(..) {
        if matches_filter(&row, delete.filter.as_ref())? {
            count += 1;
        } else {
            kept.push(row);
        }
    }
    *rows = kept;
    Ok(count)
}

fn run_select(tables: &Tables, select: &Select) -> CanopyResult<Vec<Row>> {
    let rows = tables
        .get(&select.table)
        .ok_or_else(|| CanopyError::TableNotFound {
            table: select.table.clone(),
        })?;

    let mut matched = Vec::new();
    for row in rows {
        if matches_filter(row, select.filter.as_ref())? {
            matched.push(row);
        }
    }

    if select.projection == Projection::Count {
        let count = matched.len() as i64;
        return Ok(vec![Row::from_pairs(vec![(
            COUNT_COLUMN,
            Value::Integer(count),
        )])]);
    }

    if !select.order_by.is_empty() {
        matched.sort_by(|a, b| {
            for (column, order) in &select.order_by {
                let ordering = sort_cmp(a.get(column), b.get(column));
                let ordering = match order {
                    crate::query::SortOrder::Asc => ordering,
                    crate::query::SortOrder::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    let limit = select
        .limit
        .map_or(matched.len(), |l| usize::try_from(l).unwrap_or(usize::MAX));

    Ok(matched
        .into_iter()
        .take(limit)
        .map(|row| match &select.projection {
            Projection::Columns(columns) => Row::from_pairs(columns.iter().map(|c| {
                (c.clone(), row.get(c).cloned().unwrap_or(Value::Null))
            })),
            _ => row.clone(),
        })
        .collect())
}

/// Sort comparison: nulls first, incomparable values treated as equal.
fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

fn matches_filter(row: &Row, filter: Option<&Condition>) -> CanopyResult<bool> {
    match filter {
        Some(condition) => eval_condition(condition, row),
        None => Ok(true),
    }
}

fn eval_condition(condition: &Condition, row: &Row) -> CanopyResult<bool> {
    match condition {
        Condition::Compare { column, op, value } => {
            let lhs = row.get(column).unwrap_or(&Value::Null);
            let rhs = eval_expr(value, row)?;
            Ok(lhs.compare(&rhs).is_some_and(|ordering| op.matches(ordering)))
        }
        Condition::InList { column, values } => {
            let lhs = row.get(column).unwrap_or(&Value::Null);
            Ok(values.iter().any(|v| lhs.sql_eq(v)))
        }
        Condition::And(parts) => {
            for part in parts {
                if !eval_condition(part, row)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}

fn eval_expr(expr: &Expr, row: &Row) -> CanopyResult<Value> {
    match expr {
        Expr::Column(name) => Ok(row.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Add(lhs, rhs) => arithmetic(eval_expr(lhs, row)?, eval_expr(rhs, row)?, false),
        Expr::Sub(lhs, rhs) => arithmetic(eval_expr(lhs, row)?, eval_expr(rhs, row)?, true),
        Expr::Neg(inner) => match eval_expr(inner, row)? {
            Value::Null => Ok(Value::Null),
            Value::Integer(i) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| CanopyError::driver("integer overflow")),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(CanopyError::TypeMismatch {
                expected: "number".to_string(),
                actual: other.type_name().to_string(),
            }),
        },
    }
}

fn arithmetic(lhs: Value, rhs: Value, subtract: bool) -> CanopyResult<Value> {
    match (&lhs, &rhs) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Integer(a), Value::Integer(b)) => {
            let result = if subtract {
                a.checked_sub(*b)
            } else {
                a.checked_add(*b)
            };
            result
                .map(Value::Integer)
                .ok_or_else(|| CanopyError::driver("integer overflow"))
        }
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(if subtract { a - b } else { a + b })),
            _ => Err(CanopyError::TypeMismatch {
                expected: "number".to_string(),
                actual: format!("{} and {}", lhs.type_name(), rhs.type_name()),
            }),
        },
    }
}
