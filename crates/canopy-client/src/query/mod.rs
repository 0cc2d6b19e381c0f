//! Parameterized statement model.
//!
//! Statements are built as values rather than strings: drivers with bind
//! support render them with `build_with_params`, drivers without it use
//! `build`, and the in-memory driver interprets them directly. Column names
//! come from validated configuration; every literal is a bound parameter.
//!
//! ```rust
//! use canopy_client::query::{col, Expr, Statement, Update};
//!
//! let stmt: Statement = Update::table("tree")
//!     .set("rightValue", Expr::column("rightValue").plus(2))
//!     .filter(col("rightValue").ge(5))
//!     .into();
//!
//! let (sql, params) = stmt.build_with_params();
//! assert_eq!(sql, "UPDATE tree SET rightValue = rightValue + $1 WHERE rightValue >= $2");
//! assert_eq!(params.len(), 2);
//! ```

mod render;

use std::cmp::Ordering;
use std::fmt;

use canopy_common::Value;

pub use render::format_value;

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl CmpOp {
    /// Returns the SQL representation.
    pub fn as_sql(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::NotEq => "<>",
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
        }
    }

    /// Returns true if `ordering` (left compared to right) satisfies the operator.
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::NotEq => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::LtEq => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::GtEq => ordering != Ordering::Less,
        }
    }
}

/// A scalar expression: the right-hand side of comparisons and assignments.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Current value of a column.
    Column(String),
    /// A bound literal.
    Literal(Value),
    /// Sum of two expressions.
    Add(Box<Expr>, Box<Expr>),
    /// Difference of two expressions.
    Sub(Box<Expr>, Box<Expr>),
    /// Arithmetic negation.
    Neg(Box<Expr>),
}

impl Expr {
    /// References a column.
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    /// Wraps a literal.
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// `self + rhs`
    #[must_use]
    pub fn plus(self, rhs: impl Into<Expr>) -> Self {
        Expr::Add(Box::new(self), Box::new(rhs.into()))
    }

    /// `self - rhs`
    #[must_use]
    pub fn minus(self, rhs: impl Into<Expr>) -> Self {
        Expr::Sub(Box::new(self), Box::new(rhs.into()))
    }

    /// `-self`
    #[must_use]
    pub fn negate(self) -> Self {
        Expr::Neg(Box::new(self))
    }

    /// Returns true for columns and literals.
    fn is_atom(&self) -> bool {
        matches!(self, Expr::Column(_) | Expr::Literal(_))
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Literal(Value::Integer(v))
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Literal(Value::from(v))
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Expr::Literal(Value::from(v))
    }
}

/// A row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column <op> value`
    Compare {
        /// Column on the left-hand side.
        column: String,
        /// Operator.
        op: CmpOp,
        /// Right-hand side.
        value: Expr,
    },
    /// `column IN (values...)`; an empty list matches nothing.
    InList {
        /// Tested column.
        column: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Conjunction; an empty conjunction matches everything.
    And(Vec<Condition>),
}

impl Condition {
    /// Combines two conditions with `AND`, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Condition) -> Self {
        let mut parts = match self {
            Condition::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Condition::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Condition::And(parts)
    }

    /// Builds the conjunction of all given conditions.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        conditions
            .into_iter()
            .fold(Condition::And(Vec::new()), Condition::and)
    }
}

/// A column reference used to start a condition.
#[derive(Debug, Clone)]
pub struct ColumnRef(String);

/// References a column for building a condition.
pub fn col(name: impl Into<String>) -> ColumnRef {
    ColumnRef(name.into())
}

impl ColumnRef {
    fn compare(self, op: CmpOp, value: impl Into<Expr>) -> Condition {
        Condition::Compare {
            column: self.0,
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(self, value: impl Into<Expr>) -> Condition {
        self.compare(CmpOp::Eq, value)
    }

    /// `column <> value`
    pub fn ne(self, value: impl Into<Expr>) -> Condition {
        self.compare(CmpOp::NotEq, value)
    }

    /// `column < value`
    pub fn lt(self, value: impl Into<Expr>) -> Condition {
        self.compare(CmpOp::Lt, value)
    }

    /// `column <= value`
    pub fn le(self, value: impl Into<Expr>) -> Condition {
        self.compare(CmpOp::LtEq, value)
    }

    /// `column > value`
    pub fn gt(self, value: impl Into<Expr>) -> Condition {
        self.compare(CmpOp::Gt, value)
    }

    /// `column >= value`
    pub fn ge(self, value: impl Into<Expr>) -> Condition {
        self.compare(CmpOp::GtEq, value)
    }

    /// `column IN (values...)`
    pub fn in_list(self, values: impl IntoIterator<Item = Value>) -> Condition {
        Condition::InList {
            column: self.0,
            values: values.into_iter().collect(),
        }
    }
}

/// Result columns of a select.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`
    All,
    /// Named columns.
    Columns(Vec<String>),
    /// `COUNT(*)`
    Count,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// Returns the SQL representation.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// `SELECT ... FROM ... [WHERE] [ORDER BY] [LIMIT]`
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// Source table.
    pub table: String,
    /// Result columns.
    pub projection: Projection,
    /// Row filter.
    pub filter: Option<Condition>,
    /// Sort keys, most significant first.
    pub order_by: Vec<(String, SortOrder)>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
}

impl Select {
    /// Starts a `SELECT *` from `table`.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            projection: Projection::All,
            filter: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Selects only the named columns.
    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.projection = Projection::Columns(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Turns the select into `SELECT COUNT(*)`.
    #[must_use]
    pub fn count(mut self) -> Self {
        self.projection = Projection::Count;
        self
    }

    /// Adds a filter, combined with any existing one by `AND`.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(and_filter(self.filter.take(), condition));
        self
    }

    /// Appends an ascending sort key.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push((column.into(), SortOrder::Asc));
        self
    }

    /// Appends a descending sort key.
    #[must_use]
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by.push((column.into(), SortOrder::Desc));
        self
    }

    /// Limits the number of rows.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// `INSERT INTO ... (columns) VALUES (...), (...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    /// Target table.
    pub table: String,
    /// Column list.
    pub columns: Vec<String>,
    /// One value list per inserted row.
    pub rows: Vec<Vec<Value>>,
}

impl Insert {
    /// Starts an insert into `table`.
    pub fn into_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Sets the column list.
    #[must_use]
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Appends one row of values.
    #[must_use]
    pub fn values(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }
}

/// `UPDATE ... SET ... [WHERE]`
///
/// All assignments read the row as it was before the statement, as in SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Target table.
    pub table: String,
    /// `column = expr` pairs.
    pub assignments: Vec<(String, Expr)>,
    /// Row filter.
    pub filter: Option<Condition>,
}

impl Update {
    /// Starts an update of `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            filter: None,
        }
    }

    /// Appends an assignment.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Adds a filter, combined with any existing one by `AND`.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(and_filter(self.filter.take(), condition));
        self
    }
}

/// `DELETE FROM ... [WHERE]`
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    /// Target table.
    pub table: String,
    /// Row filter.
    pub filter: Option<Condition>,
}

impl Delete {
    /// Starts a delete from `table`.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    /// Adds a filter, combined with any existing one by `AND`.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(and_filter(self.filter.take(), condition));
        self
    }
}

fn and_filter(existing: Option<Condition>, condition: Condition) -> Condition {
    match existing {
        Some(current) => current.and(condition),
        None => condition,
    }
}

/// A single relational statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Read rows or a scalar.
    Select(Select),
    /// Insert rows.
    Insert(Insert),
    /// Update rows in place.
    Update(Update),
    /// Delete rows.
    Delete(Delete),
}

impl Statement {
    /// Returns the table the statement addresses.
    pub fn table(&self) -> &str {
        match self {
            Statement::Select(s) => &s.table,
            Statement::Insert(i) => &i.table,
            Statement::Update(u) => &u.table,
            Statement::Delete(d) => &d.table,
        }
    }

    /// Returns true if the statement does not modify data.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Statement::Select(_))
    }

    /// Builds SQL with literals formatted inline.
    pub fn build(&self) -> String {
        render::render(self, true).0
    }

    /// Builds SQL with `$n` placeholders and the parameters separated.
    pub fn build_with_params(&self) -> (String, Vec<Value>) {
        render::render(self, false)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

impl From<Select> for Statement {
    fn from(s: Select) -> Self {
        Statement::Select(s)
    }
}

impl From<Insert> for Statement {
    fn from(i: Insert) -> Self {
        Statement::Insert(i)
    }
}

impl From<Update> for Statement {
    fn from(u: Update) -> Self {
        Statement::Update(u)
    }
}

impl From<Delete> for Statement {
    fn from(d: Delete) -> Self {
        Statement::Delete(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_build() {
        let stmt: Statement = Select::from("users")
            .columns(&["id", "name"])
            .filter(col("active").eq(Value::Boolean(true)))
            .order_by("name")
            .limit(10)
            .into();

        assert_eq!(
            stmt.build(),
            "SELECT id, name FROM users WHERE active = TRUE ORDER BY name ASC LIMIT 10"
        );
    }

    #[test]
    fn test_select_count_with_params() {
        let stmt: Statement = Select::from("tree")
            .count()
            .filter(col("leftValue").gt(1))
            .filter(col("rightValue").lt(8))
            .into();

        let (sql, params) = stmt.build_with_params();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM tree WHERE leftValue > $1 AND rightValue < $2"
        );
        assert_eq!(params, vec![Value::Integer(1), Value::Integer(8)]);
    }

    #[test]
    fn test_insert_build() {
        let stmt: Statement = Insert::into_table("users")
            .columns(vec!["id".to_string(), "name".to_string()])
            .values(vec![Value::Integer(1), Value::from("Alice")])
            .values(vec![Value::Integer(2), Value::from("it's")])
            .into();

        assert_eq!(
            stmt.build(),
            "INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'it''s')"
        );
        let (sql, params) = stmt.build_with_params();
        assert_eq!(sql, "INSERT INTO users (id, name) VALUES ($1, $2), ($3, $4)");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_update_negation() {
        let stmt: Statement = Update::table("tree")
            .set("leftValue", Expr::column("leftValue").negate())
            .set("level", Expr::literal(4).minus(Expr::column("level")))
            .filter(col("id").in_list(vec![Value::Integer(1), Value::Integer(2)]))
            .into();

        assert_eq!(
            stmt.build(),
            "UPDATE tree SET leftValue = -leftValue, level = 4 - level WHERE id IN (1, 2)"
        );
    }

    #[test]
    fn test_nested_expression_parenthesized() {
        let stmt: Statement = Update::table("t")
            .set(
                "a",
                Expr::literal(6).minus(Expr::column("a").plus(1)).negate(),
            )
            .into();

        assert_eq!(stmt.build(), "UPDATE t SET a = -(6 - (a + 1))");
    }

    #[test]
    fn test_delete_and_empty_in_list() {
        let stmt: Statement = Delete::from("tree")
            .filter(col("id").in_list(Vec::new()))
            .into();
        assert_eq!(stmt.build(), "DELETE FROM tree WHERE FALSE");
        assert!(!stmt.is_read_only());
        assert_eq!(stmt.table(), "tree");
    }

    #[test]
    fn test_condition_flattening() {
        let cond = col("a")
            .eq(1)
            .and(col("b").eq(2).and(col("c").eq(3)));
        match cond {
            Condition::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected conjunction, got {:?}", other),
        }
        assert_eq!(Condition::all(Vec::new()), Condition::And(Vec::new()));
    }

    #[test]
    fn test_cmp_op_matches() {
        assert!(CmpOp::GtEq.matches(Ordering::Equal));
        assert!(CmpOp::GtEq.matches(Ordering::Greater));
        assert!(!CmpOp::Gt.matches(Ordering::Equal));
        assert!(CmpOp::NotEq.matches(Ordering::Less));
    }
}
