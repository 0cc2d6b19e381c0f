//! SQL rendering of statements.

use std::fmt::Write;

use canopy_common::Value;

use super::{Condition, Expr, Projection, Statement};

/// Accumulates SQL text and, in placeholder mode, bound parameters.
struct SqlWriter {
    sql: String,
    params: Vec<Value>,
    inline: bool,
}

impl SqlWriter {
    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn bind(&mut self, value: &Value) {
        if self.inline {
            self.sql.push_str(&format_value(value));
        } else {
            self.params.push(value.clone());
            let _ = write!(self.sql, "${}", self.params.len());
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Column(name) => self.push(name),
            Expr::Literal(value) => self.bind(value),
            Expr::Add(lhs, rhs) => self.binary(lhs, " + ", rhs),
            Expr::Sub(lhs, rhs) => self.binary(lhs, " - ", rhs),
            Expr::Neg(inner) => {
                // "--" would open a comment, so only bare columns go unwrapped.
                self.push("-");
                if let Expr::Column(name) = inner.as_ref() {
                    self.push(name);
                } else {
                    self.push("(");
                    self.expr(inner);
                    self.push(")");
                }
            }
        }
    }

    fn binary(&mut self, lhs: &Expr, op: &str, rhs: &Expr) {
        self.operand(lhs);
        self.push(op);
        self.operand(rhs);
    }

    fn operand(&mut self, expr: &Expr) {
        if expr.is_atom() {
            self.expr(expr);
        } else {
            self.push("(");
            self.expr(expr);
            self.push(")");
        }
    }

    fn condition(&mut self, condition: &Condition) {
        match condition {
            Condition::Compare { column, op, value } => {
                self.push(column);
                self.push(" ");
                self.push(op.as_sql());
                self.push(" ");
                self.expr(value);
            }
            Condition::InList { column, values } => {
                if values.is_empty() {
                    self.push("FALSE");
                    return;
                }
                self.push(column);
                self.push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.bind(value);
                }
                self.push(")");
            }
            Condition::And(parts) => {
                if parts.is_empty() {
                    self.push("TRUE");
                    return;
                }
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.push(" AND ");
                    }
                    self.condition(part);
                }
            }
        }
    }

    fn filter(&mut self, filter: Option<&Condition>) {
        if let Some(condition) = filter {
            self.push(" WHERE ");
            self.condition(condition);
        }
    }
}

/// Renders a statement; `inline` formats literals in place of placeholders.
pub(super) fn render(statement: &Statement, inline: bool) -> (String, Vec<Value>) {
    let mut w = SqlWriter {
        sql: String::new(),
        params: Vec::new(),
        inline,
    };

    match statement {
        Statement::Select(select) => {
            w.push("SELECT ");
            match &select.projection {
                Projection::All => w.push("*"),
                Projection::Columns(columns) => w.push(&columns.join(", ")),
                Projection::Count => w.push("COUNT(*)"),
            }
            w.push(" FROM ");
            w.push(&select.table);
            w.filter(select.filter.as_ref());
            if !select.order_by.is_empty() {
                w.push(" ORDER BY ");
                for (i, (column, order)) in select.order_by.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.push(column);
                    w.push(" ");
                    w.push(order.as_sql());
                }
            }
            if let Some(limit) = select.limit {
                w.push(" LIMIT ");
                w.push(&limit.to_string());
            }
        }
        Statement::Insert(insert) => {
            w.push("INSERT INTO ");
            w.push(&insert.table);
            w.push(" (");
            w.push(&insert.columns.join(", "));
            w.push(") VALUES ");
            for (i, row) in insert.rows.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.push("(");
                for (j, value) in row.iter().enumerate() {
                    if j > 0 {
                        w.push(", ");
                    }
                    w.bind(value);
                }
                w.push(")");
            }
        }
        Statement::Update(update) => {
            w.push("UPDATE ");
            w.push(&update.table);
            w.push(" SET ");
            for (i, (column, value)) in update.assignments.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.push(column);
                w.push(" = ");
                w.expr(value);
            }
            w.filter(update.filter.as_ref());
        }
        Statement::Delete(delete) => {
            w.push("DELETE FROM ");
            w.push(&delete.table);
            w.filter(delete.filter.as_ref());
        }
    }

    (w.sql, w.params)
}

/// Formats a value as an inline SQL literal.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bytes(b) => format!("'\\x{}'", hex_encode(b)),
    }
}

/// Hex encodes bytes.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_formatting() {
        assert_eq!(format_value(&Value::Null), "NULL");
        assert_eq!(format_value(&Value::Boolean(true)), "TRUE");
        assert_eq!(format_value(&Value::Integer(-42)), "-42");
        assert_eq!(format_value(&Value::Float(2.5)), "2.5");
        assert_eq!(format_value(&Value::from("it's")), "'it''s'");
        assert_eq!(format_value(&Value::Bytes(vec![0xde, 0xad])), "'\\xdead'");
    }
}
