//! Statement batch builder.
//!
//! Turns a mutation (root creation, add, delete, move) into the ordered
//! statements that carry it out, addressing columns only through the
//! configured `FieldNames` and scoping every statement to the tree
//! partition in multi-tree mode.
//!
//! Range shifts always come before the statements that write literal
//! bounds into the opened room.

use std::collections::BTreeSet;

use canopy_client::query::{col, Condition, Delete, Expr, Insert, Select, Statement, Update};
use canopy_common::config::is_identifier;
use canopy_common::constants::{ROOT_LEFT, ROOT_LEVEL};
use canopy_common::{CanopyError, CanopyResult, FieldNames, TreeConfig, Value};

use crate::bounds::{self, Bounds, Gap, Shift, Threshold};
use crate::node::NewNode;

/// Builds the statements for one tree.
#[derive(Debug, Clone)]
pub struct StatementPlanner {
    table: String,
    fields: FieldNames,
    tree_id: Option<Value>,
}

impl StatementPlanner {
    /// Creates a planner for the configured table and partition.
    pub fn new(config: &TreeConfig) -> Self {
        Self {
            table: config.table.clone(),
            fields: config.fields.clone(),
            tree_id: config.tree_id.clone(),
        }
    }

    /// Returns the column mapping.
    pub fn fields(&self) -> &FieldNames {
        &self.fields
    }

    /// Prefixes `condition` with the partition predicate in multi-tree mode.
    pub fn scoped(&self, condition: Condition) -> Condition {
        match &self.tree_id {
            Some(tree_id) => col(&self.fields.tree_id)
                .eq(tree_id.clone())
                .and(condition),
            None => condition,
        }
    }

    /// `SELECT *` over live (positive-bound) nodes of the partition.
    pub fn select_live(&self) -> Select {
        Select::from(&self.table).filter(self.scoped(col(&self.fields.left).gt(0)))
    }

    /// `SELECT *` over soft-deleted nodes of the partition.
    pub fn select_marked(&self) -> Select {
        Select::from(&self.table).filter(self.scoped(col(&self.fields.left).lt(0)))
    }

    /// `SELECT *` over every row of the partition, live or not.
    pub fn select_any(&self) -> Select {
        let select = Select::from(&self.table);
        match &self.tree_id {
            Some(tree_id) => select.filter(col(&self.fields.tree_id).eq(tree_id.clone())),
            None => select,
        }
    }

    /// Rows of the subtree spanning `bounds`, the node itself included.
    fn subtree(&self, bounds: Bounds) -> Condition {
        self.scoped(
            col(&self.fields.left)
                .ge(bounds.left)
                .and(col(&self.fields.right).le(bounds.right)),
        )
    }

    fn threshold(&self, column: &str, edge: Threshold) -> Condition {
        if edge.inclusive {
            col(column).ge(edge.value)
        } else {
            col(column).gt(edge.value)
        }
    }

    /// The two range updates of a shift, left bounds first.
    fn shift(&self, shift: &Shift) -> [Statement; 2] {
        let column_shift = |column: &str, edge: Threshold| -> Statement {
            Update::table(&self.table)
                .set(column, Expr::column(column).plus(shift.by))
                .filter(self.scoped(self.threshold(column, edge)))
                .into()
        };
        [
            column_shift(&self.fields.left, shift.left),
            column_shift(&self.fields.right, shift.right),
        ]
    }

    /// A multi-row insert placing each node at the given bounds.
    fn insert(&self, placed: &[(&NewNode, Bounds)]) -> CanopyResult<Statement> {
        let mut payload = BTreeSet::new();
        for (node, _) in placed {
            for column in node.fields.keys() {
                if self.fields.is_reserved(column) {
                    return Err(CanopyError::invalid_argument(format!(
                        "payload column '{}' is a structural column",
                        column
                    )));
                }
                if !is_identifier(column) {
                    return Err(CanopyError::invalid_argument(format!(
                        "'{}' is not a valid column name",
                        column
                    )));
                }
                payload.insert(column.as_str());
            }
        }

        let mut columns = vec![self.fields.id.clone(), self.fields.name.clone()];
        if self.tree_id.is_some() {
            columns.push(self.fields.tree_id.clone());
        }
        columns.extend([
            self.fields.level.clone(),
            self.fields.left.clone(),
            self.fields.right.clone(),
        ]);
        columns.extend(payload.iter().map(|c| c.to_string()));

        let mut insert = Insert::into_table(&self.table).columns(columns);
        for (node, bounds) in placed {
            let mut values = vec![node.id.clone(), node.name.clone()];
            if let Some(tree_id) = &self.tree_id {
                values.push(tree_id.clone());
            }
            values.extend([
                Value::Integer(bounds.level),
                Value::Integer(bounds.left),
                Value::Integer(bounds.right),
            ]);
            values.extend(
                payload
                    .iter()
                    .map(|c| node.fields.get(*c).cloned().unwrap_or(Value::Null)),
            );
            insert = insert.values(values);
        }
        Ok(insert.into())
    }

    /// Inserts `node` as the root of an empty partition.
    pub fn plan_root(&self, node: &NewNode) -> CanopyResult<Statement> {
        let bounds = Bounds::new(ROOT_LEFT, ROOT_LEFT + 1, ROOT_LEVEL);
        self.insert(&[(node, bounds)])
    }

    /// Opens `gap` and inserts `nodes` into it as contiguous leaves.
    pub fn plan_add(&self, nodes: &[NewNode], gap: &Gap) -> CanopyResult<Vec<Statement>> {
        let placed: Vec<_> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node, gap.leaf(i)))
            .collect();

        let mut batch = Vec::with_capacity(3);
        batch.extend(self.shift(&gap.shift));
        batch.push(self.insert(&placed)?);
        Ok(batch)
    }

    /// Removes (or, with `only_mark`, negates) the subtree at `target` and
    /// compacts the bounds after it.
    pub fn plan_delete(&self, target: Bounds, only_mark: bool) -> Vec<Statement> {
        let removal: Statement = if only_mark {
            Update::table(&self.table)
                .set(&self.fields.left, Expr::column(&self.fields.left).negate())
                .set(&self.fields.right, Expr::column(&self.fields.right).negate())
                .filter(self.subtree(target))
                .into()
        } else {
            Delete::from(&self.table)
                .filter(self.subtree(target))
                .into()
        };

        let mut batch = Vec::with_capacity(3);
        batch.push(removal);
        batch.extend(self.shift(&bounds::close_gap(target)));
        batch
    }

    /// Detaches the subtree at `source`, opens `gap` and lands the subtree
    /// in it.
    ///
    /// `gap` must be computed against the bounds the target has once the
    /// source is detached. `subtree_ids` are the ids of the source and its
    /// descendants; re-normalization touches only those rows so that nodes
    /// soft-deleted earlier stay where they are.
    pub fn plan_move(&self, source: Bounds, subtree_ids: Vec<Value>, gap: &Gap) -> Vec<Statement> {
        let relocation = bounds::relocate(source, gap);

        let mut batch = self.plan_delete(source, true);
        batch.extend(self.shift(&gap.shift));

        let mut restore = Update::table(&self.table)
            .set(
                &self.fields.left,
                Expr::literal(relocation.delta).minus(Expr::column(&self.fields.left)),
            )
            .set(
                &self.fields.right,
                Expr::literal(relocation.delta).minus(Expr::column(&self.fields.right)),
            );
        if relocation.level_delta != 0 {
            restore = restore.set(
                &self.fields.level,
                Expr::column(&self.fields.level).plus(relocation.level_delta),
            );
        }
        batch.push(
            restore
                .filter(self.scoped(
                    col(&self.fields.left)
                        .lt(0)
                        .and(col(&self.fields.id).in_list(subtree_ids)),
                ))
                .into(),
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::open_gap;
    use crate::position::NodePosition;

    fn render(batch: &[Statement]) -> Vec<String> {
        batch.iter().map(Statement::build).collect()
    }

    #[test]
    fn test_plan_root() {
        let planner = StatementPlanner::new(&TreeConfig::default());
        let stmt = planner
            .plan_root(&NewNode::new(1).with_name("root"))
            .unwrap();
        assert_eq!(
            stmt.build(),
            "INSERT INTO tree (id, name, level, leftValue, rightValue) VALUES (1, 'root', 0, 1, 2)"
        );
    }

    #[test]
    fn test_plan_add_last_child() {
        let planner = StatementPlanner::new(&TreeConfig::default());
        let gap = open_gap(Bounds::new(1, 2, 0), NodePosition::LastChild, 4);
        let nodes = [
            NewNode::new(2).with_name("A"),
            NewNode::new(3).with_name("B").with_field("color", "red"),
        ];

        let batch = planner.plan_add(&nodes, &gap).unwrap();
        assert_eq!(
            render(&batch),
            vec![
                "UPDATE tree SET leftValue = leftValue + 4 WHERE leftValue >= 2",
                "UPDATE tree SET rightValue = rightValue + 4 WHERE rightValue >= 2",
                "INSERT INTO tree (id, name, level, leftValue, rightValue, color) \
                 VALUES (2, 'A', 1, 2, 3, NULL), (3, 'B', 1, 4, 5, 'red')",
            ]
        );
    }

    #[test]
    fn test_plan_add_rejects_structural_payload() {
        let planner = StatementPlanner::new(&TreeConfig::default());
        let gap = open_gap(Bounds::new(1, 2, 0), NodePosition::LastChild, 2);
        let nodes = [NewNode::new(2).with_field("leftValue", 9)];
        assert!(planner.plan_add(&nodes, &gap).is_err());

        let nodes = [NewNode::new(2).with_field("bad column", 9)];
        assert!(planner.plan_add(&nodes, &gap).is_err());
    }

    #[test]
    fn test_plan_delete_scoped_to_partition() {
        let planner = StatementPlanner::new(&TreeConfig::new("menu").with_tree_id(7));

        let batch = planner.plan_delete(Bounds::new(4, 5, 1), false);
        assert_eq!(
            render(&batch),
            vec![
                "DELETE FROM menu WHERE treeId = 7 AND leftValue >= 4 AND rightValue <= 5",
                "UPDATE menu SET leftValue = leftValue + -2 WHERE treeId = 7 AND leftValue > 5",
                "UPDATE menu SET rightValue = rightValue + -2 WHERE treeId = 7 AND rightValue > 5",
            ]
        );

        let (sql, params) = batch[0].build_with_params();
        assert_eq!(
            sql,
            "DELETE FROM menu WHERE treeId = $1 AND leftValue >= $2 AND rightValue <= $3"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_plan_soft_delete() {
        let planner = StatementPlanner::new(&TreeConfig::default());
        let batch = planner.plan_delete(Bounds::new(2, 7, 1), true);
        assert_eq!(
            batch[0].build(),
            "UPDATE tree SET leftValue = -leftValue, rightValue = -rightValue \
             WHERE leftValue >= 2 AND rightValue <= 7"
        );
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_plan_move_statement_order() {
        let planner = StatementPlanner::new(&TreeConfig::default());
        // A(2,3) to the first child of C, which sits at (4,5) once A is out.
        let source = Bounds::new(2, 3, 1);
        let gap = open_gap(Bounds::new(4, 5, 1), NodePosition::FirstChild, 2);

        let batch = planner.plan_move(source, vec![Value::Integer(2)], &gap);
        assert_eq!(batch.len(), 6);
        assert_eq!(
            batch[5].build(),
            "UPDATE tree SET leftValue = 3 - leftValue, rightValue = 3 - rightValue, \
             level = level + 1 WHERE leftValue < 0 AND id IN (2)"
        );
    }
}
