//! Verifier soundness against corrupted rows, and invariants under a long
//! sequence of mixed mutations.

use canopy_client::query::{col, Update};
use canopy_client::{Insert, Statement, StorageDriver};
use canopy_common::{CanopyError, ErrorCode, Value};
use canopy_test::{node, TestTree};
use canopy_tree::NodePosition;

async fn corrupt(t: &TestTree, statement: Statement) -> anyhow::Result<()> {
    t.driver.exec(&[statement]).await?;
    Ok(())
}

fn set(id: i64, column: &str, value: i64) -> Statement {
    Update::table("tree")
        .set(column, value)
        .filter(col("id").eq(id))
        .into()
}

#[tokio::test]
async fn test_single_corrupted_row_is_detected() -> anyhow::Result<()> {
    let stray_root: Statement = Insert::into_table("tree")
        .columns(
            ["id", "name", "level", "leftValue", "rightValue"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        )
        .values(vec![
            Value::Integer(9),
            Value::from("stray"),
            Value::Integer(0),
            Value::Integer(9),
            Value::Integer(10),
        ])
        .into();

    let cases = [
        (set(3, "rightValue", 2), "3"),
        (set(4, "level", 2), "4"),
        (set(4, "leftValue", 5), "4"),
        (set(1, "rightValue", 9), "1"),
        (set(2, "rightValue", 4), "2"),
        (stray_root, "9"),
    ];

    for (statement, expected) in cases {
        let t = TestTree::abc().await?;
        t.tree.verify().await?;

        let description = statement.to_string();
        corrupt(&t, statement).await?;

        match t.tree.verify().await {
            Err(CanopyError::Verify { node, .. }) => {
                assert_eq!(node, expected, "after {}", description)
            }
            other => panic!("expected failure after {}, got {:?}", description, other),
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_verify_error_code() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    corrupt(&t, set(2, "leftValue", 3)).await?;

    let err = t.tree.verify().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::VerifyFailed);
    assert!(err.to_string().starts_with("tree verification failed at node"));
    Ok(())
}

/// Deterministic xorshift generator.
struct Rng(u64);

impl Rng {
    fn next(&mut self, bound: usize) -> usize {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % bound as u64) as usize
    }
}

const POSITIONS: [NodePosition; 4] = [
    NodePosition::LastChild,
    NodePosition::FirstChild,
    NodePosition::NextSibling,
    NodePosition::PreviousSibling,
];

#[tokio::test]
async fn test_invariants_hold_across_mixed_mutations() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    let mut rng = Rng(0x2545_f491_4f6c_dd1d);
    let mut next_id = 100;

    for step in 0..300 {
        let nodes = t.tree.get_all_nodes().await?;
        let pick = |i: usize| nodes[i % nodes.len()].clone();
        let subject = pick(rng.next(nodes.len()));
        let other = pick(rng.next(nodes.len()));
        let mut position = POSITIONS[rng.next(POSITIONS.len())];

        let mut scope = t.tree.begin_write()?;
        match rng.next(6) {
            0 | 1 => {
                if subject.is_root() && position.is_sibling() {
                    position = NodePosition::LastChild;
                }
                let count = 1 + rng.next(3);
                let batch = (0..count)
                    .map(|k| node(next_id + k as i64, &format!("n{}", next_id + k as i64)))
                    .collect();
                next_id += count as i64;
                scope
                    .add_nodes(batch, Some((&subject).into()), position)
                    .await?;
            }
            2 | 3 => {
                if t.tree.can_move_to(&subject, &other, position).await? {
                    scope.move_node(&subject, &other, position).await?;
                }
            }
            4 => {
                if !subject.is_root() && nodes.len() > 4 {
                    scope.delete_node(&subject, rng.next(2) == 0).await?;
                }
            }
            _ => {
                let result = if rng.next(2) == 0 {
                    scope.move_up_node(&subject).await
                } else {
                    scope.move_down_node(&subject).await
                };
                if let Err(e) = result {
                    assert_eq!(e.code(), ErrorCode::InvalidOperation, "step {}", step);
                }
            }
        }
        drop(scope);

        t.tree.verify().await?;
        let count = t.tree.get_node_count().await?;
        let root = t.tree.get_root().await?.expect("root survives");
        assert_eq!(root.right, 2 * count, "step {}", step);
        assert_eq!(root.descendant_count(), count - 1, "step {}", step);
    }
    Ok(())
}
