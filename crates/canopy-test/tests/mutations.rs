//! Insert, delete and move behavior against the in-memory driver.

use canopy_common::{ErrorCode, TreeConfig};
use canopy_test::{node, TestTree};
use canopy_tree::{NodePosition, NodeRef};

#[tokio::test]
async fn test_root_with_three_children() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;

    assert_eq!(t.bounds(1).await?, (1, 8, 0));
    assert_eq!(t.bounds(2).await?, (2, 3, 1));
    assert_eq!(t.bounds(3).await?, (4, 5, 1));
    assert_eq!(t.bounds(4).await?, (6, 7, 1));
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_delete_middle_child() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;

    t.tree.begin_write()?.delete_node(3, false).await?;

    assert_eq!(t.bounds(1).await?, (1, 6, 0));
    assert_eq!(t.bounds(2).await?, (2, 3, 1));
    assert_eq!(t.bounds(4).await?, (4, 5, 1));
    assert!(t.tree.get_node(3).await?.is_none());
    assert_eq!(t.driver.table_rows("tree")?.len(), 3);
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_move_first_child_after_last() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;

    t.tree
        .begin_write()?
        .move_node(2, 4, NodePosition::NextSibling)
        .await?;

    assert_eq!(t.preorder().await?, vec!["root", "B", "C", "A"]);
    assert_eq!(t.bounds(3).await?, (2, 3, 1));
    assert_eq!(t.bounds(4).await?, (4, 5, 1));
    assert_eq!(t.bounds(2).await?, (6, 7, 1));
    assert_eq!(t.bounds(1).await?, (1, 8, 0));
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_add_positions() -> anyhow::Result<()> {
    let cases = [
        (1, NodePosition::FirstChild, vec!["root", "X", "A", "B", "C"]),
        (1, NodePosition::LastChild, vec!["root", "A", "B", "C", "X"]),
        (3, NodePosition::PreviousSibling, vec!["root", "A", "X", "B", "C"]),
        (3, NodePosition::NextSibling, vec!["root", "A", "B", "X", "C"]),
    ];

    for (reference, position, expected) in cases {
        let t = TestTree::abc().await?;
        let added = t
            .tree
            .begin_write()?
            .add_node(node(10, "X"), Some(reference.into()), position)
            .await?;

        assert_eq!(added.level, 1, "{}", position);
        assert_eq!(t.preorder().await?, expected, "{}", position);
        assert_eq!(t.bounds(1).await?, (1, 10, 0));
        t.tree.verify().await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_add_many_under_leaf() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;

    t.tree
        .begin_write()?
        .add_nodes(
            vec![node(10, "B1"), node(11, "B2"), node(12, "B3")],
            Some(3.into()),
            NodePosition::FirstChild,
        )
        .await?;

    assert_eq!(t.bounds(3).await?, (4, 11, 1));
    assert_eq!(t.bounds(10).await?, (5, 6, 2));
    assert_eq!(t.bounds(12).await?, (9, 10, 2));
    assert_eq!(t.bounds(4).await?, (12, 13, 1));
    assert_eq!(t.tree.get_descendants_count(3).await?, 3);
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_add_then_delete_restores_bounds() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    let before = t.snapshot().await?;

    {
        let mut scope = t.tree.begin_write()?;
        scope
            .add_node(node(10, "X"), Some(3.into()), NodePosition::LastChild)
            .await?;
        scope
            .add_nodes(
                vec![node(11, "X1"), node(12, "X2")],
                Some(10.into()),
                NodePosition::LastChild,
            )
            .await?;
        assert_eq!(t.tree.get_node_count().await?, 7);

        scope.delete_node(10, false).await?;
    }

    assert_eq!(t.snapshot().await?, before);
    assert_eq!(t.tree.get_node_count().await?, 4);
    Ok(())
}

#[tokio::test]
async fn test_add_rejections() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    let before = t.snapshot().await?;
    let mut scope = t.tree.begin_write()?;

    let err = scope
        .add_node(node(10, "X"), Some(1.into()), NodePosition::NextSibling)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);

    let err = scope
        .add_node(node(10, "X"), None, NodePosition::PreviousSibling)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);

    let err = scope
        .add_node(node(10, "X"), Some(99.into()), NodePosition::LastChild)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = scope
        .add_node(node(2, "again"), None, NodePosition::LastChild)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);

    let err = scope
        .add_nodes(
            vec![node(10, "X"), node(10, "Y")],
            None,
            NodePosition::LastChild,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);

    let err = scope.create_root(node(20, "second root")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);

    let batches = t.driver.stats().batches_executed;
    scope
        .add_nodes(Vec::new(), None, NodePosition::LastChild)
        .await?;
    assert_eq!(t.driver.stats().batches_executed, batches);

    drop(scope);
    assert_eq!(t.snapshot().await?, before);
    Ok(())
}

#[tokio::test]
async fn test_add_without_root() -> anyhow::Result<()> {
    let t = TestTree::new(TreeConfig::default()).await?;

    assert!(!t.tree.has_root().await?);
    let err = t
        .tree
        .begin_write()?
        .add_node(node(2, "A"), None, NodePosition::LastChild)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    // An empty tree is well-formed.
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_move_is_undone_by_inverse_move() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    let before = t.snapshot().await?;

    {
        let mut scope = t.tree.begin_write()?;
        scope.move_node(2, 4, NodePosition::NextSibling).await?;
        // Back in front of its original next sibling.
        scope.move_node(2, 3, NodePosition::PreviousSibling).await?;
    }

    assert_eq!(t.snapshot().await?, before);
    Ok(())
}

#[tokio::test]
async fn test_move_subtree_into_child_position() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;

    {
        let mut scope = t.tree.begin_write()?;
        scope
            .add_node(node(5, "A1"), Some(2.into()), NodePosition::LastChild)
            .await?;
        scope.move_node(2, 4, NodePosition::LastChild).await?;
    }

    assert_eq!(t.bounds(1).await?, (1, 10, 0));
    assert_eq!(t.bounds(3).await?, (2, 3, 1));
    assert_eq!(t.bounds(4).await?, (4, 9, 1));
    assert_eq!(t.bounds(2).await?, (5, 8, 2));
    assert_eq!(t.bounds(5).await?, (6, 7, 3));

    let parent = t.tree.get_parent(5).await?.map(|n| n.name.to_string());
    assert_eq!(parent.as_deref(), Some("A"));
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_move_leaves_earlier_marked_rows_alone() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;

    {
        let mut scope = t.tree.begin_write()?;
        scope.delete_node(3, true).await?;
        scope.move_node(2, 4, NodePosition::NextSibling).await?;
    }

    assert_eq!(t.preorder().await?, vec!["root", "C", "A"]);
    assert_eq!(t.bounds(2).await?, (4, 5, 1));

    let marked = t.tree.get_marked_nodes().await?;
    assert_eq!(marked.len(), 1);
    assert_eq!((marked[0].left, marked[0].right), (-4, -5));
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_move_rejections() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    {
        let mut scope = t.tree.begin_write()?;
        scope
            .add_node(node(5, "A1"), Some(2.into()), NodePosition::LastChild)
            .await?;
    }
    let before = t.snapshot().await?;

    assert!(!t.tree.can_move_to(2, 2, NodePosition::LastChild).await?);
    assert!(!t.tree.can_move_to(2, 5, NodePosition::LastChild).await?);
    assert!(!t.tree.can_move_to(1, 3, NodePosition::LastChild).await?);
    assert!(!t.tree.can_move_to(3, 1, NodePosition::NextSibling).await?);
    assert!(t.tree.can_move_to(3, 1, NodePosition::FirstChild).await?);
    assert!(t.tree.can_move_to(5, 4, NodePosition::PreviousSibling).await?);

    let mut scope = t.tree.begin_write()?;
    for (source, target, position) in [
        (2, 2, NodePosition::LastChild),
        (2, 5, NodePosition::FirstChild),
        (1, 4, NodePosition::LastChild),
        (3, 1, NodePosition::PreviousSibling),
    ] {
        let err = scope.move_node(source, target, position).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOperation);
    }

    let err = scope
        .move_node(2, 99, NodePosition::LastChild)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    drop(scope);

    assert_eq!(t.snapshot().await?, before);
    Ok(())
}

#[tokio::test]
async fn test_move_up_and_down_among_siblings() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    let mut scope = t.tree.begin_write()?;

    scope.move_down_node(2).await?;
    assert_eq!(t.preorder().await?, vec!["root", "B", "A", "C"]);

    scope.move_up_node(4).await?;
    assert_eq!(t.preorder().await?, vec!["root", "B", "C", "A"]);

    scope.move_up_node(NodeRef::id(2)).await?;
    assert_eq!(t.preorder().await?, vec!["root", "B", "A", "C"]);

    // First and last at the top level cannot go further.
    let err = scope.move_up_node(3).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);
    let err = scope.move_down_node(4).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);
    let err = scope.move_up_node(1).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);

    drop(scope);
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_move_out_of_parent_at_edge() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    let mut scope = t.tree.begin_write()?;
    scope
        .add_node(node(5, "A1"), Some(2.into()), NodePosition::LastChild)
        .await?;

    // The only child has no next sibling: it becomes the next sibling of A.
    scope.move_down_node(5).await?;
    drop(scope);

    assert_eq!(t.preorder().await?, vec!["root", "A", "A1", "B", "C"]);
    assert_eq!(t.bounds(2).await?, (2, 3, 1));
    assert_eq!(t.bounds(5).await?, (4, 5, 1));
    assert_eq!(t.bounds(4).await?, (8, 9, 1));
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_move_up_without_previous_sibling_leaves_parent() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    let mut scope = t.tree.begin_write()?;
    scope
        .add_nodes(
            vec![node(5, "C1"), node(6, "C2")],
            Some(4.into()),
            NodePosition::LastChild,
        )
        .await?;

    scope.move_up_node(5).await?;
    drop(scope);

    assert_eq!(t.preorder().await?, vec!["root", "A", "B", "C", "C2", "C1"]);
    assert_eq!(t.bounds(5).await?, (10, 11, 1));
    assert_eq!(t.tree.get_children(4).await?.len(), 1);
    t.tree.verify().await?;
    Ok(())
}
