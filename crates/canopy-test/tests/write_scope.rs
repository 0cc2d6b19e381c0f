//! Single-writer gate and batch atomicity.

use std::sync::Arc;

use canopy_common::{CanopyResult, ErrorCode};
use canopy_test::{node, TestTree};
use canopy_tree::NodePosition;

#[tokio::test]
async fn test_second_writer_is_refused() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    let before = t.snapshot().await?;

    let mut first = t.tree.begin_write()?;

    let err = t.tree.begin_write().err().expect("second scope must fail");
    assert_eq!(err.code(), ErrorCode::InvalidUpdate);

    let result: CanopyResult<()> = t
        .tree
        .write(|scope| {
            Box::pin(async move {
                scope.delete_node(2, false).await?;
                Ok(())
            })
        })
        .await;
    assert_eq!(result.unwrap_err().code(), ErrorCode::InvalidUpdate);
    assert_eq!(t.snapshot().await?, before);

    // The open scope is unaffected by the refused ones.
    first.delete_node(2, false).await?;
    drop(first);

    assert_eq!(t.tree.get_node_count().await?, 3);
    assert!(t.tree.begin_write().is_ok());
    Ok(())
}

#[tokio::test]
async fn test_write_closure_runs_in_one_scope() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;

    let moved = t
        .tree
        .write(|scope| {
            Box::pin(async move {
                assert!(scope.tree().is_writing());
                scope.move_node(4, 2, NodePosition::PreviousSibling).await?;
                scope.move_down_node(2).await?;
                scope.tree().get_all_nodes().await
            })
        })
        .await?;

    let order: Vec<String> = moved.iter().map(|n| n.name.to_string()).collect();
    assert_eq!(order, vec!["root", "C", "B", "A"]);
    assert!(!t.tree.is_writing());
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_tasks_get_one_scope() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    let tree = Arc::new(t.tree);

    let scope = tree.begin_write()?;
    let contender = {
        let tree = Arc::clone(&tree);
        tokio::spawn(async move { tree.begin_write().map(|_| ()) })
    };
    let refused = contender.await?;
    assert_eq!(refused.unwrap_err().code(), ErrorCode::InvalidUpdate);
    drop(scope);

    let retry = {
        let tree = Arc::clone(&tree);
        tokio::spawn(async move { tree.begin_write().map(|_| ()) })
    };
    retry.await??;
    Ok(())
}

#[tokio::test]
async fn test_failed_batch_changes_nothing() -> anyhow::Result<()> {
    let t = TestTree::abc().await?;
    let before = t.snapshot().await?;
    let mut scope = t.tree.begin_write()?;

    t.driver.fail_next_exec();
    let err = scope
        .move_node(2, 4, NodePosition::NextSibling)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DriverFailed);

    t.driver.fail_next_exec();
    let err = scope
        .add_node(node(10, "X"), Some(3.into()), NodePosition::FirstChild)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DriverFailed);

    t.driver.fail_next_exec();
    assert!(scope.delete_node(3, true).await.is_err());
    drop(scope);

    assert_eq!(t.snapshot().await?, before);
    assert!(t.tree.get_marked_nodes().await?.is_empty());
    assert_eq!(t.driver.stats().failed_batches, 3);
    t.tree.verify().await?;
    Ok(())
}

#[tokio::test]
async fn test_closed_driver_reports_not_connected() -> anyhow::Result<()> {
    use canopy_client::StorageDriver;

    let t = TestTree::abc().await?;
    t.driver.close().await?;
    assert!(!t.tree.is_ready());

    let err = t.tree.get_all_nodes().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotConnected);
    assert!(err.is_retryable());
    Ok(())
}
