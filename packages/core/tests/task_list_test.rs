//! Task List Integration Tests
//!
//! End-to-end behavior of `TaskListService` against a real libsql file:
//! append order, gap repair on delete, every move case, text semantics,
//! id assignment and detection of corrupted chains.
//!
//! Chains below are written head → tail; display order is the reverse.

#[cfg(test)]
mod task_list_tests {
    use anyhow::Result;
    use std::sync::Arc;
    use tasklist_core::chain::{Adjacency, ChainError};
    use tasklist_core::db::DatabaseService;
    use tasklist_core::models::{Links, MoveDirection, TaskId, TaskRecord};
    use tasklist_core::services::{
        DeleteOutcome, EditOutcome, MoveOutcome, TaskListError, TaskListService,
    };
    use tempfile::TempDir;

    /// Helper to create a service over a fresh database
    async fn create_test_service() -> Result<(TaskListService, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(db_path).await?);
        Ok((TaskListService::new(db), temp_dir))
    }

    /// Append `n` tasks, returning their ids in append order
    async fn append_n(service: &TaskListService, n: usize) -> Result<Vec<TaskId>> {
        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            ids.push(service.append().await?);
        }
        Ok(ids)
    }

    async fn display_ids(service: &TaskListService) -> Result<Vec<i64>> {
        Ok(service
            .fetch_ordered()
            .await?
            .iter()
            .map(|r| r.id.get())
            .collect())
    }

    /// All records sorted by id, for exact structural comparison
    async fn snapshot(service: &TaskListService) -> Result<Vec<TaskRecord>> {
        Ok(service.database().db_list_tasks().await?)
    }

    async fn links_of(service: &TaskListService, id: i64) -> Result<Links> {
        let record = service
            .get_task(TaskId::new(id))
            .await?
            .ok_or_else(|| anyhow::anyhow!("task {} missing", id))?;
        Ok(record.links)
    }

    fn links(previous: i64, next: i64) -> Links {
        Links::new(TaskId::new(previous), TaskId::new(next))
    }

    async fn raw_sql(service: &TaskListService, sql: &str) -> Result<()> {
        let conn = service.database().connect_with_timeout().await?;
        conn.execute(sql, ()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_three_appends_build_chain() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;

        let ids = append_n(&service, 3).await?;
        assert_eq!(ids, vec![TaskId::new(1), TaskId::new(2), TaskId::new(3)]);

        assert_eq!(links_of(&service, 3).await?, links(2, 0));
        assert_eq!(links_of(&service, 2).await?, links(1, 3));
        assert_eq!(links_of(&service, 1).await?, links(0, 2));
        assert_eq!(display_ids(&service).await?, vec![3, 2, 1]);

        Ok(())
    }

    #[tokio::test]
    async fn test_display_is_reverse_append_order() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        assert!(service.fetch_ordered().await?.is_empty());

        let ids = append_n(&service, 12).await?;
        let expected: Vec<i64> = ids.iter().rev().map(|id| id.get()).collect();

        assert_eq!(display_ids(&service).await?, expected);
        assert_eq!(service.count().await?, 12);

        let summary = service.verify_integrity().await?;
        assert_eq!(summary.head, Some(ids[0]));
        assert_eq!(summary.tail, Some(ids[11]));

        Ok(())
    }

    #[tokio::test]
    async fn test_move_oldest_above_newest() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 3).await?;

        let outcome = service
            .move_task(TaskId::new(1), TaskId::new(3), MoveDirection::Up)
            .await?;

        assert_eq!(
            outcome,
            MoveOutcome::Applied {
                adjacency: Adjacency::Apart
            }
        );
        assert_eq!(display_ids(&service).await?, vec![1, 3, 2]);
        assert_eq!(links_of(&service, 2).await?, links(0, 3));
        assert_eq!(links_of(&service, 3).await?, links(2, 1));
        assert_eq!(links_of(&service, 1).await?, links(3, 0));
        service.verify_integrity().await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_middle_joins_neighbors() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 3).await?;

        assert_eq!(service.delete(TaskId::new(2)).await?, DeleteOutcome::Applied);

        assert_eq!(links_of(&service, 1).await?, links(0, 3));
        assert_eq!(links_of(&service, 3).await?, links(1, 0));
        assert_eq!(display_ids(&service).await?, vec![3, 1]);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_head_and_tail() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 4).await?;

        // head
        service.delete(TaskId::new(1)).await?;
        assert_eq!(links_of(&service, 2).await?, links(0, 3));
        assert_eq!(display_ids(&service).await?, vec![4, 3, 2]);

        // tail
        service.delete(TaskId::new(4)).await?;
        assert_eq!(links_of(&service, 3).await?, links(2, 0));
        assert_eq!(display_ids(&service).await?, vec![3, 2]);
        service.verify_integrity().await?;

        // down to empty
        service.delete(TaskId::new(2)).await?;
        service.delete(TaskId::new(3)).await?;
        assert!(service.fetch_ordered().await?.is_empty());
        assert_eq!(service.verify_integrity().await?.len, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 2).await?;
        let before = snapshot(&service).await?;

        assert_eq!(service.delete(TaskId::new(42)).await?, DeleteOutcome::NotFound);
        assert_eq!(snapshot(&service).await?, before);

        Ok(())
    }

    #[tokio::test]
    async fn test_append_then_delete_restores_structure() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 4).await?;
        service
            .move_task(TaskId::new(4), TaskId::new(1), MoveDirection::Down)
            .await?;
        let before = snapshot(&service).await?;

        let id = service.append().await?;
        service.delete(id).await?;

        assert_eq!(snapshot(&service).await?, before);

        Ok(())
    }

    #[tokio::test]
    async fn test_up_when_selected_is_just_before_target() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 5).await?;

        // chain 1,2,3,4,5: 2.next == 3, swap to 1,3,2,4,5
        let outcome = service
            .move_task(TaskId::new(2), TaskId::new(3), MoveDirection::Up)
            .await?;

        assert_eq!(
            outcome,
            MoveOutcome::Applied {
                adjacency: Adjacency::SelectedBeforeTarget
            }
        );
        assert_eq!(display_ids(&service).await?, vec![5, 4, 2, 3, 1]);
        assert_eq!(links_of(&service, 3).await?, links(1, 2));
        assert_eq!(links_of(&service, 2).await?, links(3, 4));
        service.verify_integrity().await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_up_when_selected_is_already_after_target() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 5).await?;
        let before = snapshot(&service).await?;

        let outcome = service
            .move_task(TaskId::new(3), TaskId::new(2), MoveDirection::Up)
            .await?;

        assert_eq!(outcome, MoveOutcome::AlreadyInPlace);
        assert_eq!(snapshot(&service).await?, before);

        Ok(())
    }

    #[tokio::test]
    async fn test_down_when_selected_is_just_after_target() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 5).await?;

        // chain 1,2,3,4,5: 3.previous == 2, swap to 1,3,2,4,5
        let outcome = service
            .move_task(TaskId::new(3), TaskId::new(2), MoveDirection::Down)
            .await?;

        assert_eq!(
            outcome,
            MoveOutcome::Applied {
                adjacency: Adjacency::SelectedAfterTarget
            }
        );
        assert_eq!(display_ids(&service).await?, vec![5, 4, 2, 3, 1]);
        assert_eq!(links_of(&service, 1).await?, links(0, 3));
        assert_eq!(links_of(&service, 4).await?, links(2, 5));
        service.verify_integrity().await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_down_when_selected_is_already_before_target() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 5).await?;
        let before = snapshot(&service).await?;

        let outcome = service
            .move_task(TaskId::new(2), TaskId::new(3), MoveDirection::Down)
            .await?;

        assert_eq!(outcome, MoveOutcome::AlreadyInPlace);
        assert_eq!(snapshot(&service).await?, before);

        Ok(())
    }

    #[tokio::test]
    async fn test_down_across_the_chain() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 5).await?;

        // tail 5 goes just before 2: chain 1,5,2,3,4
        service
            .move_task(TaskId::new(5), TaskId::new(2), MoveDirection::Down)
            .await?;

        assert_eq!(display_ids(&service).await?, vec![4, 3, 2, 5, 1]);
        assert_eq!(links_of(&service, 4).await?, links(3, 0));
        service.verify_integrity().await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_head_to_tail_and_back() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 5).await?;
        let original = snapshot(&service).await?;

        service
            .move_task(TaskId::new(1), TaskId::new(5), MoveDirection::Up)
            .await?;
        assert_eq!(display_ids(&service).await?, vec![1, 5, 4, 3, 2]);
        service.verify_integrity().await?;

        // back below its original successor
        service
            .move_task(TaskId::new(1), TaskId::new(2), MoveDirection::Down)
            .await?;
        assert_eq!(snapshot(&service).await?, original);

        Ok(())
    }

    #[tokio::test]
    async fn test_move_then_inverse_restores_chain() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 6).await?;
        let original = snapshot(&service).await?;

        // 3 sits after 2 originally
        service
            .move_task(TaskId::new(3), TaskId::new(5), MoveDirection::Up)
            .await?;
        service.verify_integrity().await?;
        assert_ne!(snapshot(&service).await?, original);

        service
            .move_task(TaskId::new(3), TaskId::new(2), MoveDirection::Up)
            .await?;
        assert_eq!(snapshot(&service).await?, original);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_keeps_null_and_empty_distinct() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let ids = append_n(&service, 2).await?;
        let before = snapshot(&service).await?;

        service.edit(ids[0], Some(String::new())).await?;
        service.edit(ids[1], Some("Write report".to_string())).await?;
        assert_eq!(
            service.get_task(ids[0]).await?.and_then(|r| r.text),
            Some(String::new())
        );

        assert_eq!(service.edit(ids[1], None).await?, EditOutcome::Applied);
        assert_eq!(service.get_task(ids[1]).await?.and_then(|r| r.text), None);

        // pointers untouched by edits
        let after = snapshot(&service).await?;
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.links, b.links);
        }

        assert_eq!(
            service.edit(TaskId::new(99), Some("x".to_string())).await?,
            EditOutcome::NotFound
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_deleting_tail() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let ids = append_n(&service, 3).await?;

        service.delete(ids[2]).await?;
        let next = service.append().await?;

        assert_eq!(next, TaskId::new(4));
        assert_eq!(links_of(&service, 4).await?, links(2, 0));
        assert_eq!(display_ids(&service).await?, vec![4, 2, 1]);

        Ok(())
    }

    #[tokio::test]
    async fn test_two_tails_is_integrity_error() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 3).await?;

        raw_sql(&service, "UPDATE tasks SET next = 0 WHERE id = 1").await?;

        let result = service.fetch_ordered().await;
        assert!(matches!(
            result,
            Err(TaskListError::Integrity(ChainError::MultipleTails { .. }))
        ));
        assert!(service.verify_integrity().await.is_err());

        // appending onto an ambiguous tail is refused and rolled back
        let result = service.append().await;
        assert!(matches!(result, Err(TaskListError::Integrity(_))));
        assert_eq!(service.count().await?, 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_cycle_is_integrity_error() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        append_n(&service, 3).await?;

        raw_sql(&service, "UPDATE tasks SET previous = 3 WHERE id = 1").await?;

        let result = service.fetch_ordered().await;
        assert!(matches!(
            result,
            Err(TaskListError::Integrity(ChainError::CycleDetected { .. }))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_reopen_preserves_chain() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");

        {
            let db = Arc::new(DatabaseService::new(db_path.clone()).await?);
            let service = TaskListService::new(db);
            append_n(&service, 3).await?;
            service
                .move_task(TaskId::new(1), TaskId::new(3), MoveDirection::Up)
                .await?;
        }

        let db = Arc::new(DatabaseService::new(db_path).await?);
        let service = TaskListService::new(db);
        assert_eq!(display_ids(&service).await?, vec![1, 3, 2]);

        Ok(())
    }
}
