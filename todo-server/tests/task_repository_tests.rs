use common::{new_task, utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use todo_server::task::{RepositoryError, SeaOrmTaskRepository, Task, TaskRepository};

mod common;

async fn staged_changes_vanish_without_persist(db: Arc<DatabaseConnection>) {
    {
        let repository = SeaOrmTaskRepository::new(db.clone());
        let id = repository
            .insert(new_task("Never saved", utc(2026, 10, 14, 12, 0, 0)))
            .await
            .expect("Failed to stage task");
        let staged = repository
            .find_by_id(id)
            .await
            .expect("Failed to read staged task");
        assert!(staged.is_some(), "staged task is visible inside its unit of work");
    }

    let tasks = SeaOrmTaskRepository::new(db)
        .list_all()
        .await
        .expect("Failed to list tasks");
    assert!(tasks.is_empty());
}

async fn persisted_changes_are_visible_to_later_units(db: Arc<DatabaseConnection>) {
    let repository = SeaOrmTaskRepository::new(db.clone());
    let first = repository
        .insert(new_task("First", utc(2026, 10, 14, 12, 0, 0)))
        .await
        .expect("Failed to stage task");
    let second = repository
        .insert(new_task("Second", utc(2026, 10, 15, 12, 0, 0)))
        .await
        .expect("Failed to stage task");
    repository.persist().await.expect("Failed to persist");
    assert_ne!(first, second);

    let tasks = SeaOrmTaskRepository::new(db)
        .list_all()
        .await
        .expect("Failed to list tasks");
    let titles: Vec<&str> = tasks.iter().map(Task::title).collect();
    assert_eq!(titles, vec!["First", "Second"]);
}

async fn expiry_range_excludes_both_bounds(db: Arc<DatabaseConnection>) {
    let repository = SeaOrmTaskRepository::new(db.clone());
    for (title, expiry) in [
        ("At start", utc(2026, 10, 14, 0, 0, 0)),
        ("Inside", utc(2026, 10, 14, 0, 0, 1)),
        ("Also inside", utc(2026, 10, 14, 23, 59, 59)),
        ("At end", utc(2026, 10, 15, 0, 0, 0)),
    ] {
        repository
            .insert(new_task(title, expiry))
            .await
            .expect("Failed to stage task");
    }
    repository.persist().await.expect("Failed to persist");

    let tasks = SeaOrmTaskRepository::new(db)
        .find_by_expiry_range(utc(2026, 10, 14, 0, 0, 0), utc(2026, 10, 15, 0, 0, 0))
        .await
        .expect("Failed to query range");
    let titles: Vec<&str> = tasks.iter().map(Task::title).collect();
    assert_eq!(titles, vec!["Inside", "Also inside"]);
}

async fn update_reports_whether_a_row_matched(db: Arc<DatabaseConnection>) {
    let repository = SeaOrmTaskRepository::new(db.clone());
    let id = repository
        .insert(new_task("Existing", utc(2026, 10, 14, 12, 0, 0)))
        .await
        .expect("Failed to stage task");
    repository.persist().await.expect("Failed to persist");

    let repository = SeaOrmTaskRepository::new(db);
    let existing = Task::new(id, "Existing".to_string(), None, utc(2026, 10, 14, 12, 0, 0), 60);
    let missing = Task::new(id + 1, "Gone".to_string(), None, utc(2026, 10, 14, 12, 0, 0), 60);

    assert!(repository.update(existing).await.expect("Failed to update"));
    assert!(!repository.update(missing).await.expect("Failed to update"));
}

async fn deleting_missing_task_reports_not_found(db: Arc<DatabaseConnection>) {
    let repository = SeaOrmTaskRepository::new(db);

    let result = repository.delete(9).await;

    assert!(matches!(result, Err(RepositoryError::NotFound(9))));
    repository
        .persist()
        .await
        .expect("Persisting after a failed delete is a no-op");
}

#[tokio::test]
async fn sqlite_staged_changes_vanish_without_persist() {
    let db = common::setup_sqlite().await.unwrap();
    staged_changes_vanish_without_persist(db).await;
}

#[tokio::test]
async fn sqlite_persisted_changes_are_visible_to_later_units() {
    let db = common::setup_sqlite().await.unwrap();
    persisted_changes_are_visible_to_later_units(db).await;
}

#[tokio::test]
async fn sqlite_expiry_range_excludes_both_bounds() {
    let db = common::setup_sqlite().await.unwrap();
    expiry_range_excludes_both_bounds(db).await;
}

#[tokio::test]
async fn sqlite_update_reports_whether_a_row_matched() {
    let db = common::setup_sqlite().await.unwrap();
    update_reports_whether_a_row_matched(db).await;
}

#[tokio::test]
async fn sqlite_deleting_missing_task_reports_not_found() {
    let db = common::setup_sqlite().await.unwrap();
    deleting_missing_task_reports_not_found(db).await;
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn postgres_staged_changes_vanish_without_persist() {
    let container = common::setup_container().await.unwrap();
    let db = common::setup_postgres(&container).await.unwrap();
    staged_changes_vanish_without_persist(db).await;
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn postgres_persisted_changes_are_visible_to_later_units() {
    let container = common::setup_container().await.unwrap();
    let db = common::setup_postgres(&container).await.unwrap();
    persisted_changes_are_visible_to_later_units(db).await;
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn postgres_expiry_range_excludes_both_bounds() {
    let container = common::setup_container().await.unwrap();
    let db = common::setup_postgres(&container).await.unwrap();
    expiry_range_excludes_both_bounds(db).await;
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn postgres_deleting_missing_task_reports_not_found() {
    let container = common::setup_container().await.unwrap();
    let db = common::setup_postgres(&container).await.unwrap();
    deleting_missing_task_reports_not_found(db).await;
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn postgres_update_reports_whether_a_row_matched() {
    let container = common::setup_container().await.unwrap();
    let db = common::setup_postgres(&container).await.unwrap();
    update_reports_whether_a_row_matched(db).await;
}
