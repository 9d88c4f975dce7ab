//! Persistence gateway for tasks.
//!
//! A [`TaskRepository`] is a unit of work: `insert`, `update` and `delete`
//! stage changes, and `persist` commits everything staged so far. The
//! sea-orm implementation backs each unit of work with a single database
//! transaction, which is rolled back if the repository is dropped before
//! `persist` succeeds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::entities::task;
use crate::task::{NewTask, Task};

/// Error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No task has the requested ID.
    #[error("Task with ID {0} not found")]
    NotFound(i32),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Data access interface for tasks.
///
/// Timestamps crossing this boundary are UTC.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Returns every stored task.
    async fn list_all(&self) -> Result<Vec<Task>, RepositoryError>;

    /// Returns the task with the given ID, if any.
    async fn find_by_id(&self, id: i32) -> Result<Option<Task>, RepositoryError>;

    /// Returns the tasks whose expiry lies strictly between `after` and `before`.
    async fn find_by_expiry_range(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError>;

    /// Stages a new task and returns the ID the store assigned to it.
    async fn insert(&self, task: NewTask) -> Result<i32, RepositoryError>;

    /// Stages a full replacement of the task with the same ID.
    ///
    /// Returns `false` if no task has that ID, in which case nothing changes.
    async fn update(&self, task: Task) -> Result<bool, RepositoryError>;

    /// Stages removal of the task with the given ID.
    ///
    /// Fails with [`RepositoryError::NotFound`] if no task has that ID.
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;

    /// Commits every staged change.
    async fn persist(&self) -> Result<(), RepositoryError>;
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id,
            model.title,
            model.description,
            model.expiry,
            model.percent_complete,
        )
    }
}

/// [`TaskRepository`] backed by a sea-orm connection.
pub struct SeaOrmTaskRepository {
    db: Arc<DatabaseConnection>,
    pending: Mutex<Option<DatabaseTransaction>>,
}

impl SeaOrmTaskRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            pending: Mutex::new(None),
        }
    }

    /// Returns the open transaction, beginning one if nothing is staged yet.
    async fn open<'a>(
        &self,
        pending: &'a mut Option<DatabaseTransaction>,
    ) -> Result<&'a DatabaseTransaction, sea_orm::DbErr> {
        if pending.is_none() {
            *pending = Some(self.db.begin().await?);
        }
        pending
            .as_ref()
            .ok_or_else(|| sea_orm::DbErr::Custom("transaction was not started".to_string()))
    }
}

/// Rolls the unit of work back when a staged mutation failed.
async fn settle<T>(
    pending: &mut Option<DatabaseTransaction>,
    outcome: Result<T, RepositoryError>,
) -> Result<T, RepositoryError> {
    if outcome.is_err() {
        if let Some(txn) = pending.take() {
            if let Err(err) = txn.rollback().await {
                tracing::warn!("Failed to roll back staged task changes: {}", err);
            }
        }
    }
    outcome
}

async fn select_all<C: ConnectionTrait>(conn: &C) -> Result<Vec<task::Model>, sea_orm::DbErr> {
    task::Entity::find()
        .order_by_asc(task::Column::Id)
        .all(conn)
        .await
}

async fn select_by_id<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<Option<task::Model>, sea_orm::DbErr> {
    task::Entity::find_by_id(id).one(conn).await
}

async fn select_by_expiry<C: ConnectionTrait>(
    conn: &C,
    after: DateTime<Utc>,
    before: DateTime<Utc>,
) -> Result<Vec<task::Model>, sea_orm::DbErr> {
    task::Entity::find()
        .filter(task::Column::Expiry.gt(after))
        .filter(task::Column::Expiry.lt(before))
        .order_by_asc(task::Column::Expiry)
        .all(conn)
        .await
}

#[async_trait]
impl TaskRepository for SeaOrmTaskRepository {
    #[tracing::instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Task>, RepositoryError> {
        let pending = self.pending.lock().await;
        let models = match pending.as_ref() {
            Some(txn) => select_all(txn).await?,
            None => select_all(self.db.as_ref()).await?,
        };
        Ok(models.into_iter().map(Task::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> Result<Option<Task>, RepositoryError> {
        let pending = self.pending.lock().await;
        let model = match pending.as_ref() {
            Some(txn) => select_by_id(txn, id).await?,
            None => select_by_id(self.db.as_ref(), id).await?,
        };
        Ok(model.map(Task::from))
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_expiry_range(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let pending = self.pending.lock().await;
        let models = match pending.as_ref() {
            Some(txn) => select_by_expiry(txn, after, before).await?,
            None => select_by_expiry(self.db.as_ref(), after, before).await?,
        };
        Ok(models.into_iter().map(Task::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn insert(&self, task: NewTask) -> Result<i32, RepositoryError> {
        let active_model = task::ActiveModel {
            title: ActiveValue::Set(task.title().to_string()),
            description: ActiveValue::Set(task.description().map(str::to_string)),
            expiry: ActiveValue::Set(task.expiry()),
            percent_complete: ActiveValue::Set(task.percent_complete()),
            ..Default::default()
        };

        let mut pending = self.pending.lock().await;
        let txn = self.open(&mut pending).await?;
        let outcome = match active_model.insert(txn).await {
            Ok(created) => Ok(created.id),
            Err(err) => Err(RepositoryError::from(err)),
        };
        settle(&mut pending, outcome).await
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, task: Task) -> Result<bool, RepositoryError> {
        let id = task.id();
        let active_model = task::ActiveModel {
            title: ActiveValue::Set(task.title().to_string()),
            description: ActiveValue::Set(task.description().map(str::to_string)),
            expiry: ActiveValue::Set(task.expiry()),
            percent_complete: ActiveValue::Set(task.percent_complete()),
            ..Default::default()
        };

        let mut pending = self.pending.lock().await;
        let txn = self.open(&mut pending).await?;
        let outcome = match task::Entity::update_many()
            .set(active_model)
            .filter(task::Column::Id.eq(id))
            .exec(txn)
            .await
        {
            Ok(result) => {
                if result.rows_affected == 0 {
                    tracing::debug!("Update of task {} matched no rows", id);
                }
                Ok(result.rows_affected > 0)
            }
            Err(err) => Err(RepositoryError::from(err)),
        };
        settle(&mut pending, outcome).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let mut pending = self.pending.lock().await;
        let txn = self.open(&mut pending).await?;
        let outcome = match task::Entity::delete_by_id(id).exec(txn).await {
            Ok(result) if result.rows_affected == 0 => Err(RepositoryError::NotFound(id)),
            Ok(_) => Ok(()),
            Err(err) => Err(RepositoryError::from(err)),
        };
        settle(&mut pending, outcome).await
    }

    #[tracing::instrument(skip(self))]
    async fn persist(&self) -> Result<(), RepositoryError> {
        let mut pending = self.pending.lock().await;
        if let Some(txn) = pending.take() {
            txn.commit().await?;
        }
        Ok(())
    }
}
