use chrono::{Days, FixedOffset, NaiveDate, Offset, Utc};
use mockable::Clock;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::task::schedule::{self, ExpiryWindow};
use crate::task::{
    MAX_PERCENT_COMPLETE, MIN_PERCENT_COMPLETE, NewTask, SeaOrmTaskRepository, Task,
    TaskRepository, TaskServiceError,
};

/// Shared state for the task handlers.
#[derive(Clone)]
pub struct TaskState {
    pub db: Arc<DatabaseConnection>,
    pub clock: Arc<dyn Clock>,
    /// Offset of the calendar used for the "due" queries.
    pub utc_offset: FixedOffset,
}

impl TaskState {
    /// Builds a service over a fresh unit of work for one request.
    pub fn service(&self) -> TaskService<SeaOrmTaskRepository> {
        TaskService::new(SeaOrmTaskRepository::new(self.db.clone()), self.clock.clone())
            .with_utc_offset(self.utc_offset)
    }
}

/// Business rules for tasks.
///
/// Every mutation stages a change through the repository and then persists
/// it, so each call is one unit of work.
pub struct TaskService<R> {
    repository: R,
    clock: Arc<dyn Clock>,
    utc_offset: FixedOffset,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service that buckets due dates by UTC calendar days.
    pub fn new(repository: R, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            utc_offset: Utc.fix(),
        }
    }

    /// Uses `utc_offset` as the local calendar for the "due" queries.
    pub fn with_utc_offset(self, utc_offset: FixedOffset) -> Self {
        Self { utc_offset, ..self }
    }

    /// Retrieves all tasks.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.repository.list_all().await?)
    }

    /// Retrieves a task by its ID, returning `None` if it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<Option<Task>, TaskServiceError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Retrieves the tasks expiring during the current local day.
    #[tracing::instrument(skip(self))]
    pub async fn get_due_today(&self) -> Result<Vec<Task>, TaskServiceError> {
        let window = schedule::day_window(self.today(), self.utc_offset);
        self.find_in(window).await
    }

    /// Retrieves the tasks expiring during the next local day.
    #[tracing::instrument(skip(self))]
    pub async fn get_due_tomorrow(&self) -> Result<Vec<Task>, TaskServiceError> {
        let window = schedule::day_window(self.today() + Days::new(1), self.utc_offset);
        self.find_in(window).await
    }

    /// Retrieves the tasks expiring between Monday and Sunday of the current week.
    #[tracing::instrument(skip(self))]
    pub async fn get_due_this_week(&self) -> Result<Vec<Task>, TaskServiceError> {
        let window = schedule::week_window(self.today(), self.utc_offset);
        self.find_in(window).await
    }

    /// Stores a new task and returns the ID assigned to it.
    ///
    /// # Errors
    ///
    /// Fails with [`TaskServiceError::EmptyTitle`] or
    /// [`TaskServiceError::PercentOutOfRange`] before touching the store.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, task: NewTask) -> Result<i32, TaskServiceError> {
        validate_title(task.title())?;
        validate_percent(task.percent_complete())?;

        let id = self.repository.insert(task).await?;
        self.repository.persist().await?;
        Ok(id)
    }

    /// Replaces every field of the task with the same ID.
    ///
    /// The task's existence is not checked; replacing a missing ID is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, task: Task) -> Result<(), TaskServiceError> {
        validate_title(task.title())?;
        validate_percent(task.percent_complete())?;

        self.repository.update(task).await?;
        self.repository.persist().await?;
        Ok(())
    }

    /// Sets the completion percentage of a task.
    ///
    /// # Errors
    ///
    /// * [`TaskServiceError::PercentOutOfRange`] if `percent` is outside 0..=100.
    /// * [`TaskServiceError::TaskNotFound`] if no task has the given ID.
    #[tracing::instrument(skip(self))]
    pub async fn set_percent_complete(
        &self,
        id: i32,
        percent: i32,
    ) -> Result<(), TaskServiceError> {
        validate_percent(percent)?;

        let task = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;

        // A concurrent delete between the read and the write matches no row.
        if !self
            .repository
            .update(task.with_percent_complete(percent))
            .await?
        {
            return Err(TaskServiceError::TaskNotFound(id));
        }
        self.repository.persist().await?;
        Ok(())
    }

    /// Marks a task as 100% complete.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, id: i32) -> Result<(), TaskServiceError> {
        let task = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;

        if !self
            .repository
            .update(task.with_percent_complete(MAX_PERCENT_COMPLETE))
            .await?
        {
            return Err(TaskServiceError::TaskNotFound(id));
        }
        self.repository.persist().await?;
        Ok(())
    }

    /// Deletes a task by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), TaskServiceError> {
        self.repository.delete(id).await?;
        self.repository.persist().await?;
        Ok(())
    }

    fn today(&self) -> NaiveDate {
        self.clock
            .utc()
            .with_timezone(&self.utc_offset)
            .date_naive()
    }

    async fn find_in(&self, window: ExpiryWindow) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self
            .repository
            .find_by_expiry_range(window.after(), window.before())
            .await?)
    }
}

fn validate_percent(percent: i32) -> Result<(), TaskServiceError> {
    if (MIN_PERCENT_COMPLETE..=MAX_PERCENT_COMPLETE).contains(&percent) {
        Ok(())
    } else {
        Err(TaskServiceError::PercentOutOfRange(percent))
    }
}

fn validate_title(title: &str) -> Result<(), TaskServiceError> {
    if title.trim().is_empty() {
        Err(TaskServiceError::EmptyTitle)
    } else {
        Ok(())
    }
}
