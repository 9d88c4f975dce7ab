use chrono::{DateTime, Utc};

pub mod api;
pub mod repository;
pub mod schedule;
pub mod service;

pub use repository::{RepositoryError, SeaOrmTaskRepository, TaskRepository};
pub use service::{TaskService, TaskState};

/// Lowest accepted completion percentage.
pub const MIN_PERCENT_COMPLETE: i32 = 0;
/// Highest accepted completion percentage.
pub const MAX_PERCENT_COMPLETE: i32 = 100;

/// A stored to-do item.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Task {
    id: i32,
    title: String,
    description: Option<String>,
    expiry: DateTime<Utc>,
    percent_complete: i32,
}

impl Task {
    pub fn new(
        id: i32,
        title: String,
        description: Option<String>,
        expiry: DateTime<Utc>,
        percent_complete: i32,
    ) -> Self {
        Self {
            id,
            title,
            description,
            expiry,
            percent_complete,
        }
    }

    /// Returns the ID assigned by the store.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the expiry instant, always in UTC.
    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    pub fn percent_complete(&self) -> i32 {
        self.percent_complete
    }

    /// Returns a copy of this task with a different completion percentage.
    pub fn with_percent_complete(self, percent_complete: i32) -> Self {
        Self {
            percent_complete,
            ..self
        }
    }
}

/// A to-do item that has not been stored yet and so has no ID.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct NewTask {
    title: String,
    description: Option<String>,
    expiry: DateTime<Utc>,
    percent_complete: i32,
}

impl NewTask {
    pub fn new(
        title: String,
        description: Option<String>,
        expiry: DateTime<Utc>,
        percent_complete: i32,
    ) -> Self {
        Self {
            title,
            description,
            expiry,
            percent_complete,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    pub fn percent_complete(&self) -> i32 {
        self.percent_complete
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// No task has the requested ID.
    #[error("Task with ID {0} not found")]
    TaskNotFound(i32),
    /// A completion percentage outside 0..=100 was supplied.
    #[error("Percent complete must be between 0 and 100, got {0}")]
    PercentOutOfRange(i32),
    /// A task was submitted without a title.
    #[error("Task title must not be empty")]
    EmptyTitle,
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[source] sea_orm::DbErr),
}

impl TaskServiceError {
    /// Returns `true` for errors caused by the caller's input rather than the store.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            TaskServiceError::PercentOutOfRange(_) | TaskServiceError::EmptyTitle
        )
    }
}

impl From<RepositoryError> for TaskServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => TaskServiceError::TaskNotFound(id),
            RepositoryError::Database(db_err) => TaskServiceError::Database(db_err),
        }
    }
}
