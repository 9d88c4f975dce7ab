#![allow(dead_code)] // each test binary uses a different subset

use chrono::{DateTime, TimeZone, Utc};
use migration::MigratorTrait;
use mockable::{Clock, MockClock};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};
use todo_server::task::{NewTask, SeaOrmTaskRepository, TaskService};

/// Opens a private in-memory SQLite database with migrations applied.
///
/// The pool is pinned to one connection: every connection to `:memory:`
/// would otherwise get its own empty database.
pub async fn setup_sqlite() -> anyhow::Result<Arc<DatabaseConnection>> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(Arc::new(db))
}

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn setup_postgres(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<Arc<DatabaseConnection>> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(Arc::new(db))
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .expect("valid UTC timestamp")
}

/// Wednesday 2026-10-14, 15:30 UTC.
pub fn wednesday_afternoon() -> DateTime<Utc> {
    utc(2026, 10, 14, 15, 30, 0)
}

/// A clock frozen at `now`.
pub fn clock_at(now: DateTime<Utc>) -> Arc<dyn Clock> {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(now);
    Arc::new(clock)
}

/// A service over a fresh unit of work, the way each HTTP request gets one.
pub fn service_at(
    db: &Arc<DatabaseConnection>,
    now: DateTime<Utc>,
) -> TaskService<SeaOrmTaskRepository> {
    TaskService::new(SeaOrmTaskRepository::new(db.clone()), clock_at(now))
}

pub fn new_task(title: &str, expiry: DateTime<Utc>) -> NewTask {
    NewTask::new(title.to_string(), None, expiry, 0)
}
