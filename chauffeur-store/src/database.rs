use chauffeur_core::{BookingRepository, CoreError, UserRepository};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::app_config::DatabaseConfig;
use crate::booking_repo::PostgresBookingRepository;
use crate::memory_repo::{MemoryBookingRepository, MemoryUserRepository};
use crate::user_repo::PostgresUserRepository;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("Database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// The two collections every handler works against.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

impl Repositories {
    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryUserRepository::new()),
            bookings: Arc::new(MemoryBookingRepository::new()),
        }
    }

    pub fn postgres(db: &DbClient) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(db.pool.clone())),
            bookings: Arc::new(PostgresBookingRepository::new(db.pool.clone())),
        }
    }
}

/// Opens the configured backend, running migrations for Postgres.
pub async fn connect(config: &DatabaseConfig) -> Result<Repositories, StoreError> {
    if config.is_memory() {
        info!("Using in-memory storage; data is lost on restart");
        return Ok(Repositories::memory());
    }

    let db = DbClient::new(&config.url, config.max_connections).await?;
    db.migrate().await?;
    info!("Connected to Postgres");
    Ok(Repositories::postgres(&db))
}

pub(crate) fn storage_error(e: sqlx::Error) -> CoreError {
    error!("Database error: {}", e);
    CoreError::InternalError(format!("Database error: {}", e))
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
