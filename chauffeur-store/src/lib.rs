pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod memory_repo;
pub mod user_repo;

pub use booking_repo::PostgresBookingRepository;
pub use database::{connect, DbClient, Repositories, StoreError};
pub use memory_repo::{MemoryBookingRepository, MemoryUserRepository};
pub use user_repo::PostgresUserRepository;
