use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::Booking;
use crate::report::{RoleCounts, StatusSummary};
use crate::user::{Role, User};
use crate::CoreResult;

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `CoreError::Duplicate` when the email is taken.
    async fn insert(&self, user: &User) -> CoreResult<()>;

    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<User>>;

    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> CoreResult<Vec<User>>;

    /// Newest first, optionally restricted to one role.
    async fn list(&self, role: Option<Role>) -> CoreResult<Vec<User>>;

    /// Fails with `CoreError::NotFound` for an unknown id and
    /// `CoreError::Duplicate` when the new email is taken.
    async fn update(&self, user: &User) -> CoreResult<()>;

    /// Returns whether a user was removed.
    async fn delete(&self, id: Uuid) -> CoreResult<bool>;

    async fn role_counts(&self) -> CoreResult<RoleCounts>;
}

/// Repository trait for bookings
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: &Booking) -> CoreResult<()>;

    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    /// Bookings owned by a user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>>;

    /// Bookings assigned to a driver, newest first.
    async fn list_for_driver(&self, driver_id: Uuid) -> CoreResult<Vec<Booking>>;

    /// Every booking, newest first.
    async fn list_all(&self) -> CoreResult<Vec<Booking>>;

    /// Bookings created in `[from, to)`, oldest first.
    async fn list_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Booking>>;

    /// Fails with `CoreError::NotFound` for an unknown id.
    async fn update(&self, booking: &Booking) -> CoreResult<()>;

    /// Returns whether a booking was removed.
    async fn delete(&self, id: Uuid) -> CoreResult<bool>;

    /// Removes every booking owned by `user_id`; returns how many went.
    async fn delete_for_user(&self, user_id: Uuid) -> CoreResult<u64>;

    /// Unassigns `driver_id` everywhere; returns how many bookings changed.
    async fn clear_driver(&self, driver_id: Uuid) -> CoreResult<u64>;

    async fn status_summary(&self) -> CoreResult<StatusSummary>;
}
