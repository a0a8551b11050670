//! In-process storage backed by `RwLock<HashMap>`. Used for local runs
//! (`database.url = "memory://"`) and for the API test-suite.

use async_trait::async_trait;
use chauffeur_core::{
    Booking, BookingRepository, BookingStatus, CoreError, CoreResult, Role, RoleCounts,
    StatusSummary, User, UserRepository,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> CoreResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(CoreError::Duplicate("User already exists".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> CoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn list(&self, role: Option<Role>) -> CoreResult<Vec<User>> {
        let users = self.users.read().await;
        let mut found: Vec<User> = users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        newest_first(&mut found, |u| u.created_at);
        Ok(found)
    }

    async fn update(&self, user: &User) -> CoreResult<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(CoreError::NotFound("User not found".to_string()));
        }
        if users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(CoreError::Duplicate("User already exists".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> CoreResult<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn role_counts(&self) -> CoreResult<RoleCounts> {
        let users = self.users.read().await;
        let mut counts = RoleCounts::default();
        for user in users.values() {
            match user.role {
                Role::Customer => counts.customers += 1,
                Role::Admin => counts.admins += 1,
                Role::Staff => counts.staff += 1,
                Role::Driver => {
                    counts.drivers += 1;
                    if user.availability == Some(true) {
                        counts.available_drivers += 1;
                    }
                }
            }
        }
        Ok(counts)
    }
}

#[derive(Default)]
pub struct MemoryBookingRepository {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select(&self, keep: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings.values().filter(|b| keep(b)).cloned().collect();
        newest_first(&mut found, |b| b.created_at);
        found
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> CoreResult<()> {
        self.bookings.write().await.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        Ok(self.select(|b| b.is_owned_by(user_id)).await)
    }

    async fn list_for_driver(&self, driver_id: Uuid) -> CoreResult<Vec<Booking>> {
        Ok(self.select(|b| b.is_assigned_to(driver_id)).await)
    }

    async fn list_all(&self) -> CoreResult<Vec<Booking>> {
        Ok(self.select(|_| true).await)
    }

    async fn list_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Booking>> {
        let mut found = self
            .select(|b| b.created_at >= from && b.created_at < to)
            .await;
        found.reverse();
        Ok(found)
    }

    async fn update(&self, booking: &Booking) -> CoreResult<()> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&booking.id) {
            Some(existing) => {
                *existing = booking.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound("Booking not found".to_string())),
        }
    }

    async fn delete(&self, id: Uuid) -> CoreResult<bool> {
        Ok(self.bookings.write().await.remove(&id).is_some())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> CoreResult<u64> {
        let mut bookings = self.bookings.write().await;
        let before = bookings.len();
        bookings.retain(|_, b| !b.is_owned_by(user_id));
        Ok((before - bookings.len()) as u64)
    }

    async fn clear_driver(&self, driver_id: Uuid) -> CoreResult<u64> {
        let mut bookings = self.bookings.write().await;
        let mut changed = 0;
        for booking in bookings.values_mut().filter(|b| b.is_assigned_to(driver_id)) {
            booking.assigned_driver = None;
            booking.updated_at = Utc::now();
            changed += 1;
        }
        Ok(changed)
    }

    async fn status_summary(&self) -> CoreResult<StatusSummary> {
        let bookings = self.bookings.read().await;
        let mut summary = StatusSummary::default();
        for booking in bookings.values() {
            match booking.status {
                BookingStatus::Pending => summary.pending += 1,
                BookingStatus::Confirmed => summary.confirmed += 1,
                BookingStatus::Cancelled => summary.cancelled += 1,
            }
            summary.revenue += booking.amount;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chauffeur_core::BookingDetails;
    use chrono::Duration;

    fn user(email: &str, role: Role) -> User {
        User::new("Test".into(), "User".into(), email, "123".into(), "hash".into(), role)
    }

    fn details() -> BookingDetails {
        serde_json::from_value(serde_json::json!({
            "firstName": "John",
            "lastName": "Doe",
            "email": "john@example.com",
            "contactNumber": "12345678",
            "service": "Hourly Charter",
            "pickupLocation": "Seef Mall",
            "dropLocation": "Bahrain Bay",
            "pickupDate": "2025-06-01",
            "pickupTime": "09:00",
            "vehicle": "Sedan"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = MemoryUserRepository::new();
        repo.insert(&user("a@example.com", Role::Customer)).await.unwrap();
        let err = repo
            .insert(&user("a@example.com", Role::Staff))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_update_cannot_steal_email() {
        let repo = MemoryUserRepository::new();
        repo.insert(&user("a@example.com", Role::Customer)).await.unwrap();
        let mut b = user("b@example.com", Role::Customer);
        repo.insert(&b).await.unwrap();
        b.email = "a@example.com".into();
        assert!(matches!(repo.update(&b).await, Err(CoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_role() {
        let repo = MemoryUserRepository::new();
        repo.insert(&user("c@example.com", Role::Customer)).await.unwrap();
        repo.insert(&user("d@example.com", Role::Driver)).await.unwrap();
        let drivers = repo.list(Some(Role::Driver)).await.unwrap();
        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].email, "d@example.com");
        assert_eq!(repo.list(None).await.unwrap().len(), 2);

        let counts = repo.role_counts().await.unwrap();
        assert_eq!(counts.drivers, 1);
        assert_eq!(counts.available_drivers, 1);
        assert_eq!(counts.customers, 1);
    }

    #[tokio::test]
    async fn test_bookings_are_listed_newest_first() {
        let repo = MemoryBookingRepository::new();
        let owner = Uuid::new_v4();
        let mut older = Booking::new(owner, details());
        older.created_at = Utc::now() - Duration::days(1);
        let newer = Booking::new(owner, details());
        repo.insert(&older).await.unwrap();
        repo.insert(&newer).await.unwrap();

        let mine = repo.list_for_user(owner).await.unwrap();
        assert_eq!(mine[0].id, newer.id);
        assert_eq!(mine[1].id, older.id);

        let window = repo
            .list_created_between(Utc::now() - Duration::days(2), Utc::now() + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(window[0].id, older.id);
    }

    #[tokio::test]
    async fn test_clear_driver_and_delete_for_user() {
        let repo = MemoryBookingRepository::new();
        let owner = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let mut booking = Booking::new(owner, details());
        booking.assign_driver(Some(driver), Some(30.0)).unwrap();
        repo.insert(&booking).await.unwrap();
        repo.insert(&Booking::new(Uuid::new_v4(), details())).await.unwrap();

        assert_eq!(repo.list_for_driver(driver).await.unwrap().len(), 1);
        assert_eq!(repo.clear_driver(driver).await.unwrap(), 1);
        assert!(repo.list_for_driver(driver).await.unwrap().is_empty());

        let summary = repo.status_summary().await.unwrap();
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.revenue, 30.0);

        assert_eq!(repo.delete_for_user(owner).await.unwrap(), 1);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_booking_is_not_found() {
        let repo = MemoryBookingRepository::new();
        let booking = Booking::new(Uuid::new_v4(), details());
        assert!(matches!(
            repo.update(&booking).await,
            Err(CoreError::NotFound(_))
        ));
    }
}
