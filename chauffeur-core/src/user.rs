use chauffeur_shared::serde_helpers::empty_string_as_none;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::CoreError;

/// Account role. Drives every route guard in the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
    Driver,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::Driver => "driver",
            Role::Staff => "staff",
        }
    }

    /// Admins and staff manage bookings on behalf of customers.
    pub fn is_back_office(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            "driver" => Ok(Role::Driver),
            "staff" => Ok(Role::Staff),
            other => Err(CoreError::ValidationError(format!("Unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VehicleType {
    Sedan,
    #[serde(rename = "SUV")]
    Suv,
    Minibus,
    Coach,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Sedan => "Sedan",
            VehicleType::Suv => "SUV",
            VehicleType::Minibus => "Minibus",
            VehicleType::Coach => "Coach",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sedan" => Ok(VehicleType::Sedan),
            "SUV" => Ok(VehicleType::Suv),
            "Minibus" => Ok(VehicleType::Minibus),
            "Coach" => Ok(VehicleType::Coach),
            other => Err(CoreError::ValidationError(format!("Unknown vehicle type: {}", other))),
        }
    }
}

/// Emails are unique case-insensitively; store them trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub vehicle: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub availability: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        first_name: String,
        last_name: String,
        email: &str,
        phone: String,
        password_hash: String,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        let mut user = Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email: normalize_email(email),
            phone,
            password_hash,
            role,
            vehicle: None,
            vehicle_type: None,
            availability: None,
            created_at: now,
            updated_at: now,
        };
        user.normalize_driver_fields();
        user
    }

    /// Attach vehicle details. Ignored unless the user is a driver.
    pub fn with_vehicle(
        mut self,
        vehicle: Option<String>,
        vehicle_type: Option<VehicleType>,
        availability: Option<bool>,
    ) -> Self {
        self.vehicle = vehicle.filter(|v| !v.trim().is_empty());
        self.vehicle_type = vehicle_type;
        self.availability = availability;
        self.normalize_driver_fields();
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Drivers default to available; every other role carries no vehicle data.
    pub fn normalize_driver_fields(&mut self) {
        if self.is_driver() {
            if self.availability.is_none() {
                self.availability = Some(true);
            }
        } else {
            self.vehicle = None;
            self.vehicle_type = None;
            self.availability = None;
        }
    }

    /// Blank strings leave the existing value untouched.
    pub fn apply_update(&mut self, update: UserUpdate) {
        fn keep_or_replace(field: &mut String, value: Option<String>) {
            if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                *field = v;
            }
        }

        keep_or_replace(&mut self.first_name, update.first_name);
        keep_or_replace(&mut self.last_name, update.last_name);
        keep_or_replace(&mut self.phone, update.phone);
        if let Some(email) = update.email.filter(|e| !e.trim().is_empty()) {
            self.email = normalize_email(&email);
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(vehicle) = update.vehicle.filter(|v| !v.trim().is_empty()) {
            self.vehicle = Some(vehicle);
        }
        if let Some(vehicle_type) = update.vehicle_type {
            self.vehicle_type = Some(vehicle_type);
        }
        if let Some(availability) = update.availability {
            self.availability = Some(availability);
        }

        self.normalize_driver_fields();
        self.updated_at = Utc::now();
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            vehicle: self.vehicle.clone(),
            vehicle_type: self.vehicle_type,
            availability: self.availability,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Partial profile change. Passwords travel separately so they can be hashed first.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub phone: Option<String>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub vehicle: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub availability: Option<bool>,
}

/// User as returned by the API: everything except the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub vehicle: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub availability: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking owner as shown on back-office listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> User {
        User::new(
            "Ali".into(),
            "Hassan".into(),
            "  Ali.Driver@Example.com ",
            "+973 33334444".into(),
            "hash".into(),
            Role::Driver,
        )
        .with_vehicle(Some("Toyota Land Cruiser".into()), Some(VehicleType::Suv), None)
    }

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(driver().email, "ali.driver@example.com");
    }

    #[test]
    fn test_blank_form_fields_keep_existing_values() {
        let mut user = driver();
        let update: UserUpdate = serde_json::from_value(serde_json::json!({
            "firstName": "",
            "email": "",
            "phone": "+973 9",
            "vehicle": ""
        }))
        .unwrap();
        assert!(update.validate().is_ok());
        user.apply_update(update);
        assert_eq!(user.first_name, "Ali");
        assert_eq!(user.email, "ali.driver@example.com");
        assert_eq!(user.phone, "+973 9");
        assert_eq!(user.vehicle.as_deref(), Some("Toyota Land Cruiser"));
    }

    #[test]
    fn test_driver_defaults_to_available() {
        let d = driver();
        assert_eq!(d.availability, Some(true));
        assert_eq!(d.vehicle_type, Some(VehicleType::Suv));
    }

    #[test]
    fn test_non_driver_drops_vehicle_fields() {
        let customer = User::new(
            "John".into(),
            "Doe".into(),
            "john@example.com",
            "123".into(),
            "hash".into(),
            Role::Customer,
        )
        .with_vehicle(Some("Bus".into()), Some(VehicleType::Coach), Some(true));
        assert!(customer.vehicle.is_none());
        assert!(customer.vehicle_type.is_none());
        assert!(customer.availability.is_none());
    }

    #[test]
    fn test_role_change_clears_driver_fields() {
        let mut d = driver();
        d.apply_update(UserUpdate {
            role: Some(Role::Staff),
            ..Default::default()
        });
        assert_eq!(d.role, Role::Staff);
        assert!(d.vehicle.is_none());
    }

    #[test]
    fn test_blank_fields_keep_existing_values() {
        let mut d = driver();
        d.apply_update(UserUpdate {
            first_name: Some("".into()),
            phone: Some("+973 1".into()),
            availability: Some(false),
            ..Default::default()
        });
        assert_eq!(d.first_name, "Ali");
        assert_eq!(d.phone, "+973 1");
        assert_eq!(d.availability, Some(false));
    }

    #[test]
    fn test_public_view_has_no_password() {
        let json = serde_json::to_value(driver().public()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "driver");
        assert_eq!(json["vehicleType"], "SUV");
        assert!(json.get("_id").is_some());
    }

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("staff".parse::<Role>().unwrap(), Role::Staff);
        assert!("root".parse::<Role>().is_err());
    }
}
