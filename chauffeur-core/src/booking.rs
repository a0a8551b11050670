use chauffeur_shared::serde_helpers::{
    deserialize_datetime, deserialize_optional_datetime, deserialize_some, empty_string_as_none,
    lenient_optional_f64, lenient_optional_u32, lenient_u32,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::ValidationError(format!("Unknown booking status: {}", other))),
        }
    }
}

/// Airport transfers only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    Arrival,
    Departure,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::Arrival => "arrival",
            TripType::Departure => "departure",
        }
    }
}

impl FromStr for TripType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arrival" => Ok(TripType::Arrival),
            "departure" => Ok(TripType::Departure),
            other => Err(CoreError::ValidationError(format!("Unknown trip type: {}", other))),
        }
    }
}

fn default_country_code() -> String {
    "+971".to_string()
}

/// Upper bound for passenger and luggage counts; keeps them inside an `INTEGER` column.
const MAX_COUNT: u32 = 99;

fn default_passengers() -> u32 {
    1
}

fn default_vehicle_model() -> String {
    "none".to_string()
}

/// Everything the customer fills in on the booking wizard.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[validate(length(min = 1, message = "Contact number is required"))]
    pub contact_number: String,

    #[validate(length(min = 1, message = "Service is required"))]
    pub service: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub trip_type: Option<TripType>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub flight_number: Option<String>,
    #[validate(length(min = 1, message = "Pickup location is required"))]
    pub pickup_location: String,
    #[validate(length(min = 1, message = "Drop location is required"))]
    pub drop_location: String,
    #[serde(default)]
    pub stops: Vec<String>,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub pickup_date: DateTime<Utc>,
    #[validate(length(min = 1, message = "Pickup time is required"))]
    pub pickup_time: String,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub drop_date: Option<DateTime<Utc>>,

    #[serde(default = "default_passengers", deserialize_with = "lenient_u32")]
    #[validate(range(min = 1, max = MAX_COUNT, message = "Passengers must be between 1 and 99"))]
    pub passengers: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    #[validate(range(max = MAX_COUNT, message = "Luggage cannot exceed 99 pieces"))]
    pub luggage: u32,

    #[validate(length(min = 1, message = "Vehicle is required"))]
    pub vehicle: String,
    #[serde(default = "default_vehicle_model")]
    pub vehicle_model: String,
    #[serde(default)]
    pub addons: Vec<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub notes: Option<String>,
}

impl BookingDetails {
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    fn tidy(&mut self) {
        self.stops.retain(|s| !s.trim().is_empty());
        self.addons.retain(|s| !s.trim().is_empty());
    }
}

#[derive(Debug, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub details: BookingDetails,
    pub assigned_driver: Option<Uuid>,
    pub status: BookingStatus,
    pub amount: f64,
    pub invoice_issued: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn check_amount(amount: f64) -> CoreResult<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Amount must be a non-negative number, got {}",
            amount
        )));
    }
    Ok(amount)
}

impl Booking {
    pub fn new(user_id: Uuid, mut details: BookingDetails) -> Self {
        details.tidy();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            details,
            assigned_driver: None,
            status: BookingStatus::Pending,
            amount: 0.0,
            invoice_issued: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn is_assigned_to(&self, driver_id: Uuid) -> bool {
        self.assigned_driver == Some(driver_id)
    }

    pub fn set_amount(&mut self, amount: f64) -> CoreResult<()> {
        self.amount = check_amount(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `None` for the driver unassigns. A missing amount keeps the current one.
    pub fn assign_driver(&mut self, driver: Option<Uuid>, amount: Option<f64>) -> CoreResult<()> {
        if let Some(amount) = amount {
            self.amount = check_amount(amount)?;
        }
        self.assigned_driver = driver;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_invoiced(&mut self) {
        self.invoice_issued = true;
        self.updated_at = Utc::now();
    }

    /// Applies every provided field, then re-validates the result. On error the
    /// booking is left as it was.
    pub fn apply_update(&mut self, update: BookingUpdate) -> CoreResult<()> {
        let mut next = self.clone();
        let d = &mut next.details;

        macro_rules! set {
            ($field:ident) => {
                if let Some(v) = update.$field {
                    d.$field = v;
                }
            };
        }

        set!(first_name);
        set!(last_name);
        set!(email);
        set!(country_code);
        set!(contact_number);
        set!(service);
        set!(pickup_location);
        set!(drop_location);
        set!(stops);
        set!(pickup_date);
        set!(pickup_time);
        set!(passengers);
        set!(luggage);
        set!(vehicle);
        set!(vehicle_model);
        set!(addons);
        if update.trip_type.is_some() {
            d.trip_type = update.trip_type;
        }
        if update.flight_number.is_some() {
            d.flight_number = update.flight_number;
        }
        if update.drop_date.is_some() {
            d.drop_date = update.drop_date;
        }
        if update.notes.is_some() {
            d.notes = update.notes;
        }
        d.tidy();
        d.validate()?;

        if let Some(driver) = update.assigned_driver {
            next.assigned_driver = driver;
        }
        if let Some(status) = update.status {
            next.status = status;
        }
        if let Some(amount) = update.amount {
            next.amount = check_amount(amount)?;
        }
        if let Some(issued) = update.invoice_issued {
            next.invoice_issued = issued;
        }

        next.updated_at = Utc::now();
        *self = next;
        Ok(())
    }
}

/// Back-office edit of a booking. Absent fields are left alone.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    pub country_code: Option<String>,
    pub contact_number: Option<String>,
    pub service: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub trip_type: Option<TripType>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub flight_number: Option<String>,
    pub pickup_location: Option<String>,
    pub drop_location: Option<String>,
    pub stops: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub pickup_date: Option<DateTime<Utc>>,
    pub pickup_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub drop_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_optional_u32")]
    pub passengers: Option<u32>,
    #[serde(default, deserialize_with = "lenient_optional_u32")]
    pub luggage: Option<u32>,
    pub vehicle: Option<String>,
    pub vehicle_model: Option<String>,
    pub addons: Option<Vec<String>>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assigned_driver: Option<Option<Uuid>>,
    pub status: Option<BookingStatus>,
    #[serde(default, deserialize_with = "lenient_optional_f64")]
    pub amount: Option<f64>,
    pub invoice_issued: Option<bool>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_details() -> BookingDetails {
        serde_json::from_value(serde_json::json!({
            "firstName": "John",
            "lastName": "Doe",
            "email": "john@example.com",
            "contactNumber": "12345678",
            "service": "Airport Transfer",
            "tripType": "arrival",
            "flightNumber": "GF123",
            "pickupLocation": "Bahrain International Airport",
            "dropLocation": "Four Seasons Hotel",
            "stops": ["", "City Centre Mall"],
            "pickupDate": "2025-03-14",
            "pickupTime": "10:30",
            "dropDate": "",
            "passengers": "2",
            "vehicle": "SUV",
            "addons": ["wifi"]
        }))
        .unwrap()
    }

    #[test]
    fn test_details_defaults() {
        let details = sample_details();
        assert_eq!(details.country_code, "+971");
        assert_eq!(details.vehicle_model, "none");
        assert_eq!(details.luggage, 0);
        assert_eq!(details.passengers, 2);
        assert_eq!(details.trip_type, Some(TripType::Arrival));
        assert!(details.drop_date.is_none());
        assert!(details.validate().is_ok());
    }

    #[test]
    fn test_new_booking_is_pending_and_unbilled() {
        let booking = Booking::new(Uuid::new_v4(), sample_details());
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.amount, 0.0);
        assert!(!booking.invoice_issued);
        assert_eq!(booking.details.stops, vec!["City Centre Mall".to_string()]);
    }

    #[test]
    fn test_missing_required_field_fails_validation() {
        let mut details = sample_details();
        details.pickup_location = String::new();
        assert!(details.validate().is_err());
    }

    #[test]
    fn test_assign_driver_keeps_amount_when_absent() {
        let mut booking = Booking::new(Uuid::new_v4(), sample_details());
        booking.set_amount(45.5).unwrap();
        let driver = Uuid::new_v4();
        booking.assign_driver(Some(driver), None).unwrap();
        assert!(booking.is_assigned_to(driver));
        assert_eq!(booking.amount, 45.5);

        booking.assign_driver(None, Some(60.0)).unwrap();
        assert!(booking.assigned_driver.is_none());
        assert_eq!(booking.amount, 60.0);
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let mut booking = Booking::new(Uuid::new_v4(), sample_details());
        assert!(booking.set_amount(-1.0).is_err());
        assert!(booking.assign_driver(None, Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_apply_update_changes_only_given_fields() {
        let mut booking = Booking::new(Uuid::new_v4(), sample_details());
        let update: BookingUpdate = serde_json::from_value(serde_json::json!({
            "status": "confirmed",
            "amount": 80,
            "pickupTime": "11:00",
            "assignedDriver": null
        }))
        .unwrap();
        booking.apply_update(update).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.amount, 80.0);
        assert_eq!(booking.details.pickup_time, "11:00");
        assert_eq!(booking.details.service, "Airport Transfer");
    }

    #[test]
    fn test_invalid_update_leaves_booking_untouched() {
        let mut booking = Booking::new(Uuid::new_v4(), sample_details());
        let update = BookingUpdate {
            vehicle: Some(String::new()),
            status: Some(BookingStatus::Cancelled),
            ..Default::default()
        };
        assert!(booking.apply_update(update).is_err());
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.details.vehicle, "SUV");
    }

    #[test]
    fn test_oversized_counts_fail_validation() {
        let mut details = sample_details();
        details.luggage = 3_000_000_000;
        assert!(details.validate().is_err());

        let mut booking = Booking::new(Uuid::new_v4(), sample_details());
        let update: BookingUpdate =
            serde_json::from_value(serde_json::json!({ "passengers": "3000000000" })).unwrap();
        assert!(booking.apply_update(update).is_err());
        assert_eq!(booking.details.passengers, 2);
    }

    #[test]
    fn test_update_amount_from_form_string() {
        let mut booking = Booking::new(Uuid::new_v4(), sample_details());
        let update: BookingUpdate =
            serde_json::from_value(serde_json::json!({ "amount": "42.5" })).unwrap();
        booking.apply_update(update).unwrap();
        assert_eq!(booking.amount, 42.5);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let res: Result<BookingUpdate, _> =
            serde_json::from_value(serde_json::json!({ "status": "completed" }));
        assert!(res.is_err());
    }
}
