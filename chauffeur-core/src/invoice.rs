use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::booking::Booking;
use crate::user::User;

/// The issuing business, printed on invoice and report headers.
#[derive(Debug, Clone, Deserialize)]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub registration: Option<String>,
    #[serde(default)]
    pub address: Vec<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub currency: String,
}

impl Company {
    pub fn money(&self, amount: f64) -> String {
        format!("{} {:.2}", self.currency, amount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLine {
    pub description: String,
    pub details: String,
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub struct Invoice {
    pub number: String,
    pub booking_id: Uuid,
    pub issued_on: NaiveDate,
    pub status: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub passengers: u32,
    pub service: String,
    pub vehicle: String,
    pub pickup: String,
    pub drop_off: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: String,
    pub driver: String,
    pub flight_number: String,
    pub lines: Vec<InvoiceLine>,
}

/// Last eight hex digits of the booking id, upper-cased.
pub fn invoice_number(booking_id: &Uuid) -> String {
    let hex = booking_id.simple().to_string();
    hex[hex.len() - 8..].to_uppercase()
}

impl Invoice {
    pub fn from_booking(booking: &Booking, driver: Option<&User>, issued_on: NaiveDate) -> Self {
        let d = &booking.details;
        let phone = format!("{} {}", d.country_code, d.contact_number).trim().to_string();
        Self {
            number: invoice_number(&booking.id),
            booking_id: booking.id,
            issued_on,
            status: booking.status.as_str().to_uppercase(),
            customer_name: d.customer_name(),
            customer_email: d.email.clone(),
            customer_phone: phone,
            passengers: d.passengers,
            service: d.service.clone(),
            vehicle: d.vehicle.clone(),
            pickup: d.pickup_location.clone(),
            drop_off: d.drop_location.clone(),
            pickup_date: d.pickup_date.date_naive(),
            pickup_time: d.pickup_time.clone(),
            driver: driver
                .map(User::full_name)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Not Assigned".to_string()),
            flight_number: d.flight_number.clone().unwrap_or_else(|| "-".to_string()),
            lines: vec![InvoiceLine {
                description: d.service.clone(),
                details: format!("{} -> {}", d.pickup_location, d.drop_location),
                amount: booking.amount,
            }],
        }
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(|l| l.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::tests::sample_details;
    use crate::user::{Role, User};

    #[test]
    fn test_invoice_number_is_last_eight_hex_digits() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(invoice_number(&id), "0E5FE0C8");
    }

    #[test]
    fn test_invoice_without_driver() {
        let mut booking = Booking::new(Uuid::new_v4(), sample_details());
        booking.set_amount(55.0).unwrap();
        let issued = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let invoice = Invoice::from_booking(&booking, None, issued);
        assert_eq!(invoice.driver, "Not Assigned");
        assert_eq!(invoice.status, "PENDING");
        assert_eq!(invoice.flight_number, "GF123");
        assert_eq!(invoice.customer_phone, "+971 12345678");
        assert_eq!(invoice.lines[0].details, "Bahrain International Airport -> Four Seasons Hotel");
        assert_eq!(invoice.total(), 55.0);
        assert_eq!(invoice.pickup_date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    }

    #[test]
    fn test_invoice_names_assigned_driver() {
        let booking = Booking::new(Uuid::new_v4(), sample_details());
        let driver = User::new(
            "Raj".into(),
            "Kumar".into(),
            "raj@example.com",
            "555".into(),
            "hash".into(),
            Role::Driver,
        );
        let invoice = Invoice::from_booking(&booking, Some(&driver), NaiveDate::MIN);
        assert_eq!(invoice.driver, "Raj Kumar");
    }

    #[test]
    fn test_company_formats_money() {
        let company = Company {
            name: "Acme Limousines".into(),
            registration: None,
            address: vec![],
            phone: None,
            email: None,
            currency: "BHD".into(),
        };
        assert_eq!(company.money(12.5), "BHD 12.50");
    }
}
