use chauffeur_core::{Company, Invoice};
use tracing::debug;

use crate::layout::{clip, letterhead, section, PageWriter, ACCENT, BLACK, GREY, MARGIN, RIGHT};
use crate::PdfResult;

const LABEL_WIDTH: f32 = 38.0;
const DETAILS_X: f32 = MARGIN + 62.0;

fn field(page: &mut PageWriter, label: &str, value: &str) {
    page.color(GREY);
    page.text(MARGIN, 9.5, false, label);
    page.color(BLACK);
    page.text(MARGIN + LABEL_WIDTH, 9.5, false, &clip(value, 80));
    page.advance(5.5);
}

pub fn render_invoice(company: &Company, invoice: &Invoice) -> PdfResult<Vec<u8>> {
    let mut page = PageWriter::new(&format!("Invoice {}", invoice.number))?;

    letterhead(
        &mut page,
        company,
        "INVOICE",
        &[
            format!("Invoice #: {}", invoice.number),
            format!("Date: {}", invoice.issued_on.format("%d %b %Y")),
            format!("Status: {}", invoice.status),
        ],
    );

    section(&mut page, "Bill To");
    field(&mut page, "Name", &invoice.customer_name);
    field(&mut page, "Email", &invoice.customer_email);
    field(&mut page, "Phone", &invoice.customer_phone);
    field(&mut page, "Passengers", &invoice.passengers.to_string());
    page.advance(4.0);

    section(&mut page, "Trip Details");
    field(&mut page, "Service", &invoice.service);
    field(&mut page, "Vehicle", &invoice.vehicle);
    field(&mut page, "Pickup", &invoice.pickup);
    field(&mut page, "Drop-off", &invoice.drop_off);
    field(
        &mut page,
        "Date & Time",
        &format!("{} {}", invoice.pickup_date.format("%d %b %Y"), invoice.pickup_time),
    );
    field(&mut page, "Driver", &invoice.driver);
    field(&mut page, "Flight", &invoice.flight_number);
    page.advance(4.0);

    section(&mut page, "Charges");
    page.color(GREY);
    page.text(MARGIN, 9.0, true, "Description");
    page.text(DETAILS_X, 9.0, true, "Details");
    page.text_right(RIGHT, 9.0, true, &format!("Amount ({})", company.currency));
    page.advance(6.0);
    page.color(BLACK);
    for line in &invoice.lines {
        page.ensure(8.0);
        page.text(MARGIN, 9.5, false, &clip(&line.description, 34));
        page.text(DETAILS_X, 9.5, false, &clip(&line.details, 58));
        page.text_right(RIGHT, 9.5, false, &format!("{:.2}", line.amount));
        page.advance(6.0);
    }

    page.rule(0.5, GREY);
    page.advance(4.0);
    page.color(ACCENT);
    page.text(DETAILS_X, 11.0, true, "Total");
    page.text_right(RIGHT, 11.0, true, &company.money(invoice.total()));
    page.advance(16.0);

    page.color(GREY);
    page.text(
        MARGIN,
        9.0,
        false,
        &format!("Thank you for choosing {}.", company.name),
    );
    page.advance(4.5);
    page.text(
        MARGIN,
        8.0,
        false,
        "This is a computer generated invoice and does not require a signature.",
    );

    debug!(invoice = %invoice.number, pages = page.pages(), "Rendered invoice");
    page.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chauffeur_core::{Booking, BookingDetails};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn company() -> Company {
        Company {
            name: "Royal Chauffeur Services".into(),
            registration: Some("CR 1234".into()),
            address: vec!["Road 1".into(), "Manama".into()],
            phone: Some("+973 1700 0000".into()),
            email: None,
            currency: "BHD".into(),
        }
    }

    fn details() -> BookingDetails {
        serde_json::from_value(serde_json::json!({
            "firstName": "Sara",
            "lastName": "Ahmed",
            "email": "sara@example.com",
            "contactNumber": "33445566",
            "service": "Airport Transfer",
            "pickupLocation": "Bahrain International Airport",
            "dropLocation": "Ritz-Carlton",
            "pickupDate": "2025-05-02T08:15",
            "pickupTime": "08:15",
            "vehicle": "Sedan"
        }))
        .unwrap()
    }

    #[test]
    fn test_renders_pdf_bytes() {
        let mut booking = Booking::new(Uuid::new_v4(), details());
        booking.set_amount(42.5).unwrap();
        let invoice =
            Invoice::from_booking(&booking, None, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        let bytes = render_invoice(&company(), &invoice).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }
}
