use chauffeur_core::{Company, PeriodReport};
use tracing::debug;

use crate::layout::{
    clip, letterhead, section, PageWriter, ACCENT, BLACK, GREY, MARGIN, PAGE_WIDTH, RIGHT,
};
use crate::PdfResult;

const CARD_GAP: f32 = 6.0;

/// Three outlined summary cards side by side.
fn summary_cards(page: &mut PageWriter, cards: &[(&str, String)]) {
    let width = (PAGE_WIDTH - 2.0 * MARGIN - CARD_GAP * (cards.len() as f32 - 1.0))
        / cards.len() as f32;
    page.ensure(26.0);
    for (i, (label, _)) in cards.iter().enumerate() {
        let x = MARGIN + i as f32 * (width + CARD_GAP);
        page.frame(x, width, 20.0, 5.0);
        page.color(GREY);
        page.text(x + 4.0, 8.5, false, label);
    }
    page.advance(9.0);
    for (i, (_, value)) in cards.iter().enumerate() {
        let x = MARGIN + i as f32 * (width + CARD_GAP);
        page.color(ACCENT);
        page.text(x + 4.0, 14.0, true, value);
    }
    page.color(BLACK);
    page.advance(18.0);
}

fn status_breakdown(page: &mut PageWriter, report: &PeriodReport) {
    section(page, "Status Breakdown");
    for (label, count) in [
        ("Confirmed", report.confirmed),
        ("Pending", report.pending),
        ("Cancelled", report.cancelled),
    ] {
        page.text(MARGIN, 10.0, false, label);
        page.text_right(MARGIN + 90.0, 10.0, true, &count.to_string());
        page.color(GREY);
        page.text_right(RIGHT, 10.0, false, &format!("{:.1}%", report.share(count)));
        page.color(BLACK);
        page.advance(6.0);
    }
    page.advance(4.0);
}

fn monthly_table(page: &mut PageWriter, company: &Company, report: &PeriodReport) {
    section(page, "Monthly Breakdown");
    page.color(GREY);
    page.text(MARGIN, 9.0, true, "Month");
    page.text_right(MARGIN + 90.0, 9.0, true, "Bookings");
    page.text_right(RIGHT, 9.0, true, &format!("Revenue ({})", company.currency));
    page.color(BLACK);
    page.advance(6.0);
    for row in &report.monthly {
        page.ensure(6.0);
        page.text(MARGIN, 9.5, false, row.month);
        page.text_right(MARGIN + 90.0, 9.5, false, &row.bookings.to_string());
        page.text_right(RIGHT, 9.5, false, &format!("{:.2}", row.revenue));
        page.advance(5.5);
    }
}

fn booking_list(page: &mut PageWriter, company: &Company, report: &PeriodReport) {
    section(page, "Bookings");
    if report.lines.is_empty() {
        page.color(GREY);
        page.text(MARGIN, 10.0, false, "No bookings in this period.");
        page.color(BLACK);
        page.advance(6.0);
        return;
    }

    let header = |page: &mut PageWriter| {
        page.color(GREY);
        page.text(MARGIN, 9.0, true, "Date");
        page.text(MARGIN + 24.0, 9.0, true, "Customer");
        page.text(MARGIN + 74.0, 9.0, true, "Service");
        page.text(MARGIN + 124.0, 9.0, true, "Status");
        page.text_right(RIGHT, 9.0, true, &format!("Amount ({})", company.currency));
        page.color(BLACK);
        page.advance(6.0);
    };

    header(&mut *page);
    for line in &report.lines {
        let before = page.pages();
        page.ensure(6.0);
        if page.pages() != before {
            header(&mut *page);
        }
        page.text(MARGIN, 9.0, false, &line.created_at.format("%d %b").to_string());
        page.text(MARGIN + 24.0, 9.0, false, &clip(&line.customer, 26));
        page.text(MARGIN + 74.0, 9.0, false, &clip(&line.service, 26));
        page.text(MARGIN + 124.0, 9.0, false, line.status.as_str());
        page.text_right(RIGHT, 9.0, false, &format!("{:.2}", line.amount));
        page.advance(5.5);
    }
}

pub fn render_report(company: &Company, report: &PeriodReport) -> PdfResult<Vec<u8>> {
    let label = report.period.label();
    let mut page = PageWriter::new(&format!("Booking Report {}", label))?;

    letterhead(
        &mut page,
        company,
        "BOOKING REPORT",
        &[
            format!(
                "Period: {} ({})",
                label,
                if report.period.is_yearly() { "Yearly" } else { "Monthly" }
            ),
            format!("Generated: {}", report.generated_at.format("%d %b %Y %H:%M UTC")),
        ],
    );

    summary_cards(
        &mut page,
        &[
            ("Total Bookings", report.total_bookings.to_string()),
            ("Total Revenue", company.money(report.total_revenue)),
            ("Average Booking", company.money(report.average_amount)),
        ],
    );

    status_breakdown(&mut page, report);

    if report.period.is_yearly() {
        monthly_table(&mut page, company, report);
    } else {
        booking_list(&mut page, company, report);
    }

    debug!(period = %label, pages = page.pages(), "Rendered booking report");
    page.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chauffeur_core::{Booking, BookingDetails, BookingStatus, ReportPeriod};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn company() -> Company {
        Company {
            name: "Royal Chauffeur Services".into(),
            registration: None,
            address: vec![],
            phone: None,
            email: Some("ops@example.com".into()),
            currency: "BHD".into(),
        }
    }

    fn booking(day: u32, amount: f64, status: BookingStatus) -> Booking {
        let details: BookingDetails = serde_json::from_value(serde_json::json!({
            "firstName": "Omar",
            "lastName": "Khalid",
            "email": "omar@example.com",
            "contactNumber": "39998888",
            "service": "Hourly Charter",
            "pickupLocation": "Juffair",
            "dropLocation": "Riffa",
            "pickupDate": "2025-03-20",
            "pickupTime": "18:00",
            "vehicle": "SUV"
        }))
        .unwrap();
        let mut b = Booking::new(Uuid::new_v4(), details);
        b.set_amount(amount).unwrap();
        b.status = status;
        b.created_at = Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap();
        b
    }

    #[test]
    fn test_monthly_report_paginates_long_lists() {
        let bookings: Vec<Booking> = (0..120)
            .map(|i| booking(1 + (i % 28), 10.0, BookingStatus::Confirmed))
            .collect();
        let report = PeriodReport::build(ReportPeriod::Monthly { year: 2025, month: 3 }, &bookings);
        let bytes = render_report(&company(), &report).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_yearly_report_renders() {
        let bookings = vec![
            booking(3, 25.0, BookingStatus::Pending),
            booking(9, 40.0, BookingStatus::Cancelled),
        ];
        let report = PeriodReport::build(ReportPeriod::Yearly { year: 2025 }, &bookings);
        let bytes = render_report(&company(), &report).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_empty_period_still_renders() {
        let report = PeriodReport::build(ReportPeriod::Monthly { year: 2024, month: 2 }, &[]);
        assert!(render_report(&company(), &report).unwrap().starts_with(b"%PDF"));
    }
}
