use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::booking::{Booking, BookingStatus};
use crate::{CoreError, CoreResult};

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

// ============================================================================
// Report period
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Monthly { year: i32, month: u32 },
    Yearly { year: i32 },
}

fn parse_year(raw: &str) -> CoreResult<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|y| (1970..=9999).contains(y))
        .ok_or_else(|| CoreError::ValidationError(format!("Invalid year: {}", raw)))
}

impl ReportPeriod {
    /// Parses the `type`, `month` (`YYYY-MM`) and `year` query parameters.
    /// `type` defaults to monthly.
    pub fn parse(kind: Option<&str>, month: Option<&str>, year: Option<&str>) -> CoreResult<Self> {
        match kind.map(str::trim).unwrap_or("monthly") {
            "monthly" => {
                let raw = month.ok_or_else(|| {
                    CoreError::ValidationError("month is required for monthly reports".to_string())
                })?;
                let (y, m) = raw
                    .trim()
                    .split_once('-')
                    .ok_or_else(|| CoreError::ValidationError(format!("Invalid month: {}", raw)))?;
                let year = parse_year(y)?;
                let month = m
                    .parse::<u32>()
                    .ok()
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(|| CoreError::ValidationError(format!("Invalid month: {}", raw)))?;
                Ok(ReportPeriod::Monthly { year, month })
            }
            "yearly" => {
                let raw = year.ok_or_else(|| {
                    CoreError::ValidationError("year is required for yearly reports".to_string())
                })?;
                Ok(ReportPeriod::Yearly { year: parse_year(raw)? })
            }
            other => Err(CoreError::ValidationError(format!("Unknown report type: {}", other))),
        }
    }

    /// Half-open UTC range `[start, end)` covered by the period.
    pub fn range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let (start, end) = match *self {
            ReportPeriod::Monthly { year, month } => {
                let next = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
                (first_of(year, month), first_of(next.0, next.1))
            }
            ReportPeriod::Yearly { year } => (first_of(year, 1), first_of(year + 1, 1)),
        };
        (start, end)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let (start, end) = self.range();
        at >= start && at < end
    }

    /// "March 2025" or "2025".
    pub fn label(&self) -> String {
        match *self {
            ReportPeriod::Monthly { year, month } => {
                format!("{} {}", MONTH_NAMES[(month - 1) as usize], year)
            }
            ReportPeriod::Yearly { year } => year.to_string(),
        }
    }

    /// Used in download file names: "2025-03" or "2025".
    pub fn slug(&self) -> String {
        match *self {
            ReportPeriod::Monthly { year, month } => format!("{}-{:02}", year, month),
            ReportPeriod::Yearly { year } => year.to_string(),
        }
    }

    pub fn is_yearly(&self) -> bool {
        matches!(self, ReportPeriod::Yearly { .. })
    }
}

fn first_of(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ============================================================================
// Period report
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRow {
    pub month: &'static str,
    pub bookings: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub customer: String,
    pub service: String,
    pub status: BookingStatus,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PeriodReport {
    pub period: ReportPeriod,
    pub generated_at: DateTime<Utc>,
    pub total_bookings: usize,
    pub total_revenue: f64,
    pub average_amount: f64,
    pub confirmed: usize,
    pub pending: usize,
    pub cancelled: usize,
    /// Twelve rows, filled for yearly reports only.
    pub monthly: Vec<MonthlyRow>,
    /// Per-booking lines, filled for monthly reports only.
    pub lines: Vec<ReportLine>,
}

impl PeriodReport {
    /// Bookings are bucketed by creation time; anything outside the period is ignored.
    pub fn build(period: ReportPeriod, bookings: &[Booking]) -> Self {
        let mut in_period: Vec<&Booking> =
            bookings.iter().filter(|b| period.contains(b.created_at)).collect();
        in_period.sort_by_key(|b| b.created_at);

        let total_bookings = in_period.len();
        let total_revenue: f64 = in_period.iter().map(|b| b.amount).sum();
        let average_amount = if total_bookings == 0 {
            0.0
        } else {
            total_revenue / total_bookings as f64
        };
        let count = |status: BookingStatus| in_period.iter().filter(|b| b.status == status).count();

        let monthly = if period.is_yearly() {
            let mut rows: Vec<MonthlyRow> = MONTH_NAMES
                .iter()
                .map(|&name| MonthlyRow { month: &name[..3], bookings: 0, revenue: 0.0 })
                .collect();
            for b in &in_period {
                let row = &mut rows[b.created_at.month0() as usize];
                row.bookings += 1;
                row.revenue += b.amount;
            }
            rows
        } else {
            Vec::new()
        };

        let lines = if period.is_yearly() {
            Vec::new()
        } else {
            in_period
                .iter()
                .map(|b| ReportLine {
                    customer: b.details.customer_name(),
                    service: b.details.service.clone(),
                    status: b.status,
                    amount: b.amount,
                    created_at: b.created_at,
                })
                .collect()
        };

        Self {
            period,
            generated_at: Utc::now(),
            total_bookings,
            total_revenue,
            average_amount,
            confirmed: count(BookingStatus::Confirmed),
            pending: count(BookingStatus::Pending),
            cancelled: count(BookingStatus::Cancelled),
            monthly,
            lines,
        }
    }

    /// Percentage of the period's bookings, 0 when there are none.
    pub fn share(&self, count: usize) -> f64 {
        if self.total_bookings == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total_bookings as f64
        }
    }
}

// ============================================================================
// Dashboard statistics
// ============================================================================

/// Raw per-role counts as returned by the user store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleCounts {
    pub customers: u64,
    pub admins: u64,
    pub staff: u64,
    pub drivers: u64,
    pub available_drivers: u64,
}

/// Raw per-status counts and revenue as returned by the booking store.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatusSummary {
    pub pending: u64,
    pub confirmed: u64,
    pub cancelled: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingStats {
    pub total: u64,
    pub pending: u64,
    pub confirmed: u64,
    pub cancelled: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: u64,
    pub customers: u64,
    pub admins: u64,
    pub staff: u64,
    pub drivers: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverStats {
    pub total: u64,
    pub available: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardStats {
    pub bookings: BookingStats,
    pub users: UserStats,
    pub drivers: DriverStats,
}

impl DashboardStats {
    pub fn new(roles: RoleCounts, statuses: StatusSummary) -> Self {
        Self {
            bookings: BookingStats {
                total: statuses.pending + statuses.confirmed + statuses.cancelled,
                pending: statuses.pending,
                confirmed: statuses.confirmed,
                cancelled: statuses.cancelled,
                revenue: statuses.revenue,
            },
            users: UserStats {
                total: roles.customers + roles.admins + roles.staff + roles.drivers,
                customers: roles.customers,
                admins: roles.admins,
                staff: roles.staff,
                drivers: roles.drivers,
            },
            drivers: DriverStats {
                total: roles.drivers,
                available: roles.available_drivers,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::tests::sample_details;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn booking_at(y: i32, m: u32, d: u32, amount: f64, status: BookingStatus) -> Booking {
        let mut b = Booking::new(Uuid::new_v4(), sample_details());
        b.created_at = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
        b.amount = amount;
        b.status = status;
        b
    }

    #[test]
    fn test_parse_monthly_and_yearly() {
        assert_eq!(
            ReportPeriod::parse(Some("monthly"), Some("2025-03"), None).unwrap(),
            ReportPeriod::Monthly { year: 2025, month: 3 }
        );
        assert_eq!(
            ReportPeriod::parse(Some("yearly"), None, Some("2024")).unwrap(),
            ReportPeriod::Yearly { year: 2024 }
        );
        assert_eq!(
            ReportPeriod::parse(None, Some("2025-11"), None).unwrap(),
            ReportPeriod::Monthly { year: 2025, month: 11 }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ReportPeriod::parse(Some("monthly"), Some("2025-13"), None).is_err());
        assert!(ReportPeriod::parse(Some("monthly"), None, None).is_err());
        assert!(ReportPeriod::parse(Some("yearly"), None, Some("twenty")).is_err());
        assert!(ReportPeriod::parse(Some("weekly"), None, None).is_err());
    }

    #[test]
    fn test_december_range_rolls_into_next_year() {
        let period = ReportPeriod::Monthly { year: 2024, month: 12 };
        let (start, end) = period.range();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(period.label(), "December 2024");
        assert_eq!(period.slug(), "2024-12");
    }

    #[test]
    fn test_monthly_report_totals() {
        let bookings = vec![
            booking_at(2025, 3, 2, 40.0, BookingStatus::Confirmed),
            booking_at(2025, 3, 20, 60.0, BookingStatus::Pending),
            booking_at(2025, 3, 28, 0.0, BookingStatus::Cancelled),
            booking_at(2025, 4, 1, 500.0, BookingStatus::Confirmed),
        ];
        let report = PeriodReport::build(ReportPeriod::Monthly { year: 2025, month: 3 }, &bookings);
        assert_eq!(report.total_bookings, 3);
        assert_eq!(report.total_revenue, 100.0);
        assert!((report.average_amount - 33.333).abs() < 0.01);
        assert_eq!((report.confirmed, report.pending, report.cancelled), (1, 1, 1));
        assert_eq!(report.lines.len(), 3);
        assert!(report.monthly.is_empty());
        assert!((report.share(1) - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_yearly_report_has_twelve_rows() {
        let bookings = vec![
            booking_at(2025, 1, 5, 10.0, BookingStatus::Confirmed),
            booking_at(2025, 1, 9, 15.0, BookingStatus::Confirmed),
            booking_at(2025, 7, 9, 20.0, BookingStatus::Pending),
            booking_at(2024, 7, 9, 99.0, BookingStatus::Pending),
        ];
        let report = PeriodReport::build(ReportPeriod::Yearly { year: 2025 }, &bookings);
        assert_eq!(report.monthly.len(), 12);
        assert_eq!(report.monthly[0].month, "Jan");
        assert_eq!(report.monthly[0].bookings, 2);
        assert_eq!(report.monthly[0].revenue, 25.0);
        assert_eq!(report.monthly[6].bookings, 1);
        assert_eq!(report.total_revenue, 45.0);
        assert!(report.lines.is_empty());
    }

    #[test]
    fn test_empty_period_has_zero_average() {
        let report = PeriodReport::build(ReportPeriod::Yearly { year: 2020 }, &[]);
        assert_eq!(report.average_amount, 0.0);
        assert_eq!(report.share(0), 0.0);
    }

    #[test]
    fn test_dashboard_stats_totals() {
        let stats = DashboardStats::new(
            RoleCounts { customers: 5, admins: 1, staff: 2, drivers: 4, available_drivers: 3 },
            StatusSummary { pending: 3, confirmed: 6, cancelled: 1, revenue: 420.0 },
        );
        assert_eq!(stats.bookings.total, 10);
        assert_eq!(stats.users.total, 12);
        assert_eq!(stats.drivers.available, 3);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["bookings"]["total"], 10);
        assert_eq!(json["drivers"]["total"], 4);
    }
}
