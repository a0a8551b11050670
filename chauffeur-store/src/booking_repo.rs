use async_trait::async_trait;
use chauffeur_core::{
    Booking, BookingDetails, BookingRepository, BookingStatus, CoreError, CoreResult,
    StatusSummary, TripType,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::storage_error;

pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, clause: &str, id: Option<Uuid>) -> CoreResult<Vec<Booking>> {
        let sql = format!("SELECT {} FROM bookings {}", BOOKING_COLUMNS, clause);
        let mut query = sqlx::query_as::<_, BookingRow>(&sql);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(storage_error)?;
        rows.into_iter().map(Booking::try_from).collect()
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, first_name, last_name, email, country_code, \
     contact_number, service, trip_type, flight_number, pickup_location, drop_location, stops, \
     pickup_date, pickup_time, drop_date, passengers, luggage, vehicle, vehicle_model, addons, \
     notes, assigned_driver, status, amount, invoice_issued, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    country_code: String,
    contact_number: String,
    service: String,
    trip_type: Option<String>,
    flight_number: Option<String>,
    pickup_location: String,
    drop_location: String,
    stops: Vec<String>,
    pickup_date: DateTime<Utc>,
    pickup_time: String,
    drop_date: Option<DateTime<Utc>>,
    passengers: i32,
    luggage: i32,
    vehicle: String,
    vehicle_model: String,
    addons: Vec<String>,
    notes: Option<String>,
    assigned_driver: Option<Uuid>,
    status: String,
    amount: f64,
    invoice_issued: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let trip_type = row.trip_type.as_deref().map(str::parse::<TripType>).transpose()?;
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            details: BookingDetails {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                country_code: row.country_code,
                contact_number: row.contact_number,
                service: row.service,
                trip_type,
                flight_number: row.flight_number,
                pickup_location: row.pickup_location,
                drop_location: row.drop_location,
                stops: row.stops,
                pickup_date: row.pickup_date,
                pickup_time: row.pickup_time,
                drop_date: row.drop_date,
                passengers: row.passengers.max(0) as u32,
                luggage: row.luggage.max(0) as u32,
                vehicle: row.vehicle,
                vehicle_model: row.vehicle_model,
                addons: row.addons,
                notes: row.notes,
            },
            assigned_driver: row.assigned_driver,
            status: row.status.parse::<BookingStatus>()?,
            amount: row.amount,
            invoice_issued: row.invoice_issued,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn insert(&self, booking: &Booking) -> CoreResult<()> {
        let d = &booking.details;
        sqlx::query(
            "INSERT INTO bookings (id, user_id, first_name, last_name, email, country_code, \
             contact_number, service, trip_type, flight_number, pickup_location, drop_location, \
             stops, pickup_date, pickup_time, drop_date, passengers, luggage, vehicle, \
             vehicle_model, addons, notes, assigned_driver, status, amount, invoice_issued, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(&d.first_name)
        .bind(&d.last_name)
        .bind(&d.email)
        .bind(&d.country_code)
        .bind(&d.contact_number)
        .bind(&d.service)
        .bind(d.trip_type.map(|t| t.as_str()))
        .bind(&d.flight_number)
        .bind(&d.pickup_location)
        .bind(&d.drop_location)
        .bind(&d.stops)
        .bind(d.pickup_date)
        .bind(&d.pickup_time)
        .bind(d.drop_date)
        .bind(d.passengers as i32)
        .bind(d.luggage as i32)
        .bind(&d.vehicle)
        .bind(&d.vehicle_model)
        .bind(&d.addons)
        .bind(&d.notes)
        .bind(booking.assigned_driver)
        .bind(booking.status.as_str())
        .bind(booking.amount)
        .bind(booking.invoice_issued)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let mut rows = self.fetch_where("WHERE id = $1", Some(id)).await?;
        Ok(rows.pop())
    }

    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        self.fetch_where("WHERE user_id = $1 ORDER BY created_at DESC", Some(user_id))
            .await
    }

    async fn list_for_driver(&self, driver_id: Uuid) -> CoreResult<Vec<Booking>> {
        self.fetch_where(
            "WHERE assigned_driver = $1 ORDER BY created_at DESC",
            Some(driver_id),
        )
        .await
    }

    async fn list_all(&self) -> CoreResult<Vec<Booking>> {
        self.fetch_where("ORDER BY created_at DESC", None).await
    }

    async fn list_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE created_at >= $1 AND created_at < $2 \
             ORDER BY created_at ASC",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn update(&self, booking: &Booking) -> CoreResult<()> {
        let d = &booking.details;
        let result = sqlx::query(
            "UPDATE bookings SET first_name = $2, last_name = $3, email = $4, country_code = $5, \
             contact_number = $6, service = $7, trip_type = $8, flight_number = $9, \
             pickup_location = $10, drop_location = $11, stops = $12, pickup_date = $13, \
             pickup_time = $14, drop_date = $15, passengers = $16, luggage = $17, vehicle = $18, \
             vehicle_model = $19, addons = $20, notes = $21, assigned_driver = $22, status = $23, \
             amount = $24, invoice_issued = $25, updated_at = $26 \
             WHERE id = $1",
        )
        .bind(booking.id)
        .bind(&d.first_name)
        .bind(&d.last_name)
        .bind(&d.email)
        .bind(&d.country_code)
        .bind(&d.contact_number)
        .bind(&d.service)
        .bind(d.trip_type.map(|t| t.as_str()))
        .bind(&d.flight_number)
        .bind(&d.pickup_location)
        .bind(&d.drop_location)
        .bind(&d.stops)
        .bind(d.pickup_date)
        .bind(&d.pickup_time)
        .bind(d.drop_date)
        .bind(d.passengers as i32)
        .bind(d.luggage as i32)
        .bind(&d.vehicle)
        .bind(&d.vehicle_model)
        .bind(&d.addons)
        .bind(&d.notes)
        .bind(booking.assigned_driver)
        .bind(booking.status.as_str())
        .bind(booking.amount)
        .bind(booking.invoice_issued)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("Booking not found".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_user(&self, user_id: Uuid) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM bookings WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    async fn clear_driver(&self, driver_id: Uuid) -> CoreResult<u64> {
        let result = sqlx::query(
            "UPDATE bookings SET assigned_driver = NULL, updated_at = NOW() \
             WHERE assigned_driver = $1",
        )
        .bind(driver_id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    async fn status_summary(&self) -> CoreResult<StatusSummary> {
        #[derive(sqlx::FromRow)]
        struct SummaryRow {
            pending: i64,
            confirmed: i64,
            cancelled: i64,
            revenue: f64,
        }

        let row = sqlx::query_as::<_, SummaryRow>(
            "SELECT \
               COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
               COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed, \
               COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled, \
               COALESCE(SUM(amount), 0)::DOUBLE PRECISION AS revenue \
             FROM bookings",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(StatusSummary {
            pending: row.pending as u64,
            confirmed: row.confirmed as u64,
            cancelled: row.cancelled as u64,
            revenue: row.revenue,
        })
    }
}
