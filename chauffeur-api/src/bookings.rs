use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chauffeur_core::{
    Booking, BookingDetails, BookingStatus, BookingUpdate, Invoice, PublicUser, Role, User,
    UserSummary,
};
use chauffeur_shared::serde_helpers::{deserialize_some, lenient_optional_f64};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::auth::parse_id;
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::middleware::auth::{authenticate, CurrentUser};
use crate::reports::{pdf_attachment, period_report, render_blocking};
use crate::state::AppState;

const BACK_OFFICE: [Role; 2] = [Role::Admin, Role::Staff];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub details: BookingDetails,
    /// Honoured for admin and staff only.
    #[serde(default)]
    pub status: Option<BookingStatus>,
    /// Honoured for admin and staff only.
    #[serde(default, deserialize_with = "lenient_optional_f64")]
    pub amount: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignDriverRequest {
    /// Absent is an error, `null` unassigns.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub driver_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "lenient_optional_f64")]
    pub amount: Option<f64>,
}

/// Booking owner: a bare id, or a summary on back-office listings.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OwnerRef {
    Id(Uuid),
    Summary(UserSummary),
}

/// A booking with its assigned driver populated.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: OwnerRef,
    #[serde(flatten)]
    pub details: BookingDetails,
    pub assigned_driver: Option<PublicUser>,
    pub status: BookingStatus,
    pub amount: f64,
    pub invoice_issued: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingView {
    fn new(booking: Booking, users: &HashMap<Uuid, User>, with_owner: bool) -> Self {
        let owner = users
            .get(&booking.user_id)
            .filter(|_| with_owner)
            .map(|u| OwnerRef::Summary(u.summary()))
            .unwrap_or(OwnerRef::Id(booking.user_id));
        let driver = booking
            .assigned_driver
            .and_then(|id| users.get(&id))
            .map(User::public);

        Self {
            id: booking.id,
            user: owner,
            details: booking.details,
            assigned_driver: driver,
            status: booking.status,
            amount: booking.amount,
            invoice_issued: booking.invoice_issued,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

/// Loads every referenced driver (and owner, if asked) in one query.
async fn populate(
    state: &AppState,
    bookings: Vec<Booking>,
    with_owner: bool,
) -> Result<Vec<BookingView>, AppError> {
    let mut ids: Vec<Uuid> = bookings.iter().filter_map(|b| b.assigned_driver).collect();
    if with_owner {
        ids.extend(bookings.iter().map(|b| b.user_id));
    }
    ids.sort_unstable();
    ids.dedup();

    let users: HashMap<Uuid, User> = state
        .users
        .find_by_ids(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(bookings
        .into_iter()
        .map(|b| BookingView::new(b, &users, with_owner))
        .collect())
}

async fn populate_one(
    state: &AppState,
    booking: Booking,
    with_owner: bool,
) -> Result<BookingView, AppError> {
    populate(state, vec![booking], with_owner)
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalServerError("populated booking went missing".to_string()))
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/my", get(my_bookings))
        .route("/assigned", get(assigned_bookings))
        .route("/report", get(period_report))
        .route(
            "/{id}",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route("/{id}/assign", put(assign_driver))
        .route("/{id}/invoice", post(issue_invoice))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

async fn load_booking(state: &AppState, raw_id: &str) -> Result<Booking, AppError> {
    let id = parse_id(raw_id, "Booking")?;
    state
        .bookings
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))
}

/// The referenced user must exist and be a driver.
async fn ensure_driver(state: &AppState, driver_id: Uuid) -> Result<User, AppError> {
    match state.users.find_by_id(driver_id).await? {
        Some(user) if user.is_driver() => Ok(user),
        Some(_) => Err(AppError::ValidationError(
            "Assigned user is not a driver".to_string(),
        )),
        None => Err(AppError::ValidationError("Driver not found".to_string())),
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_booking(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ValidatedJson(req): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    let mut booking = Booking::new(user.id, req.details);
    if user.role.is_back_office() {
        if let Some(status) = req.status {
            booking.status = status;
        }
        if let Some(amount) = req.amount {
            booking.set_amount(amount)?;
        }
    }
    state.bookings.insert(&booking).await?;

    info!(booking_id = %booking.id, user_id = %user.id, "Created booking");
    Ok((StatusCode::CREATED, Json(populate_one(&state, booking, false).await?)))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let bookings = state.bookings.list_for_user(user.id).await?;
    Ok(Json(populate(&state, bookings, false).await?))
}

async fn assigned_bookings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    current.require(&[Role::Driver])?;
    let bookings = state.bookings.list_for_driver(current.0.id).await?;
    Ok(Json(populate(&state, bookings, false).await?))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    current.require(&BACK_OFFICE)?;
    let bookings = state.bookings.list_all().await?;
    Ok(Json(populate(&state, bookings, true).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    let booking = load_booking(&state, &id).await?;
    let back_office = user.role.is_back_office();
    if !(back_office || booking.is_owned_by(user.id) || booking.is_assigned_to(user.id)) {
        return Err(AppError::AuthorizationError("Not authorized".to_string()));
    }
    Ok(Json(populate_one(&state, booking, back_office).await?))
}

async fn update_booking(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(update): ValidatedJson<BookingUpdate>,
) -> Result<Json<BookingView>, AppError> {
    current.require(&BACK_OFFICE)?;
    let mut booking = load_booking(&state, &id).await?;
    if let Some(Some(driver_id)) = update.assigned_driver {
        ensure_driver(&state, driver_id).await?;
    }

    booking.apply_update(update)?;
    state.bookings.update(&booking).await?;

    info!(booking_id = %booking.id, by = %current.0.id, "Updated booking");
    Ok(Json(populate_one(&state, booking, true).await?))
}

async fn delete_booking(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let booking = load_booking(&state, &id).await?;
    if user.role != Role::Admin && !booking.is_owned_by(user.id) {
        return Err(AppError::AuthorizationError("Not authorized".to_string()));
    }

    state.bookings.delete(booking.id).await?;
    info!(booking_id = %booking.id, by = %user.id, "Deleted booking");
    Ok(Json(json!({ "message": "Booking removed" })))
}

async fn assign_driver(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<AssignDriverRequest>,
) -> Result<Json<BookingView>, AppError> {
    current.require(&BACK_OFFICE)?;
    let driver_id = req
        .driver_id
        .ok_or_else(|| AppError::ValidationError("driverId is required".to_string()))?;

    let mut booking = load_booking(&state, &id).await?;
    if let Some(driver_id) = driver_id {
        ensure_driver(&state, driver_id).await?;
    }
    booking.assign_driver(driver_id, req.amount)?;
    state.bookings.update(&booking).await?;

    info!(
        booking_id = %booking.id,
        driver_id = ?booking.assigned_driver,
        amount = booking.amount,
        "Assigned driver"
    );
    Ok(Json(populate_one(&state, booking, true).await?))
}

async fn issue_invoice(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    current.require(&BACK_OFFICE)?;
    let mut booking = load_booking(&state, &id).await?;
    if booking.amount <= 0.0 {
        return Err(AppError::ValidationError(
            "Set an amount before issuing an invoice".to_string(),
        ));
    }

    let driver = match booking.assigned_driver {
        Some(driver_id) => state.users.find_by_id(driver_id).await?,
        None => None,
    };
    let invoice = Invoice::from_booking(&booking, driver.as_ref(), Utc::now().date_naive());
    let company = state.company.clone();
    let bytes = render_blocking(move || chauffeur_pdf::render_invoice(&company, &invoice)).await?;

    booking.mark_invoiced();
    state.bookings.update(&booking).await?;

    info!(booking_id = %booking.id, size = bytes.len(), "Issued invoice");
    Ok(pdf_attachment(bytes, &format!("invoice-{}.pdf", booking.id)))
}
