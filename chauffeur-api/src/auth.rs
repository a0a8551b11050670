use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chauffeur_core::{
    password::{hash_password, verify_password},
    user::normalize_email,
    PublicUser, Role, User, UserUpdate, VehicleType,
};
use chauffeur_shared::{serde_helpers::empty_string_as_none, Masked};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::middleware::auth::{
    authenticate, bearer_token, issue_token, require_admin, require_back_office, resolve_user,
    CurrentUser,
};
use crate::reports::dashboard_stats;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// Unknown roles fall back to customer.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<VehicleType>,
    #[serde(default)]
    pub availability: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Profile or admin edit: the usual user fields plus an optional new password.
#[derive(Debug, Deserialize, Validate)]
pub struct UserChangeRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub changes: UserUpdate,
    /// Blank means keep the current password.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub vehicle: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub availability: Option<bool>,
    pub token: String,
}

impl AuthResponse {
    fn new(state: &AppState, user: &User) -> Result<Self, AppError> {
        Ok(Self {
            id: user.id,
            name: user.full_name(),
            email: user.email.clone(),
            role: user.role,
            vehicle: user.vehicle.clone(),
            vehicle_type: user.vehicle_type,
            availability: user.availability,
            token: issue_token(&state.auth, user)?,
        })
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/stats", get(dashboard_stats))
        .route_layer(middleware::from_fn(require_admin));

    let protected = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route(
            "/drivers",
            get(list_drivers).route_layer(middleware::from_fn(require_back_office)),
        )
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFoundError(format!("{} not found", what)))
}

async fn load_user(state: &AppState, raw_id: &str) -> Result<User, AppError> {
    let id = parse_id(raw_id, "User")?;
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))
}

/// Applies an edit, hashing the new password if one was given.
fn apply_changes(user: &mut User, req: UserChangeRequest) -> Result<(), AppError> {
    user.apply_update(req.changes);
    if let Some(password) = req.password {
        user.password_hash = hash_password(&password)?;
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let email = normalize_email(&req.email);
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::ValidationError("User already exists".to_string()));
    }

    // Only an admin may hand out a role other than customer.
    let caller_is_admin = match bearer_token(&headers) {
        Some(_) => resolve_user(&state, &headers)
            .await
            .map(|u| u.role == Role::Admin)
            .unwrap_or(false),
        None => false,
    };
    let role = if caller_is_admin {
        req.role
            .as_deref()
            .and_then(|r| r.parse::<Role>().ok())
            .unwrap_or_default()
    } else {
        Role::Customer
    };

    let password_hash = hash_password(&req.password)?;
    let user = User::new(
        req.first_name,
        req.last_name,
        &email,
        req.phone,
        password_hash,
        role,
    )
    .with_vehicle(req.vehicle, req.vehicle_type, req.availability);
    state.users.insert(&user).await?;

    info!(user_id = %user.id, email = %Masked(&user.email), role = %user.role, "Registered user");
    Ok((StatusCode::CREATED, Json(AuthResponse::new(&state, &user)?)))
}

async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::AuthenticationError("Invalid email or password".to_string());

    let user = state
        .users
        .find_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash) {
        info!(email = %Masked(&user.email), "Rejected login");
        return Err(invalid());
    }

    Ok(Json(AuthResponse::new(&state, &user)?))
}

async fn get_profile(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<PublicUser> {
    Json(user.public())
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(mut user)): Extension<CurrentUser>,
    ValidatedJson(mut req): ValidatedJson<UserChangeRequest>,
) -> Result<Json<PublicUser>, AppError> {
    // Roles are changed by admins only.
    req.changes.role = None;
    apply_changes(&mut user, req)?;
    state.users.update(&user).await?;
    Ok(Json(user.public()))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = state.users.list(None).await?;
    Ok(Json(users.iter().map(User::public).collect()))
}

async fn list_drivers(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, AppError> {
    let drivers = state.users.list(Some(Role::Driver)).await?;
    Ok(Json(drivers.iter().map(User::public).collect()))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, AppError> {
    Ok(Json(load_user(&state, &id).await?.public()))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UserChangeRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let mut user = load_user(&state, &id).await?;
    let previous_role = user.role;
    apply_changes(&mut user, req)?;
    state.users.update(&user).await?;

    if previous_role == Role::Driver && user.role != Role::Driver {
        let cleared = state.bookings.clear_driver(user.id).await?;
        info!(user_id = %user.id, cleared, "Driver demoted; bookings unassigned");
    }
    Ok(Json(user.public()))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = load_user(&state, &id).await?;
    if user.id == admin.id {
        return Err(AppError::ValidationError(
            "You cannot delete your own account".to_string(),
        ));
    }

    let removed_bookings = state.bookings.delete_for_user(user.id).await?;
    let unassigned = state.bookings.clear_driver(user.id).await?;
    state.users.delete(user.id).await?;

    info!(
        user_id = %user.id,
        removed_bookings,
        unassigned,
        "Deleted user"
    );
    Ok(Json(json!({ "message": "User removed" })))
}
