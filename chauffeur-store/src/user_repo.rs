use async_trait::async_trait;
use chauffeur_core::{CoreError, CoreResult, Role, RoleCounts, User, UserRepository, VehicleType};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{is_unique_violation, storage_error};

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone, password_hash, role, \
     vehicle, vehicle_type, availability, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    password_hash: String,
    role: String,
    vehicle: Option<String>,
    vehicle_type: Option<String>,
    availability: Option<bool>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let vehicle_type = row
            .vehicle_type
            .as_deref()
            .map(str::parse::<VehicleType>)
            .transpose()?;
        Ok(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            vehicle: row.vehicle,
            vehicle_type,
            availability: row.availability,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn email_taken(e: sqlx::Error) -> CoreError {
    if is_unique_violation(&e) {
        CoreError::Duplicate("User already exists".to_string())
    } else {
        storage_error(e)
    }
}

fn into_users(rows: Vec<UserRow>) -> CoreResult<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert(&self, user: &User) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, first_name, last_name, email, phone, password_hash, role, \
             vehicle, vehicle_type, availability, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.vehicle)
        .bind(user.vehicle_type.map(|v| v.as_str()))
        .bind(user.availability)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(email_taken)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> CoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ANY($1)",
            USER_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        into_users(rows)
    }

    async fn list(&self, role: Option<Role>) -> CoreResult<Vec<User>> {
        let rows = match role {
            Some(role) => {
                sqlx::query_as::<_, UserRow>(&format!(
                    "SELECT {} FROM users WHERE role = $1 ORDER BY created_at DESC",
                    USER_COLUMNS
                ))
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, UserRow>(&format!(
                    "SELECT {} FROM users ORDER BY created_at DESC",
                    USER_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(storage_error)?;
        into_users(rows)
    }

    async fn update(&self, user: &User) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET first_name = $2, last_name = $3, email = $4, phone = $5, \
             password_hash = $6, role = $7, vehicle = $8, vehicle_type = $9, availability = $10, \
             updated_at = $11 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.vehicle)
        .bind(user.vehicle_type.map(|v| v.as_str()))
        .bind(user.availability)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(email_taken)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn role_counts(&self) -> CoreResult<RoleCounts> {
        #[derive(sqlx::FromRow)]
        struct CountsRow {
            customers: i64,
            admins: i64,
            staff: i64,
            drivers: i64,
            available_drivers: i64,
        }

        let row = sqlx::query_as::<_, CountsRow>(
            "SELECT \
               COUNT(*) FILTER (WHERE role = 'customer') AS customers, \
               COUNT(*) FILTER (WHERE role = 'admin') AS admins, \
               COUNT(*) FILTER (WHERE role = 'staff') AS staff, \
               COUNT(*) FILTER (WHERE role = 'driver') AS drivers, \
               COUNT(*) FILTER (WHERE role = 'driver' AND availability IS TRUE) AS available_drivers \
             FROM users",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(RoleCounts {
            customers: row.customers as u64,
            admins: row.admins as u64,
            staff: row.staff as u64,
            drivers: row.drivers as u64,
            available_drivers: row.available_drivers as u64,
        })
    }
}
