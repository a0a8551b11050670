//! Loads demo accounts and bookings. Safe to re-run: users are matched by
//! email and bookings are only added to a near-empty store.

use anyhow::Context;
use chauffeur_core::{
    password::hash_password, user::normalize_email, Booking, BookingDetails, BookingStatus, Role,
    User, VehicleType,
};
use chauffeur_shared::Masked;
use chauffeur_store::{app_config::Config, Repositories};
use chrono::{Duration, Utc};
use tracing::info;

const DEMO_PASSWORD: &str = "password123";

struct DemoUser {
    first: &'static str,
    last: &'static str,
    email: &'static str,
    phone: &'static str,
    role: Role,
    vehicle: Option<(&'static str, VehicleType, bool)>,
}

const USERS: [DemoUser; 7] = [
    DemoUser {
        first: "Admin",
        last: "User",
        email: "admin@royalchauffeur.example",
        phone: "+973 33692021",
        role: Role::Admin,
        vehicle: None,
    },
    DemoUser {
        first: "John",
        last: "Doe",
        email: "john@example.com",
        phone: "+973 12345678",
        role: Role::Customer,
        vehicle: None,
    },
    DemoUser {
        first: "Fatima",
        last: "Saleh",
        email: "fatima.staff@royalchauffeur.example",
        phone: "+973 36001122",
        role: Role::Staff,
        vehicle: None,
    },
    DemoUser {
        first: "Ali",
        last: "Hassan",
        email: "ali.driver@royalchauffeur.example",
        phone: "+973 33334444",
        role: Role::Driver,
        vehicle: Some(("Toyota Land Cruiser", VehicleType::Suv, true)),
    },
    DemoUser {
        first: "Raj",
        last: "Kumar",
        email: "raj.driver@royalchauffeur.example",
        phone: "+973 55556666",
        role: Role::Driver,
        vehicle: Some(("Mercedes S-Class", VehicleType::Sedan, true)),
    },
    DemoUser {
        first: "Sarah",
        last: "Jones",
        email: "sarah.driver@royalchauffeur.example",
        phone: "+973 77778888",
        role: Role::Driver,
        vehicle: Some(("BMW 7 Series", VehicleType::Sedan, false)),
    },
    DemoUser {
        first: "Mike",
        last: "Smith",
        email: "mike.driver@royalchauffeur.example",
        phone: "+973 99990000",
        role: Role::Driver,
        vehicle: Some(("Toyota Hiace", VehicleType::Minibus, true)),
    },
];

const SERVICES: [&str; 4] = [
    "Airport Transfer",
    "Chauffeur Service",
    "City Tour",
    "Hotel Transfer",
];
const VEHICLES: [&str; 4] = ["Sedan", "SUV", "Minibus", "Coach"];
const BOOKING_COUNT: usize = 20;

async fn seed_users(repos: &Repositories) -> anyhow::Result<Vec<User>> {
    let mut users = Vec::with_capacity(USERS.len());
    for demo in &USERS {
        if let Some(existing) = repos.users.find_by_email(&normalize_email(demo.email)).await? {
            users.push(existing);
            continue;
        }

        let (vehicle, vehicle_type, availability) = match demo.vehicle {
            Some((v, t, a)) => (Some(v.to_string()), Some(t), Some(a)),
            None => (None, None, None),
        };
        let user = User::new(
            demo.first.to_string(),
            demo.last.to_string(),
            demo.email,
            demo.phone.to_string(),
            hash_password(DEMO_PASSWORD)?,
            demo.role,
        )
        .with_vehicle(vehicle, vehicle_type, availability);
        repos.users.insert(&user).await?;
        info!(email = %Masked(&user.email), role = %user.role, "Created user");
        users.push(user);
    }
    Ok(users)
}

/// Spreads bookings over the last and next 30 days, cycling through services,
/// vehicles and drivers so every dashboard bucket gets something.
fn demo_booking(i: usize, customer: &User, drivers: &[&User]) -> anyhow::Result<Booking> {
    let pickup = Utc::now() + Duration::days((i as i64 * 7) % 61 - 30);
    let details: BookingDetails = serde_json::from_value(serde_json::json!({
        "firstName": customer.first_name,
        "lastName": customer.last_name,
        "email": customer.email,
        "countryCode": "+973",
        "contactNumber": customer.phone,
        "service": SERVICES[i % SERVICES.len()],
        "pickupLocation": "Bahrain International Airport",
        "dropLocation": "Four Seasons Hotel",
        "pickupDate": pickup.to_rfc3339(),
        "pickupTime": "14:00",
        "passengers": 1 + i % 3,
        "luggage": 1 + i % 2,
        "vehicle": VEHICLES[i % VEHICLES.len()],
        "vehicleModel": "Standard",
    }))
    .context("demo booking details")?;

    let mut booking = Booking::new(customer.id, details);
    booking.created_at = pickup.min(Utc::now());
    booking.status = if pickup < Utc::now() {
        BookingStatus::Confirmed
    } else {
        [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Cancelled][i % 3]
    };
    let driver = (i % 10 >= 3 && !drivers.is_empty()).then(|| drivers[i % drivers.len()].id);
    booking.assign_driver(driver, Some(20.0 + ((i * 13) % 50) as f64))?;
    if i % 4 == 0 {
        booking.mark_invoiced();
    }
    Ok(booking)
}

async fn seed_bookings(repos: &Repositories, users: &[User]) -> anyhow::Result<()> {
    let existing = repos.bookings.list_all().await?.len();
    if existing >= 5 {
        info!(existing, "Bookings already exist");
        return Ok(());
    }

    let drivers: Vec<&User> = users.iter().filter(|u| u.is_driver()).collect();
    let customers: Vec<&User> = users
        .iter()
        .filter(|u| matches!(u.role, Role::Customer | Role::Admin))
        .collect();
    anyhow::ensure!(!customers.is_empty(), "no customer accounts to book for");

    for i in 0..BOOKING_COUNT {
        let booking = demo_booking(i, customers[i % customers.len()], &drivers)?;
        repos.bookings.insert(&booking).await?;
    }
    info!(count = BOOKING_COUNT, "Created bookings");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,chauffeur_store=info".into()),
        )
        .init();

    let config = Config::load().context("Failed to load config")?;
    if config.database.is_memory() {
        anyhow::bail!("database.url is memory://; seeding would be lost on exit");
    }
    let repos = chauffeur_store::connect(&config.database).await?;

    let users = seed_users(&repos).await?;
    seed_bookings(&repos, &users).await?;
    info!("Seed complete");
    Ok(())
}
