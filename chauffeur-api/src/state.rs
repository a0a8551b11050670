use chauffeur_core::{BookingRepository, Company, UserRepository};
use chauffeur_store::Repositories;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub auth: AuthConfig,
    pub company: Arc<Company>,
}

impl AppState {
    pub fn new(repos: Repositories, auth: AuthConfig, company: Company) -> Self {
        Self {
            users: repos.users,
            bookings: repos.bookings,
            auth,
            company: Arc::new(company),
        }
    }
}
