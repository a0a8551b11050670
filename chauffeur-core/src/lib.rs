pub mod booking;
pub mod invoice;
pub mod password;
pub mod report;
pub mod repository;
pub mod user;

pub use booking::{Booking, BookingDetails, BookingStatus, BookingUpdate, TripType};
pub use invoice::{Company, Invoice};
pub use report::{DashboardStats, PeriodReport, ReportPeriod, RoleCounts, StatusSummary};
pub use repository::{BookingRepository, UserRepository};
pub use user::{PublicUser, Role, User, UserSummary, UserUpdate, VehicleType};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::ValidationError(errors.to_string())
    }
}
