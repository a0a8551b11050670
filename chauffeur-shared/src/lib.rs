pub mod pii;
pub mod serde_helpers;

pub use pii::Masked;
