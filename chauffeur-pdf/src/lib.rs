//! Invoice and period-report rendering.
//!
//! Rendering is synchronous CPU work; async callers should run it on a
//! blocking thread.

mod invoice;
mod layout;
mod report;

use thiserror::Error;

pub use invoice::render_invoice;
pub use report::render_report;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to render PDF: {0}")]
    Render(String),
}

pub type PdfResult<T> = Result<T, PdfError>;
