use axum::{
    extract::{Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chauffeur_core::{DashboardStats, PeriodReport, ReportPeriod, Role};
use chauffeur_pdf::PdfResult;
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// `YYYY-MM`
    pub month: Option<String>,
    pub year: Option<String>,
}

pub fn pdf_attachment(bytes: Vec<u8>, file_name: &str) -> Response {
    (
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Runs a PDF renderer off the async workers.
pub async fn render_blocking<F>(render: F) -> Result<Vec<u8>, AppError>
where
    F: FnOnce() -> PdfResult<Vec<u8>> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(render).await??)
}

pub async fn period_report(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    current.require(&[Role::Admin, Role::Staff])?;
    let period = ReportPeriod::parse(
        query.kind.as_deref(),
        query.month.as_deref(),
        query.year.as_deref(),
    )?;

    let (from, to) = period.range();
    let bookings = state.bookings.list_created_between(from, to).await?;
    let report = PeriodReport::build(period, &bookings);
    info!(
        period = %period.label(),
        bookings = report.total_bookings,
        revenue = report.total_revenue,
        "Generating booking report"
    );

    let company = state.company.clone();
    let bytes = render_blocking(move || chauffeur_pdf::render_report(&company, &report)).await?;
    Ok(pdf_attachment(bytes, &format!("report-{}.pdf", period.slug())))
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    let roles = state.users.role_counts().await?;
    let statuses = state.bookings.status_summary().await?;
    Ok(Json(DashboardStats::new(roles, statuses)))
}
