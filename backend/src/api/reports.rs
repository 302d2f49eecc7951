use axum::Json;
use axum::extract::{Query, State};
use axum::response::Response;
use chrono::Local;

use super::{csv_response, pdf_response};
use crate::db::sessions::ScheduleFilter;
use crate::db::stats::DateRange;
use crate::error::AppError;
use crate::services::{DashboardStats, Report, dashboard, export, report_pdf};
use crate::state::AppState;

pub async fn show_dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let today = Local::now().date_naive();
    Ok(Json(dashboard::dashboard(&state.db, today).await?))
}

pub async fn report(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Result<Json<Report>, AppError> {
    Ok(Json(dashboard::report(&state.db, range).await?))
}

pub async fn export_attendance(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Result<Response, AppError> {
    csv_response(export::attendance_csv(&state.db, range).await?)
}

pub async fn export_teachers(State(state): State<AppState>) -> Result<Response, AppError> {
    csv_response(export::teachers_csv(&state.db).await?)
}

pub async fn export_schedule(
    State(state): State<AppState>,
    Query(filter): Query<ScheduleFilter>,
) -> Result<Response, AppError> {
    csv_response(export::schedule_csv(&state.db, &filter).await?)
}

pub async fn export_teacher_details(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Result<Response, AppError> {
    csv_response(export::teacher_details_csv(&state.db, range).await?)
}

pub async fn export_report_pdf(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Result<Response, AppError> {
    pdf_response(report_pdf::faculty_report_pdf(&state.db, range).await?)
}
