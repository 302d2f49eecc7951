mod attendance;
mod catalog;
mod reports;
mod sessions;
mod teachers;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Router, extract::State};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::services::{CsvExport, PdfExport};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/teachers", get(teachers::list).post(teachers::create))
        .route("/teachers/active", get(teachers::active))
        .route(
            "/teachers/{id}",
            get(teachers::show).patch(teachers::update).delete(teachers::remove),
        )
        .route("/teachers/{id}/subjects", get(teachers::subjects))
        .route("/teachers/{id}/summary", get(teachers::summary))
        .route("/teachers/{id}/export.csv", get(teachers::export_csv))
        .route(
            "/departments",
            get(catalog::list_departments).post(catalog::create_department),
        )
        .route(
            "/departments/{id}",
            patch(catalog::update_department).delete(catalog::delete_department),
        )
        .route("/programs", get(catalog::list_programs).post(catalog::create_program))
        .route(
            "/programs/{id}",
            patch(catalog::update_program).delete(catalog::delete_program),
        )
        .route("/subjects", get(catalog::list_subjects).post(catalog::create_subject))
        .route(
            "/subjects/{id}",
            get(catalog::show_subject)
                .patch(catalog::update_subject)
                .delete(catalog::delete_subject),
        )
        .route(
            "/classrooms",
            get(catalog::list_classrooms).post(catalog::create_classroom),
        )
        .route(
            "/classrooms/{id}",
            patch(catalog::update_classroom).delete(catalog::delete_classroom),
        )
        .route("/sessions", get(sessions::list).post(sessions::create))
        .route("/sessions/check-conflicts", get(sessions::check_conflicts))
        .route(
            "/sessions/{id}",
            get(sessions::show).patch(sessions::update).delete(sessions::remove),
        )
        .route("/attendance", get(attendance::list).post(attendance::create))
        .route(
            "/attendance/{id}",
            patch(attendance::update).delete(attendance::remove),
        )
        .route("/dashboard", get(reports::show_dashboard))
        .route("/reports", get(reports::report))
        .route("/reports/export/attendance.csv", get(reports::export_attendance))
        .route("/reports/export/teachers.csv", get(reports::export_teachers))
        .route("/reports/export/schedule.csv", get(reports::export_schedule))
        .route(
            "/reports/export/teacher-details.csv",
            get(reports::export_teacher_details),
        )
        .route("/reports/export/report.pdf", get(reports::export_report_pdf))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

fn deleted(found: bool) -> Result<StatusCode, AppError> {
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

fn attachment(
    content_type: &'static str,
    filename: &str,
    body: impl IntoResponse,
) -> Result<Response, AppError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|_| AppError::InternalServerError)?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

fn csv_response(export: CsvExport) -> Result<Response, AppError> {
    attachment("text/csv; charset=utf-8", &export.filename, export.body)
}

fn pdf_response(export: PdfExport) -> Result<Response, AppError> {
    attachment("application/pdf", &export.filename, export.body)
}
