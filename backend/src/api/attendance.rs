use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use validator::Validate;

use super::deleted;
use crate::db::attendance::{self, AttendanceFilter};
use crate::error::AppError;
use crate::models::{Attendance, NewAttendanceRequest, Page, UpdateAttendanceRequest};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<AttendanceFilter>,
) -> Result<Json<Page<Attendance>>, AppError> {
    Ok(Json(attendance::list_attendance(&state.db, &filter).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<NewAttendanceRequest>,
) -> Result<(StatusCode, Json<Attendance>), AppError> {
    req.validate()?;
    let record = attendance::insert_attendance(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAttendanceRequest>,
) -> Result<Json<Attendance>, AppError> {
    req.validate()?;
    let record = attendance::update_attendance(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(record))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    deleted(attendance::delete_attendance(&state.db, &id).await?)
}
