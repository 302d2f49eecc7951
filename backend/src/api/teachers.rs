use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use validator::Validate;

use super::{csv_response, deleted};
use crate::db::stats::DateRange;
use crate::db::teachers::TeacherFilter;
use crate::db::{sessions, stats, teachers};
use crate::error::AppError;
use crate::models::*;
use crate::services::export;
use crate::state::AppState;

const RECENT_SESSIONS: i64 = 10;

#[derive(Debug, Serialize)]
pub struct TeacherSummary {
    #[serde(flatten)]
    pub teacher: Teacher,
    pub total_hours: f64,
    pub session_count: i64,
    pub subjects: Vec<TeacherSubject>,
    pub recent_sessions: Vec<SessionListItem>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<TeacherFilter>,
) -> Result<Json<Page<Teacher>>, AppError> {
    let page = teachers::list_teachers(&state.db, &filter).await?;
    Ok(Json(page))
}

pub async fn active(State(state): State<AppState>) -> Result<Json<Vec<TeacherOption>>, AppError> {
    let options = teachers::fetch_active_teachers(&state.db)
        .await?
        .into_iter()
        .map(|t| TeacherOption {
            name: t.full_name(),
            id: t.id,
            email: t.email,
            specialization: t.specialization,
        })
        .collect();
    Ok(Json(options))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<NewTeacherRequest>,
) -> Result<(StatusCode, Json<Teacher>), AppError> {
    req.validate()?;
    let teacher = teachers::insert_teacher(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Teacher>, AppError> {
    let teacher = teachers::find_teacher_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(teacher))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTeacherRequest>,
) -> Result<Json<Teacher>, AppError> {
    req.validate()?;
    let teacher = teachers::update_teacher(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(teacher))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    deleted(teachers::delete_teacher(&state.db, &id).await?)
}

pub async fn subjects(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TeacherSubject>>, AppError> {
    if teachers::find_teacher_by_id(&state.db, &id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let subjects = teachers::fetch_teacher_subjects(&state.db, &id).await?;
    Ok(Json(subjects))
}

pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TeacherSummary>, AppError> {
    let teacher = teachers::find_teacher_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    let workload = stats::fetch_teacher_workload(&state.db, &id).await?;
    let subjects = teachers::fetch_teacher_subjects(&state.db, &id).await?;
    let recent_sessions = sessions::fetch_teacher_sessions(&state.db, &id, RECENT_SESSIONS).await?;

    Ok(Json(TeacherSummary {
        teacher,
        total_hours: workload.as_ref().map_or(0.0, |w| w.total_hours),
        session_count: workload.as_ref().map_or(0, |w| w.session_count),
        subjects,
        recent_sessions,
    }))
}

pub async fn export_csv(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(range): Query<DateRange>,
) -> Result<Response, AppError> {
    let csv = export::teacher_csv(&state.db, &id, range)
        .await?
        .ok_or(AppError::NotFound)?;
    csv_response(csv)
}
