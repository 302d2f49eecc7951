use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use validator::Validate;

use super::deleted;
use crate::db::subjects::SubjectFilter;
use crate::db::{classrooms, departments, programs, subjects};
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

pub async fn list_departments(
    State(state): State<AppState>,
) -> Result<Json<Vec<DepartmentSummary>>, AppError> {
    Ok(Json(departments::fetch_departments(&state.db).await?))
}

pub async fn create_department(
    State(state): State<AppState>,
    Json(req): Json<NewDepartmentRequest>,
) -> Result<(StatusCode, Json<Department>), AppError> {
    req.validate()?;
    let department = departments::insert_department(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDepartmentRequest>,
) -> Result<Json<Department>, AppError> {
    req.validate()?;
    let department = departments::update_department(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(department))
}

pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    deleted(departments::delete_department(&state.db, &id).await?)
}

pub async fn list_programs(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProgramSummary>>, AppError> {
    Ok(Json(programs::fetch_programs(&state.db).await?))
}

pub async fn create_program(
    State(state): State<AppState>,
    Json(req): Json<NewProgramRequest>,
) -> Result<(StatusCode, Json<Program>), AppError> {
    req.validate()?;
    let program = programs::insert_program(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(program)))
}

pub async fn update_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProgramRequest>,
) -> Result<Json<Program>, AppError> {
    req.validate()?;
    let program = programs::update_program(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(program))
}

pub async fn delete_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    deleted(programs::delete_program(&state.db, &id).await?)
}

pub async fn list_subjects(
    State(state): State<AppState>,
    Query(filter): Query<SubjectFilter>,
) -> Result<Json<Page<SubjectDetail>>, AppError> {
    Ok(Json(subjects::list_subjects(&state.db, &filter).await?))
}

pub async fn show_subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubjectDetail>, AppError> {
    let subject = subjects::find_subject_detail(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(subject))
}

pub async fn create_subject(
    State(state): State<AppState>,
    Json(req): Json<NewSubjectRequest>,
) -> Result<(StatusCode, Json<SubjectDetail>), AppError> {
    req.validate()?;
    let subject = subjects::insert_subject(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

pub async fn update_subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSubjectRequest>,
) -> Result<Json<SubjectDetail>, AppError> {
    req.validate()?;
    let subject = subjects::update_subject(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(subject))
}

pub async fn delete_subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    deleted(subjects::delete_subject(&state.db, &id).await?)
}

pub async fn list_classrooms(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassRoom>>, AppError> {
    Ok(Json(classrooms::fetch_classrooms(&state.db).await?))
}

pub async fn create_classroom(
    State(state): State<AppState>,
    Json(req): Json<NewClassRoomRequest>,
) -> Result<(StatusCode, Json<ClassRoom>), AppError> {
    req.validate()?;
    let room = classrooms::insert_classroom(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn update_classroom(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateClassRoomRequest>,
) -> Result<Json<ClassRoom>, AppError> {
    req.validate()?;
    let room = classrooms::update_classroom(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(room))
}

pub async fn delete_classroom(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    deleted(classrooms::delete_classroom(&state.db, &id).await?)
}
