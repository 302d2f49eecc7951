use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use validator::Validate;

use super::deleted;
use crate::conflict::{ConflictParams, ConflictResponse, check_lenient};
use crate::db::sessions::{self, SessionFilter};
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<SessionFilter>,
) -> Result<Json<Page<SessionListItem>>, AppError> {
    Ok(Json(sessions::list_sessions(&state.db, &filter).await?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, AppError> {
    let session = sessions::find_session_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(session))
}

/// Double bookings are refused with 409 and a message naming the clash.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<NewSessionRequest>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    req.validate()?;
    let session = sessions::insert_session(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<Session>, AppError> {
    req.validate()?;
    let session = sessions::update_session(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(session))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    deleted(sessions::delete_session(&state.db, &id).await?)
}

/// Advisory pre-submit check. Always answers 200.
pub async fn check_conflicts(
    State(state): State<AppState>,
    Query(params): Query<ConflictParams>,
) -> Json<ConflictResponse> {
    Json(check_lenient(&state.db, &params).await)
}
