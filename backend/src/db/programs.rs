use sqlx::SqlitePool;

use crate::db::{new_id, now};
use crate::error::{AppError, unique_violation};
use crate::models::program::check_program_dates;
use crate::models::{NewProgramRequest, Program, ProgramSummary, ProgramType, UpdateProgramRequest};

const PROGRAM_COLUMNS: &str = "id, name, code, program_type, duration_years, start_date, end_date, \
     description, is_active, created_at, updated_at";

pub async fn fetch_programs(db: &SqlitePool) -> Result<Vec<ProgramSummary>, sqlx::Error> {
    sqlx::query_as::<_, ProgramSummary>(
        r#"
        SELECT p.id, p.name, p.code, p.program_type, p.is_active, COUNT(s.id) AS total_subjects
        FROM programs p
        LEFT JOIN subjects s ON s.program_id = p.id
        GROUP BY p.id
        ORDER BY p.name
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn find_program_by_id(db: &SqlitePool, id: &str) -> Result<Option<Program>, sqlx::Error> {
    sqlx::query_as::<_, Program>(&format!("SELECT {} FROM programs WHERE id = ?", PROGRAM_COLUMNS))
        .bind(id)
        .fetch_optional(db)
        .await
}

async fn ensure_unique(
    db: &SqlitePool,
    name: &str,
    code: &str,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let code_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM programs WHERE code = ?1 COLLATE NOCASE AND (?2 IS NULL OR id != ?2))",
    )
    .bind(code)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;
    if code_taken {
        return Err(AppError::Conflict(
            "A program with this code already exists.".to_string(),
        ));
    }

    let name_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM programs WHERE name = ?1 COLLATE NOCASE AND (?2 IS NULL OR id != ?2))",
    )
    .bind(name)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;
    if name_taken {
        return Err(AppError::Conflict(
            "A program with this name already exists.".to_string(),
        ));
    }
    Ok(())
}

pub async fn insert_program(db: &SqlitePool, req: NewProgramRequest) -> Result<Program, AppError> {
    check_program_dates(req.start_date, req.end_date).map_err(AppError::BadRequest)?;
    let code = req.code.trim().to_uppercase();
    let name = req.name.trim().to_string();
    ensure_unique(db, &name, &code, None).await?;

    let now = now();
    let program = Program {
        id: new_id(),
        name,
        code,
        program_type: req.program_type.unwrap_or(ProgramType::Others),
        duration_years: req.duration_years.unwrap_or(4),
        start_date: req.start_date,
        end_date: req.end_date,
        description: req.description,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(&format!(
        "INSERT INTO programs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        PROGRAM_COLUMNS
    ))
    .bind(&program.id)
    .bind(&program.name)
    .bind(&program.code)
    .bind(program.program_type)
    .bind(program.duration_years)
    .bind(program.start_date)
    .bind(program.end_date)
    .bind(&program.description)
    .bind(program.is_active)
    .bind(&program.created_at)
    .bind(&program.updated_at)
    .execute(db)
    .await
    .map_err(|e| unique_violation(e, "A program with this name or code already exists."))?;

    Ok(program)
}

pub async fn update_program(
    db: &SqlitePool,
    id: &str,
    req: UpdateProgramRequest,
) -> Result<Option<Program>, AppError> {
    let mut current = match find_program_by_id(db, id).await? {
        Some(p) => p,
        None => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name.trim().to_string();
    }
    if let Some(code) = req.code {
        current.code = code.trim().to_uppercase();
    }
    if let Some(program_type) = req.program_type {
        current.program_type = program_type;
    }
    if let Some(duration_years) = req.duration_years {
        current.duration_years = duration_years;
    }
    if req.start_date.is_some() {
        current.start_date = req.start_date;
    }
    if req.end_date.is_some() {
        current.end_date = req.end_date;
    }
    if let Some(description) = req.description {
        current.description = description;
    }
    if let Some(is_active) = req.is_active {
        current.is_active = is_active;
    }

    check_program_dates(current.start_date, current.end_date).map_err(AppError::BadRequest)?;
    ensure_unique(db, &current.name, &current.code, Some(id)).await?;
    current.updated_at = now();

    sqlx::query(
        r#"
        UPDATE programs
        SET name = ?, code = ?, program_type = ?, duration_years = ?, start_date = ?,
            end_date = ?, description = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&current.name)
    .bind(&current.code)
    .bind(current.program_type)
    .bind(current.duration_years)
    .bind(current.start_date)
    .bind(current.end_date)
    .bind(&current.description)
    .bind(current.is_active)
    .bind(&current.updated_at)
    .bind(id)
    .execute(db)
    .await
    .map_err(|e| unique_violation(e, "A program with this name or code already exists."))?;

    Ok(Some(current))
}

/// Deleting a program removes its subjects and their sessions.
pub async fn delete_program(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM programs WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}
