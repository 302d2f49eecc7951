use sqlx::SqlitePool;

use crate::db::{new_id, now};
use crate::error::{AppError, unique_violation};
use crate::models::{Department, DepartmentSummary, NewDepartmentRequest, UpdateDepartmentRequest};

const DUPLICATE_NAME: &str = "A department with this name already exists.";

pub async fn fetch_departments(db: &SqlitePool) -> Result<Vec<DepartmentSummary>, sqlx::Error> {
    sqlx::query_as::<_, DepartmentSummary>(
        r#"
        SELECT d.id, d.name, d.description, d.is_active, COUNT(t.id) AS teacher_count
        FROM departments d
        LEFT JOIN teachers t ON t.department_id = d.id
        GROUP BY d.id
        ORDER BY d.name
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn find_department_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>(
        "SELECT id, name, description, is_active, created_at, updated_at FROM departments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_department(
    db: &SqlitePool,
    req: NewDepartmentRequest,
) -> Result<Department, AppError> {
    let now = now();
    let department = Department {
        id: new_id(),
        name: req.name.trim().to_string(),
        description: req.description,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO departments (id, name, description, is_active, created_at, updated_at)
        VALUES (?1, ?2, ?3, 1, ?4, ?5)
        "#,
    )
    .bind(&department.id)
    .bind(&department.name)
    .bind(&department.description)
    .bind(&department.created_at)
    .bind(&department.updated_at)
    .execute(db)
    .await
    .map_err(|e| unique_violation(e, DUPLICATE_NAME))?;

    Ok(department)
}

pub async fn update_department(
    db: &SqlitePool,
    id: &str,
    req: UpdateDepartmentRequest,
) -> Result<Option<Department>, AppError> {
    let mut current = match find_department_by_id(db, id).await? {
        Some(d) => d,
        None => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name.trim().to_string();
    }
    if let Some(description) = req.description {
        current.description = description;
    }
    if let Some(is_active) = req.is_active {
        current.is_active = is_active;
    }
    current.updated_at = now();

    sqlx::query(
        "UPDATE departments SET name = ?, description = ?, is_active = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&current.name)
    .bind(&current.description)
    .bind(current.is_active)
    .bind(&current.updated_at)
    .bind(id)
    .execute(db)
    .await
    .map_err(|e| unique_violation(e, DUPLICATE_NAME))?;

    Ok(Some(current))
}

/// Teachers in the department keep their record with no department.
pub async fn delete_department(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}
