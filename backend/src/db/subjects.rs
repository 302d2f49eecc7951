use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{new_id, now, page_offset, push_clause};
use crate::error::{AppError, unique_violation};
use crate::models::{
    NewSubjectRequest, Page, Subject, SubjectDetail, SubjectType, UpdateSubjectRequest,
};

pub const SUBJECTS_PER_PAGE: i64 = 20;

const SUBJECT_COLUMNS: &str = "s.id, s.code, s.name, s.description, s.program_id, s.subject_type, \
     s.semester, s.credits, s.total_hours, s.is_active, s.created_at, s.updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectFilter {
    pub search: Option<String>,
    pub program_id: Option<String>,
    pub semester: Option<i64>,
    pub page: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct SubjectRow {
    #[sqlx(flatten)]
    subject: Subject,
    program_name: String,
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &SubjectFilter) {
    let mut has_clause = false;
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        push_clause(builder, &mut has_clause);
        builder
            .push("(s.code LIKE ")
            .push_bind(pattern.clone())
            .push(" OR s.name LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(program_id) = filter.program_id.clone() {
        push_clause(builder, &mut has_clause);
        builder.push("s.program_id = ").push_bind(program_id);
    }
    if let Some(semester) = filter.semester {
        push_clause(builder, &mut has_clause);
        builder.push("s.semester = ").push_bind(semester);
    }
}

async fn teacher_ids_for(db: &SqlitePool, subject_id: &str) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT teacher_id FROM subject_teachers WHERE subject_id = ? ORDER BY teacher_id",
    )
    .bind(subject_id)
    .fetch_all(db)
    .await
}

async fn into_detail(db: &SqlitePool, row: SubjectRow) -> Result<SubjectDetail, sqlx::Error> {
    let teacher_ids = teacher_ids_for(db, &row.subject.id).await?;
    Ok(SubjectDetail {
        subject: row.subject,
        program_name: row.program_name,
        teacher_ids,
    })
}

pub async fn list_subjects(
    db: &SqlitePool,
    filter: &SubjectFilter,
) -> Result<Page<SubjectDetail>, sqlx::Error> {
    let (page, offset) = page_offset(filter.page, SUBJECTS_PER_PAGE);

    let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM subjects s");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {}, p.name AS program_name FROM subjects s JOIN programs p ON p.id = s.program_id",
        SUBJECT_COLUMNS
    ));
    push_filters(&mut builder, filter);
    builder
        .push(" ORDER BY p.name, s.semester, s.code LIMIT ")
        .push_bind(SUBJECTS_PER_PAGE)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows = builder.build_query_as::<SubjectRow>().fetch_all(db).await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(into_detail(db, row).await?);
    }

    Ok(Page {
        items,
        page,
        per_page: SUBJECTS_PER_PAGE,
        total,
    })
}

pub async fn fetch_active_subjects(db: &SqlitePool) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {} FROM subjects s WHERE s.is_active = 1 ORDER BY s.code",
        SUBJECT_COLUMNS
    ))
    .fetch_all(db)
    .await
}

pub async fn find_subject_by_id(db: &SqlitePool, id: &str) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {} FROM subjects s WHERE s.id = ?",
        SUBJECT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_subject_detail(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<SubjectDetail>, sqlx::Error> {
    let row = sqlx::query_as::<_, SubjectRow>(&format!(
        "SELECT {}, p.name AS program_name FROM subjects s JOIN programs p ON p.id = s.program_id WHERE s.id = ?",
        SUBJECT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;

    match row {
        Some(row) => Ok(Some(into_detail(db, row).await?)),
        None => Ok(None),
    }
}

async fn ensure_unique_code(
    db: &SqlitePool,
    code: &str,
    program_id: &str,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let program_name: Option<String> = sqlx::query_scalar("SELECT name FROM programs WHERE id = ?")
        .bind(program_id)
        .fetch_optional(db)
        .await?;
    let Some(program_name) = program_name else {
        return Err(AppError::BadRequest(format!("program {} does not exist", program_id)));
    };

    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM subjects WHERE code = ?1 AND program_id = ?2 AND (?3 IS NULL OR id != ?3))",
    )
    .bind(code)
    .bind(program_id)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;
    if taken {
        return Err(AppError::Conflict(format!(
            "A subject with code '{}' already exists in {}.",
            code, program_name
        )));
    }
    Ok(())
}

async fn ensure_active_teachers(db: &SqlitePool, teacher_ids: &[String]) -> Result<(), AppError> {
    for teacher_id in teacher_ids {
        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM teachers WHERE id = ? AND status = 'active')",
        )
        .bind(teacher_id)
        .fetch_one(db)
        .await?;
        if !active {
            return Err(AppError::BadRequest(format!(
                "teacher {} does not exist or is not active",
                teacher_id
            )));
        }
    }
    Ok(())
}

/// Replaces the teacher assignments of a subject.
async fn assign_teachers(
    db: &SqlitePool,
    subject_id: &str,
    teacher_ids: &[String],
) -> Result<(), AppError> {
    let mut tx = db.begin().await?;
    sqlx::query("DELETE FROM subject_teachers WHERE subject_id = ?")
        .bind(subject_id)
        .execute(&mut *tx)
        .await?;
    for teacher_id in teacher_ids {
        sqlx::query("INSERT OR IGNORE INTO subject_teachers (subject_id, teacher_id) VALUES (?, ?)")
            .bind(subject_id)
            .bind(teacher_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn insert_subject(db: &SqlitePool, req: NewSubjectRequest) -> Result<SubjectDetail, AppError> {
    let code = req.code.trim().to_uppercase();
    ensure_unique_code(db, &code, &req.program_id, None).await?;
    ensure_active_teachers(db, &req.teacher_ids).await?;

    let now = now();
    let subject = Subject {
        id: new_id(),
        code,
        name: req.name,
        description: req.description,
        program_id: req.program_id,
        subject_type: req.subject_type.unwrap_or(SubjectType::Theory),
        semester: req.semester.unwrap_or(1),
        credits: req.credits.unwrap_or(1),
        total_hours: req.total_hours.unwrap_or(1.0),
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO subjects
            (id, code, name, description, program_id, subject_type, semester, credits,
            total_hours, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&subject.id)
    .bind(&subject.code)
    .bind(&subject.name)
    .bind(&subject.description)
    .bind(&subject.program_id)
    .bind(subject.subject_type)
    .bind(subject.semester)
    .bind(subject.credits)
    .bind(subject.total_hours)
    .bind(subject.is_active)
    .bind(&subject.created_at)
    .bind(&subject.updated_at)
    .execute(db)
    .await
    .map_err(|e| unique_violation(e, "A subject with this code already exists in the program."))?;

    assign_teachers(db, &subject.id, &req.teacher_ids).await?;

    find_subject_detail(db, &subject.id)
        .await?
        .ok_or(AppError::InternalServerError)
}

pub async fn update_subject(
    db: &SqlitePool,
    id: &str,
    req: UpdateSubjectRequest,
) -> Result<Option<SubjectDetail>, AppError> {
    let mut current = match find_subject_by_id(db, id).await? {
        Some(s) => s,
        None => return Ok(None),
    };

    if let Some(code) = req.code {
        current.code = code.trim().to_uppercase();
    }
    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(program_id) = req.program_id {
        current.program_id = program_id;
    }
    if let Some(description) = req.description {
        current.description = description;
    }
    if let Some(subject_type) = req.subject_type {
        current.subject_type = subject_type;
    }
    if let Some(semester) = req.semester {
        current.semester = semester;
    }
    if let Some(credits) = req.credits {
        current.credits = credits;
    }
    if let Some(total_hours) = req.total_hours {
        current.total_hours = total_hours;
    }
    if let Some(is_active) = req.is_active {
        current.is_active = is_active;
    }

    ensure_unique_code(db, &current.code, &current.program_id, Some(id)).await?;
    if let Some(teacher_ids) = &req.teacher_ids {
        ensure_active_teachers(db, teacher_ids).await?;
    }
    current.updated_at = now();

    sqlx::query(
        r#"
        UPDATE subjects
        SET code = ?, name = ?, description = ?, program_id = ?, subject_type = ?,
            semester = ?, credits = ?, total_hours = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&current.code)
    .bind(&current.name)
    .bind(&current.description)
    .bind(&current.program_id)
    .bind(current.subject_type)
    .bind(current.semester)
    .bind(current.credits)
    .bind(current.total_hours)
    .bind(current.is_active)
    .bind(&current.updated_at)
    .bind(id)
    .execute(db)
    .await
    .map_err(|e| unique_violation(e, "A subject with this code already exists in the program."))?;

    if let Some(teacher_ids) = req.teacher_ids {
        assign_teachers(db, id, &teacher_ids).await?;
    }

    Ok(find_subject_detail(db, id).await?)
}

pub async fn delete_subject(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}
