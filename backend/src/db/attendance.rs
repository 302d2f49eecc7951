use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{new_id, now, page_offset, push_clause, sessions, teachers};
use crate::error::AppError;
use crate::models::{
    Attendance, AttendanceExportRow, AttendanceStatus, NewAttendanceRequest, Page,
    UpdateAttendanceRequest,
};

pub const ATTENDANCE_PER_PAGE: i64 = 20;
pub const EXPORT_ROW_LIMIT: i64 = 500;

const ATTENDANCE_COLUMNS: &str = "id, session_id, teacher_id, date, status, check_in_time, \
     check_out_time, actual_duration, notes, created_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceFilter {
    pub teacher_id: Option<String>,
    pub session_id: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<i64>,
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &AttendanceFilter, alias: &str) {
    let mut has_clause = false;
    if let Some(teacher_id) = filter.teacher_id.clone() {
        push_clause(builder, &mut has_clause);
        builder.push(format!("{}.teacher_id = ", alias)).push_bind(teacher_id);
    }
    if let Some(session_id) = filter.session_id.clone() {
        push_clause(builder, &mut has_clause);
        builder.push(format!("{}.session_id = ", alias)).push_bind(session_id);
    }
    if let Some(status) = filter.status {
        push_clause(builder, &mut has_clause);
        builder.push(format!("{}.status = ", alias)).push_bind(status);
    }
    if let Some(start) = filter.start_date {
        push_clause(builder, &mut has_clause);
        builder.push(format!("{}.date >= ", alias)).push_bind(start);
    }
    if let Some(end) = filter.end_date {
        push_clause(builder, &mut has_clause);
        builder.push(format!("{}.date <= ", alias)).push_bind(end);
    }
}

pub async fn list_attendance(
    db: &SqlitePool,
    filter: &AttendanceFilter,
) -> Result<Page<Attendance>, sqlx::Error> {
    let (page, offset) = page_offset(filter.page, ATTENDANCE_PER_PAGE);

    let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM attendance a");
    push_filters(&mut count, filter, "a");
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM attendance a",
        ATTENDANCE_COLUMNS
    ));
    push_filters(&mut builder, filter, "a");
    builder
        .push(" ORDER BY a.date DESC, a.created_at DESC LIMIT ")
        .push_bind(ATTENDANCE_PER_PAGE)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = builder.build_query_as::<Attendance>().fetch_all(db).await?;

    Ok(Page {
        items,
        page,
        per_page: ATTENDANCE_PER_PAGE,
        total,
    })
}

async fn fetch_joined_rows(
    db: &SqlitePool,
    filter: &AttendanceFilter,
    limit: i64,
) -> Result<Vec<AttendanceExportRow>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT a.date, t.first_name AS teacher_first_name, t.last_name AS teacher_last_name, \
         t.employee_id, sub.name AS subject_name, s.date AS session_date, a.status, \
         a.check_in_time, a.check_out_time, a.notes \
         FROM attendance a \
         JOIN teachers t ON t.id = a.teacher_id \
         LEFT JOIN sessions s ON s.id = a.session_id \
         LEFT JOIN subjects sub ON sub.id = s.subject_id",
    );
    push_filters(&mut builder, filter, "a");
    builder
        .push(" ORDER BY a.date DESC, a.created_at DESC LIMIT ")
        .push_bind(limit);
    builder.build_query_as::<AttendanceExportRow>().fetch_all(db).await
}

/// Newest first, capped at [`EXPORT_ROW_LIMIT`].
pub async fn fetch_export_rows(
    db: &SqlitePool,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Vec<AttendanceExportRow>, sqlx::Error> {
    let filter = AttendanceFilter {
        start_date,
        end_date,
        ..Default::default()
    };
    fetch_joined_rows(db, &filter, EXPORT_ROW_LIMIT).await
}

/// The latest `limit` records of one teacher.
pub async fn fetch_teacher_records(
    db: &SqlitePool,
    teacher_id: &str,
    limit: i64,
) -> Result<Vec<AttendanceExportRow>, sqlx::Error> {
    let filter = AttendanceFilter {
        teacher_id: Some(teacher_id.to_string()),
        ..Default::default()
    };
    fetch_joined_rows(db, &filter, limit).await
}

pub async fn find_attendance_by_id(db: &SqlitePool, id: &str) -> Result<Option<Attendance>, sqlx::Error> {
    sqlx::query_as::<_, Attendance>(&format!(
        "SELECT {} FROM attendance WHERE id = ?",
        ATTENDANCE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

fn check_times(record: &Attendance) -> Result<(), AppError> {
    if let (Some(check_in), Some(check_out)) = (record.check_in_time, record.check_out_time) {
        if check_out <= check_in {
            return Err(AppError::BadRequest(
                "Check-out time must be after check-in time.".to_string(),
            ));
        }
    }
    Ok(())
}

async fn ensure_not_recorded(
    db: &SqlitePool,
    record: &Attendance,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM attendance
            WHERE session_id = ?1 AND teacher_id = ?2 AND date = ?3 AND (?4 IS NULL OR id != ?4)
        )
        "#,
    )
    .bind(&record.session_id)
    .bind(&record.teacher_id)
    .bind(record.date)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;

    if exists {
        let name = teachers::find_teacher_by_id(db, &record.teacher_id)
            .await?
            .map(|t| t.full_name())
            .unwrap_or_else(|| record.teacher_id.clone());
        return Err(AppError::Conflict(format!(
            "Attendance record already exists for {} on {} for this session.",
            name, record.date
        )));
    }
    Ok(())
}

pub async fn insert_attendance(
    db: &SqlitePool,
    req: NewAttendanceRequest,
) -> Result<Attendance, AppError> {
    if sessions::find_session_by_id(db, &req.session_id).await?.is_none() {
        return Err(AppError::InvalidInput(format!(
            "session {} does not exist",
            req.session_id
        )));
    }
    if teachers::find_teacher_by_id(db, &req.teacher_id).await?.is_none() {
        return Err(AppError::InvalidInput(format!(
            "teacher {} does not exist",
            req.teacher_id
        )));
    }

    let record = Attendance {
        id: new_id(),
        session_id: req.session_id,
        teacher_id: req.teacher_id,
        date: req.date,
        status: req.status.unwrap_or(AttendanceStatus::Present),
        check_in_time: req.check_in_time,
        check_out_time: req.check_out_time,
        actual_duration: req.actual_duration,
        notes: req.notes,
        created_at: now(),
    };
    check_times(&record)?;
    ensure_not_recorded(db, &record, None).await?;

    sqlx::query(&format!(
        "INSERT INTO attendance ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        ATTENDANCE_COLUMNS
    ))
    .bind(&record.id)
    .bind(&record.session_id)
    .bind(&record.teacher_id)
    .bind(record.date)
    .bind(record.status)
    .bind(record.check_in_time)
    .bind(record.check_out_time)
    .bind(record.actual_duration)
    .bind(&record.notes)
    .bind(&record.created_at)
    .execute(db)
    .await?;

    Ok(record)
}

pub async fn update_attendance(
    db: &SqlitePool,
    id: &str,
    req: UpdateAttendanceRequest,
) -> Result<Option<Attendance>, AppError> {
    let Some(mut current) = find_attendance_by_id(db, id).await? else {
        return Ok(None);
    };

    if let Some(date) = req.date {
        current.date = date;
    }
    if let Some(status) = req.status {
        current.status = status;
    }
    if req.check_in_time.is_some() {
        current.check_in_time = req.check_in_time;
    }
    if req.check_out_time.is_some() {
        current.check_out_time = req.check_out_time;
    }
    if req.actual_duration.is_some() {
        current.actual_duration = req.actual_duration;
    }
    if let Some(notes) = req.notes {
        current.notes = notes;
    }
    check_times(&current)?;
    ensure_not_recorded(db, &current, Some(id)).await?;

    sqlx::query(
        r#"
        UPDATE attendance
        SET date = ?, status = ?, check_in_time = ?, check_out_time = ?, actual_duration = ?, notes = ?
        WHERE id = ?
        "#,
    )
    .bind(current.date)
    .bind(current.status)
    .bind(current.check_in_time)
    .bind(current.check_out_time)
    .bind(current.actual_duration)
    .bind(&current.notes)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_attendance(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}
