use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::models::{DayOfWeek, TeacherWorkload};

/// Inclusive bounds on the session date. Either side may be open.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_open(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EntityCounts {
    pub total_teachers: i64,
    pub active_teachers: i64,
    pub total_subjects: i64,
    pub active_subjects: i64,
    pub total_programs: i64,
    pub total_sessions: i64,
    pub scheduled_sessions: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DepartmentCount {
    pub department_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DayCount {
    pub day_of_week: DayOfWeek,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DepartmentStats {
    pub id: String,
    pub name: String,
    pub teacher_count: i64,
    pub subject_count: i64,
    pub session_count: i64,
}

pub async fn fetch_entity_counts(db: &SqlitePool) -> Result<EntityCounts, sqlx::Error> {
    sqlx::query_as::<_, EntityCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM teachers) AS total_teachers,
            (SELECT COUNT(*) FROM teachers WHERE status = 'active') AS active_teachers,
            (SELECT COUNT(*) FROM subjects) AS total_subjects,
            (SELECT COUNT(*) FROM subjects WHERE is_active = 1) AS active_subjects,
            (SELECT COUNT(*) FROM programs) AS total_programs,
            (SELECT COUNT(*) FROM sessions) AS total_sessions,
            (SELECT COUNT(*) FROM sessions WHERE status = 'scheduled') AS scheduled_sessions
        "#,
    )
    .fetch_one(db)
    .await
}

/// Hours and session counts per teacher, busiest first.
///
/// With `only_busy` set, teachers without a session in `range` are left out.
/// A negative `limit` returns every teacher.
pub async fn fetch_teacher_workloads(
    db: &SqlitePool,
    range: DateRange,
    only_busy: bool,
    limit: i64,
) -> Result<Vec<TeacherWorkload>, sqlx::Error> {
    sqlx::query_as::<_, TeacherWorkload>(
        r#"
        SELECT t.id, t.first_name, t.last_name,
            COALESCE(SUM(s.duration), 0.0) AS total_hours,
            COUNT(s.id) AS session_count
        FROM teachers t
        LEFT JOIN sessions s ON s.teacher_id = t.id
            AND (?1 IS NULL OR s.date >= ?1)
            AND (?2 IS NULL OR s.date <= ?2)
        GROUP BY t.id
        HAVING ?3 = 0 OR COUNT(s.id) > 0
        ORDER BY total_hours DESC, t.last_name, t.first_name
        LIMIT ?4
        "#,
    )
    .bind(range.start_date)
    .bind(range.end_date)
    .bind(only_busy)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn fetch_teacher_workload(
    db: &SqlitePool,
    teacher_id: &str,
) -> Result<Option<TeacherWorkload>, sqlx::Error> {
    sqlx::query_as::<_, TeacherWorkload>(
        r#"
        SELECT t.id, t.first_name, t.last_name,
            COALESCE(SUM(s.duration), 0.0) AS total_hours,
            COUNT(s.id) AS session_count
        FROM teachers t
        LEFT JOIN sessions s ON s.teacher_id = t.id
        WHERE t.id = ?
        GROUP BY t.id
        "#,
    )
    .bind(teacher_id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_teachers_by_department(db: &SqlitePool) -> Result<Vec<DepartmentCount>, sqlx::Error> {
    sqlx::query_as::<_, DepartmentCount>(
        r#"
        SELECT d.name AS department_name, COUNT(t.id) AS count
        FROM teachers t
        JOIN departments d ON d.id = t.department_id
        GROUP BY d.id
        ORDER BY d.name
        "#,
    )
    .fetch_all(db)
    .await
}

/// Session counts per weekday, Monday first. Days without sessions are omitted.
pub async fn fetch_sessions_per_day(db: &SqlitePool) -> Result<Vec<DayCount>, sqlx::Error> {
    let mut days = sqlx::query_as::<_, DayCount>(
        "SELECT day_of_week, COUNT(*) AS count FROM sessions GROUP BY day_of_week",
    )
    .fetch_all(db)
    .await?;
    days.sort_by_key(|d| d.day_of_week.index());
    Ok(days)
}

pub async fn fetch_department_stats(
    db: &SqlitePool,
    range: DateRange,
) -> Result<Vec<DepartmentStats>, sqlx::Error> {
    sqlx::query_as::<_, DepartmentStats>(
        r#"
        SELECT d.id, d.name,
            (SELECT COUNT(*) FROM teachers t WHERE t.department_id = d.id) AS teacher_count,
            (SELECT COUNT(DISTINCT st.subject_id)
                FROM subject_teachers st
                JOIN teachers t ON t.id = st.teacher_id
                WHERE t.department_id = d.id) AS subject_count,
            (SELECT COUNT(*)
                FROM sessions s
                JOIN teachers t ON t.id = s.teacher_id
                WHERE t.department_id = d.id
                    AND (?1 IS NULL OR s.date >= ?1)
                    AND (?2 IS NULL OR s.date <= ?2)) AS session_count
        FROM departments d
        ORDER BY d.name
        "#,
    )
    .bind(range.start_date)
    .bind(range.end_date)
    .fetch_all(db)
    .await
}

/// `(session count, total hours)` of sessions dated inside `range`.
pub async fn fetch_session_totals(db: &SqlitePool, range: DateRange) -> Result<(i64, f64), sqlx::Error> {
    sqlx::query_as::<_, (i64, f64)>(
        r#"
        SELECT COUNT(*), COALESCE(SUM(duration), 0.0)
        FROM sessions
        WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
        "#,
    )
    .bind(range.start_date)
    .bind(range.end_date)
    .fetch_one(db)
    .await
}
