use chrono::{Local, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::stats::{self, DateRange, DayCount, DepartmentCount, DepartmentStats, EntityCounts};
use crate::db::sessions;
use crate::error::AppError;
use crate::models::{DayOfWeek, SessionListItem, TeacherWorkload};

const UPCOMING_LIMIT: i64 = 10;
const TOP_TEACHERS: i64 = 10;
const TREND_WEEKS: i64 = 8;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub counts: EntityCounts,
    pub today: NaiveDate,
    pub todays_sessions: Vec<SessionListItem>,
    pub upcoming_sessions: Vec<SessionListItem>,
    pub teachers_by_department: Vec<DepartmentCount>,
    pub sessions_per_day: Vec<DayCount>,
    pub teacher_hours: Vec<TeacherWorkload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyCount {
    pub week: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub teacher_utilization: Vec<TeacherWorkload>,
    pub department_stats: Vec<DepartmentStats>,
    pub weekly_trends: Vec<WeeklyCount>,
    pub total_sessions: i64,
    pub total_hours: f64,
}

pub async fn dashboard(db: &SqlitePool, today: NaiveDate) -> Result<DashboardStats, AppError> {
    let counts = stats::fetch_entity_counts(db).await?;
    let todays_sessions = sessions::fetch_scheduled_on_weekday(db, DayOfWeek::of(today)).await?;
    let upcoming_sessions = sessions::fetch_upcoming(db, today, UPCOMING_LIMIT).await?;
    let teachers_by_department = stats::fetch_teachers_by_department(db).await?;
    let sessions_per_day = stats::fetch_sessions_per_day(db).await?;
    let teacher_hours =
        stats::fetch_teacher_workloads(db, DateRange::default(), false, TOP_TEACHERS).await?;

    debug!(
        "dashboard for {}: {} sessions today, {} upcoming",
        today,
        todays_sessions.len(),
        upcoming_sessions.len()
    );

    Ok(DashboardStats {
        counts,
        today,
        todays_sessions,
        upcoming_sessions,
        teachers_by_department,
        sessions_per_day,
        teacher_hours,
    })
}

/// Eight consecutive seven-day windows ending on `reference`, oldest first.
/// Windows are clipped to `floor` when one is given.
pub fn trend_windows(reference: NaiveDate, floor: Option<NaiveDate>) -> Vec<(String, DateRange)> {
    (0..TREND_WEEKS)
        .rev()
        .map(|i| {
            let end = reference - chrono::Duration::weeks(i);
            let mut start = end - chrono::Duration::days(6);
            if let Some(floor) = floor {
                start = start.max(floor);
            }
            (
                format!("Week {}", TREND_WEEKS - i),
                DateRange {
                    start_date: Some(start),
                    end_date: Some(end),
                },
            )
        })
        .collect()
}

pub async fn report(db: &SqlitePool, range: DateRange) -> Result<Report, AppError> {
    if let (Some(start), Some(end)) = (range.start_date, range.end_date) {
        if end < start {
            return Err(AppError::BadRequest(
                "end_date must not be before start_date".to_string(),
            ));
        }
    }

    let teacher_utilization =
        stats::fetch_teacher_workloads(db, range, !range.is_open(), -1).await?;
    let department_stats = stats::fetch_department_stats(db, range).await?;

    let reference = range.end_date.unwrap_or_else(|| Local::now().date_naive());
    let mut weekly_trends = Vec::new();
    for (week, window) in trend_windows(reference, range.start_date) {
        let (count, _) = match (window.start_date, window.end_date) {
            (Some(start), Some(end)) if start > end => (0, 0.0),
            _ => stats::fetch_session_totals(db, window).await?,
        };
        weekly_trends.push(WeeklyCount {
            week,
            start: window.start_date.unwrap_or(reference),
            end: window.end_date.unwrap_or(reference),
            count,
        });
    }

    let (total_sessions, total_hours) = stats::fetch_session_totals(db, range).await?;

    Ok(Report {
        start_date: range.start_date,
        end_date: range.end_date,
        teacher_utilization,
        department_stats,
        weekly_trends,
        total_sessions,
        total_hours,
    })
}
