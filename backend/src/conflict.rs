//! Teacher double-booking detection.
//!
//! Two sessions conflict when they belong to the same teacher, fall on the
//! same day, are both `scheduled`, and their half-open `[start, end)` time
//! ranges intersect. Back-to-back sessions therefore never conflict.
//!
//! Every caller goes through [`find_conflict`]: the strict checker used by the
//! scheduling handlers and the seeder, the lenient checker behind the
//! pre-submit endpoint, and the transactional insert path in
//! [`crate::db::sessions`].

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};

use crate::db;
use crate::error::AppError;
use crate::models::DayOfWeek;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Builds a range, rejecting empty or inverted intervals.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, AppError> {
        if start >= end {
            return Err(AppError::InvalidInput(
                "End time must be after start time.".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Which stored sessions count as "the same day".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayScope {
    Date(NaiveDate),
    Weekday(DayOfWeek),
}

/// A scheduled session as seen by the checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScheduledSlot {
    pub session_id: String,
    pub subject_name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl ScheduledSlot {
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// `Mathematics (09:00 - 10:00)`
    pub fn describe(&self) -> String {
        format!(
            "{} ({} - {})",
            self.subject_name,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

/// Returns the first candidate whose range overlaps `proposed`.
pub fn find_conflict<'a>(
    candidates: &'a [ScheduledSlot],
    proposed: &TimeRange,
) -> Option<&'a ScheduledSlot> {
    candidates.iter().find(|slot| slot.range().overlaps(proposed))
}

/// User-facing rejection for a scheduling form.
pub fn booking_message(teacher_name: &str, slot: &ScheduledSlot) -> String {
    format!(
        "Teacher {} already has {} scheduled from {} to {} on {}.",
        teacher_name,
        slot.subject_name,
        slot.start_time.format("%H:%M"),
        slot.end_time.format("%H:%M"),
        slot.date
    )
}

/// Read-only access to the sessions a conflict check needs.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn teacher_exists(&self, teacher_id: &str) -> Result<bool, AppError>;

    /// Scheduled sessions of `teacher_id` inside `scope`, minus `exclude_session_id`.
    async fn scheduled_slots(
        &self,
        teacher_id: &str,
        scope: DayScope,
        exclude_session_id: Option<&str>,
    ) -> Result<Vec<ScheduledSlot>, AppError>;
}

#[async_trait]
impl SessionStore for SqlitePool {
    async fn teacher_exists(&self, teacher_id: &str) -> Result<bool, AppError> {
        Ok(db::teachers::find_teacher_by_id(self, teacher_id).await?.is_some())
    }

    async fn scheduled_slots(
        &self,
        teacher_id: &str,
        scope: DayScope,
        exclude_session_id: Option<&str>,
    ) -> Result<Vec<ScheduledSlot>, AppError> {
        let mut conn = self.acquire().await?;
        let slots =
            db::sessions::fetch_scheduled_slots(&mut *conn, teacher_id, scope, exclude_session_id)
                .await?;
        Ok(slots)
    }
}

/// A fully typed conflict question.
#[derive(Debug, Clone)]
pub struct ConflictQuery {
    pub teacher_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub exclude_session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictCheck {
    pub has_conflict: bool,
    pub message: Option<String>,
}

impl ConflictCheck {
    fn clear() -> Self {
        Self {
            has_conflict: false,
            message: None,
        }
    }

    fn found(slot: &ScheduledSlot) -> Self {
        Self {
            has_conflict: true,
            message: Some(format!("Conflict with {} on {}", slot.describe(), slot.date)),
        }
    }
}

async fn evaluate<S: SessionStore + ?Sized>(
    store: &S,
    teacher_id: &str,
    scope: DayScope,
    proposed: &TimeRange,
    exclude_session_id: Option<&str>,
) -> Result<Option<ScheduledSlot>, AppError> {
    let candidates = store
        .scheduled_slots(teacher_id, scope, exclude_session_id)
        .await?;
    debug!(
        "checking {} candidate sessions for teacher {}",
        candidates.len(),
        teacher_id
    );
    Ok(find_conflict(&candidates, proposed).cloned())
}

/// Strict mode: the teacher must exist. Interval ordering is the caller's job.
pub async fn check_strict<S: SessionStore + ?Sized>(
    store: &S,
    query: &ConflictQuery,
) -> Result<ConflictCheck, AppError> {
    if query.teacher_id.trim().is_empty() {
        return Err(AppError::InvalidInput("teacher_id is required".to_string()));
    }
    if !store.teacher_exists(&query.teacher_id).await? {
        return Err(AppError::InvalidInput(format!(
            "teacher {} does not exist",
            query.teacher_id
        )));
    }

    let proposed = TimeRange {
        start: query.start_time,
        end: query.end_time,
    };
    let found = evaluate(
        store,
        &query.teacher_id,
        DayScope::Date(query.date),
        &proposed,
        query.exclude_session_id.as_deref(),
    )
    .await?;

    Ok(match found {
        Some(slot) => ConflictCheck::found(&slot),
        None => ConflictCheck::clear(),
    })
}

/// Raw key/value input of the pre-submit endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConflictParams {
    pub teacher_id: Option<String>,
    pub date: Option<String>,
    pub day_of_week: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub exclude_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResponse {
    pub has_conflict: bool,
    pub message: String,
}

impl ConflictResponse {
    fn none(message: impl Into<String>) -> Self {
        Self {
            has_conflict: false,
            message: message.into(),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Lenient mode: never fails. Missing or malformed input, an unknown teacher
/// or a store error all answer "no conflict" with an explanatory message.
pub async fn check_lenient<S: SessionStore + ?Sized>(
    store: &S,
    params: &ConflictParams,
) -> ConflictResponse {
    let (Some(teacher_id), Some(start_raw), Some(end_raw)) = (
        present(&params.teacher_id),
        present(&params.start_time),
        present(&params.end_time),
    ) else {
        return ConflictResponse::none("Incomplete data");
    };

    let scope = match (present(&params.date), present(&params.day_of_week)) {
        (Some(date), _) => match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(date) => DayScope::Date(date),
            Err(_) => return ConflictResponse::none(format!("Invalid date: {}", date)),
        },
        (None, Some(day)) => match day.parse::<DayOfWeek>() {
            Ok(day) => DayScope::Weekday(day),
            Err(e) => return ConflictResponse::none(e),
        },
        (None, None) => return ConflictResponse::none("Incomplete data"),
    };

    let (Some(start), Some(end)) = (parse_time(start_raw), parse_time(end_raw)) else {
        return ConflictResponse::none("Invalid time format, expected HH:MM");
    };
    let proposed = TimeRange { start, end };

    match evaluate(store, teacher_id, scope, &proposed, present(&params.exclude_id)).await {
        Ok(Some(slot)) => ConflictResponse {
            has_conflict: true,
            message: format!("Conflict with {}", slot.describe()),
        },
        Ok(None) => ConflictResponse::none("No conflicts found"),
        Err(e) => {
            warn!("conflict pre-check failed: {}", e);
            ConflictResponse::none("Unable to check conflicts")
        }
    }
}
