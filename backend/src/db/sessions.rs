use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::conflict::{DayScope, ScheduledSlot, TimeRange, booking_message, find_conflict};
use crate::db::{new_id, now, page_offset, push_clause, subjects, teachers};
use crate::error::AppError;
use crate::models::session::duration_hours;
use crate::models::{
    DayOfWeek, NewSessionRequest, Page, ScheduleRow, Session, SessionListItem, SessionStatus,
    Teacher, UpdateSessionRequest,
};

pub const SESSIONS_PER_PAGE: i64 = 15;

const SESSION_COLUMNS: &str = "s.id, s.teacher_id, s.subject_id, s.date, s.day_of_week, \
     s.start_time, s.end_time, s.duration, s.room, s.status, s.notes, s.is_recurring, \
     s.created_at, s.updated_at";

const LIST_COLUMNS: &str = "s.id, s.teacher_id, t.first_name || ' ' || t.last_name AS teacher_name, \
     s.subject_id, sub.name AS subject_name, s.date, s.day_of_week, s.start_time, s.end_time, \
     s.duration, s.room, s.status";

const LIST_FROM: &str = " FROM sessions s \
     JOIN teachers t ON t.id = s.teacher_id \
     JOIN subjects sub ON sub.id = s.subject_id";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionFilter {
    pub teacher_id: Option<String>,
    pub day_of_week: Option<DayOfWeek>,
    pub subject_id: Option<String>,
    pub status: Option<SessionStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: Option<i64>,
}

/// Filters of the schedule exports. `teacher` and `day` are accepted as
/// short forms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleFilter {
    #[serde(alias = "teacher")]
    pub teacher_id: Option<String>,
    #[serde(alias = "day")]
    pub day_of_week: Option<DayOfWeek>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<&ScheduleFilter> for SessionFilter {
    fn from(filter: &ScheduleFilter) -> Self {
        SessionFilter {
            teacher_id: filter.teacher_id.clone(),
            day_of_week: filter.day_of_week,
            date_from: filter.start_date,
            date_to: filter.end_date,
            ..Default::default()
        }
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &SessionFilter) {
    let mut has_clause = false;
    if let Some(teacher_id) = filter.teacher_id.clone() {
        push_clause(builder, &mut has_clause);
        builder.push("s.teacher_id = ").push_bind(teacher_id);
    }
    if let Some(day) = filter.day_of_week {
        push_clause(builder, &mut has_clause);
        builder.push("s.day_of_week = ").push_bind(day);
    }
    if let Some(subject_id) = filter.subject_id.clone() {
        push_clause(builder, &mut has_clause);
        builder.push("s.subject_id = ").push_bind(subject_id);
    }
    if let Some(status) = filter.status {
        push_clause(builder, &mut has_clause);
        builder.push("s.status = ").push_bind(status);
    }
    if let Some(from) = filter.date_from {
        push_clause(builder, &mut has_clause);
        builder.push("s.date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        push_clause(builder, &mut has_clause);
        builder.push("s.date <= ").push_bind(to);
    }
}

pub async fn list_sessions(
    db: &SqlitePool,
    filter: &SessionFilter,
) -> Result<Page<SessionListItem>, sqlx::Error> {
    let (page, offset) = page_offset(filter.page, SESSIONS_PER_PAGE);

    let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM sessions s");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {}{}", LIST_COLUMNS, LIST_FROM));
    push_filters(&mut builder, filter);
    builder
        .push(" ORDER BY s.date, s.start_time LIMIT ")
        .push_bind(SESSIONS_PER_PAGE)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = builder.build_query_as::<SessionListItem>().fetch_all(db).await?;

    Ok(Page {
        items,
        page,
        per_page: SESSIONS_PER_PAGE,
        total,
    })
}

/// Every matching session with teacher, subject and program names, ordered
/// Monday first, then by start time.
pub async fn fetch_schedule(
    db: &SqlitePool,
    filter: &ScheduleFilter,
) -> Result<Vec<ScheduleRow>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {}, t.first_name || ' ' || t.last_name AS teacher_name, \
         sub.name AS subject_name, p.name AS program_name{} \
         JOIN programs p ON p.id = sub.program_id",
        SESSION_COLUMNS, LIST_FROM
    ));
    push_filters(&mut builder, &SessionFilter::from(filter));
    builder.push(" ORDER BY s.start_time, s.date");

    let mut rows = builder.build_query_as::<ScheduleRow>().fetch_all(db).await?;
    rows.sort_by_key(|r| r.session.day_of_week.index());
    Ok(rows)
}

/// Scheduled sessions on `day`, ordered by start time.
pub async fn fetch_scheduled_on_weekday(
    db: &SqlitePool,
    day: DayOfWeek,
) -> Result<Vec<SessionListItem>, sqlx::Error> {
    sqlx::query_as::<_, SessionListItem>(&format!(
        "SELECT {}{} WHERE s.day_of_week = ? AND s.status = 'scheduled' ORDER BY s.start_time",
        LIST_COLUMNS, LIST_FROM
    ))
    .bind(day)
    .fetch_all(db)
    .await
}

/// Next scheduled sessions on or after `from`.
pub async fn fetch_upcoming(
    db: &SqlitePool,
    from: NaiveDate,
    limit: i64,
) -> Result<Vec<SessionListItem>, sqlx::Error> {
    sqlx::query_as::<_, SessionListItem>(&format!(
        "SELECT {}{} WHERE s.status = 'scheduled' AND s.date >= ? ORDER BY s.date, s.start_time LIMIT ?",
        LIST_COLUMNS, LIST_FROM
    ))
    .bind(from)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn fetch_teacher_sessions(
    db: &SqlitePool,
    teacher_id: &str,
    limit: i64,
) -> Result<Vec<SessionListItem>, sqlx::Error> {
    sqlx::query_as::<_, SessionListItem>(&format!(
        "SELECT {}{} WHERE s.teacher_id = ? ORDER BY s.date DESC, s.start_time LIMIT ?",
        LIST_COLUMNS, LIST_FROM
    ))
    .bind(teacher_id)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn find_session_by_id(db: &SqlitePool, id: &str) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(&format!(
        "SELECT {} FROM sessions s WHERE s.id = ?",
        SESSION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Candidate set for a conflict check: scheduled sessions of one teacher on
/// one day, optionally without the session being edited.
pub async fn fetch_scheduled_slots(
    conn: &mut SqliteConnection,
    teacher_id: &str,
    scope: DayScope,
    exclude_session_id: Option<&str>,
) -> Result<Vec<ScheduledSlot>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT s.id AS session_id, sub.name AS subject_name, s.date, s.start_time, s.end_time \
         FROM sessions s JOIN subjects sub ON sub.id = s.subject_id \
         WHERE s.status = 'scheduled' AND s.teacher_id = ",
    );
    builder.push_bind(teacher_id.to_string());
    match scope {
        DayScope::Date(date) => {
            builder.push(" AND s.date = ").push_bind(date);
        }
        DayScope::Weekday(day) => {
            builder.push(" AND s.day_of_week = ").push_bind(day);
        }
    }
    if let Some(exclude) = exclude_session_id {
        builder.push(" AND s.id != ").push_bind(exclude.to_string());
    }

    builder
        .build_query_as::<ScheduledSlot>()
        .fetch_all(&mut *conn)
        .await
}

fn resolve_day(date: NaiveDate, requested: Option<DayOfWeek>) -> Result<DayOfWeek, AppError> {
    let actual = DayOfWeek::of(date);
    match requested {
        Some(day) if day != actual => Err(AppError::BadRequest(format!(
            "{} falls on a {}, not a {}",
            date, actual, day
        ))),
        _ => Ok(actual),
    }
}

async fn require_teacher(db: &SqlitePool, teacher_id: &str) -> Result<Teacher, AppError> {
    teachers::find_teacher_by_id(db, teacher_id)
        .await?
        .ok_or_else(|| AppError::InvalidInput(format!("teacher {} does not exist", teacher_id)))
}

async fn require_subject(db: &SqlitePool, subject_id: &str) -> Result<(), AppError> {
    subjects::find_subject_by_id(db, subject_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::InvalidInput(format!("subject {} does not exist", subject_id)))
}

/// Writes `session` after re-running the conflict check in the same
/// transaction, so a booking made between a pre-check and this write is still
/// caught. `BEGIN IMMEDIATE` takes the write lock before the candidate read;
/// other writers wait on the busy timeout instead of failing at commit.
async fn write_checked(
    db: &SqlitePool,
    session: &Session,
    teacher: &Teacher,
    is_new: bool,
) -> Result<(), AppError> {
    let mut tx = db.begin_with("BEGIN IMMEDIATE").await?;

    if session.status == SessionStatus::Scheduled {
        let exclude = if is_new { None } else { Some(session.id.as_str()) };
        let candidates = fetch_scheduled_slots(
            &mut *tx,
            &session.teacher_id,
            DayScope::Date(session.date),
            exclude,
        )
        .await?;
        let proposed = TimeRange {
            start: session.start_time,
            end: session.end_time,
        };
        if let Some(slot) = find_conflict(&candidates, &proposed) {
            warn!(
                "rejecting session for teacher {}: overlaps session {}",
                session.teacher_id, slot.session_id
            );
            return Err(AppError::Conflict(booking_message(&teacher.full_name(), slot)));
        }
    }

    let query = if is_new {
        r#"
        INSERT INTO sessions
            (teacher_id, subject_id, date, day_of_week, start_time, end_time, duration,
            room, status, notes, is_recurring, created_at, updated_at, id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#
    } else {
        r#"
        UPDATE sessions
        SET teacher_id = ?, subject_id = ?, date = ?, day_of_week = ?, start_time = ?,
            end_time = ?, duration = ?, room = ?, status = ?, notes = ?, is_recurring = ?,
            created_at = ?, updated_at = ?
        WHERE id = ?
        "#
    };

    sqlx::query(query)
        .bind(&session.teacher_id)
        .bind(&session.subject_id)
        .bind(session.date)
        .bind(session.day_of_week)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.duration)
        .bind(&session.room)
        .bind(session.status)
        .bind(&session.notes)
        .bind(session.is_recurring)
        .bind(&session.created_at)
        .bind(&session.updated_at)
        .bind(&session.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn insert_session(db: &SqlitePool, req: NewSessionRequest) -> Result<Session, AppError> {
    let range = TimeRange::new(req.start_time, req.end_time)?;
    let teacher = require_teacher(db, &req.teacher_id).await?;
    if !teacher.is_active() {
        return Err(AppError::BadRequest(format!(
            "Teacher {} is not active and cannot be scheduled.",
            teacher.full_name()
        )));
    }
    require_subject(db, &req.subject_id).await?;
    let day_of_week = resolve_day(req.date, req.day_of_week)?;

    let now = now();
    let session = Session {
        id: new_id(),
        teacher_id: req.teacher_id,
        subject_id: req.subject_id,
        date: req.date,
        day_of_week,
        start_time: range.start,
        end_time: range.end,
        duration: duration_hours(range.start, range.end),
        room: req.room,
        status: req.status.unwrap_or(SessionStatus::Scheduled),
        notes: req.notes,
        is_recurring: req.is_recurring,
        created_at: now.clone(),
        updated_at: now,
    };

    write_checked(db, &session, &teacher, true).await?;
    info!(
        "scheduled session {} for teacher {} on {}",
        session.id, session.teacher_id, session.date
    );
    Ok(session)
}

pub async fn update_session(
    db: &SqlitePool,
    id: &str,
    req: UpdateSessionRequest,
) -> Result<Option<Session>, AppError> {
    let mut current = match find_session_by_id(db, id).await? {
        Some(s) => s,
        None => return Ok(None),
    };

    if let Some(teacher_id) = req.teacher_id {
        current.teacher_id = teacher_id;
    }
    if let Some(subject_id) = req.subject_id {
        current.subject_id = subject_id;
    }
    if let Some(date) = req.date {
        current.date = date;
    }
    if let Some(start_time) = req.start_time {
        current.start_time = start_time;
    }
    if let Some(end_time) = req.end_time {
        current.end_time = end_time;
    }
    if let Some(room) = req.room {
        current.room = room;
    }
    if let Some(status) = req.status {
        current.status = status;
    }
    if let Some(notes) = req.notes {
        current.notes = notes;
    }
    if let Some(is_recurring) = req.is_recurring {
        current.is_recurring = is_recurring;
    }

    let range = TimeRange::new(current.start_time, current.end_time)?;
    let teacher = require_teacher(db, &current.teacher_id).await?;
    require_subject(db, &current.subject_id).await?;
    current.day_of_week = resolve_day(current.date, req.day_of_week)?;
    current.duration = duration_hours(range.start, range.end);
    current.updated_at = now();

    write_checked(db, &current, &teacher, false).await?;
    Ok(Some(current))
}

pub async fn delete_session(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::conflict::{ConflictQuery, check_strict};
    use crate::db::connect_in_memory;
    use crate::db::programs::{insert_program, tests::sample_program};
    use crate::db::subjects::{insert_subject, tests::sample_subject};
    use crate::db::teachers::{insert_teacher, tests::sample_teacher};
    use chrono::NaiveTime;

    pub(crate) struct Fixture {
        pub pool: SqlitePool,
        pub teacher_id: String,
        pub other_teacher_id: String,
        pub subject_id: String,
    }

    pub(crate) async fn fixture() -> Fixture {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let program = insert_program(&pool, sample_program("B.Tech", "BTECH")).await.unwrap();
        let subject = insert_subject(&pool, sample_subject("MA101", &program.id)).await.unwrap();
        let teacher = insert_teacher(&pool, sample_teacher("Asha", "EMP001")).await.unwrap();
        let other = insert_teacher(&pool, sample_teacher("Ravi", "EMP002")).await.unwrap();
        Fixture {
            pool,
            teacher_id: teacher.id,
            other_teacher_id: other.id,
            subject_id: subject.subject.id,
        }
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    pub(crate) fn request(
        teacher_id: &str,
        subject_id: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> NewSessionRequest {
        NewSessionRequest {
            teacher_id: teacher_id.to_string(),
            subject_id: subject_id.to_string(),
            date,
            day_of_week: None,
            start_time: start,
            end_time: end,
            room: "Room 101".to_string(),
            status: None,
            notes: String::new(),
            is_recurring: false,
        }
    }

    #[tokio::test]
    async fn test_insert_session_derives_day_and_duration() {
        let f = fixture().await;
        let session = insert_session(&f.pool, request(&f.teacher_id, &f.subject_id, march(4), t(9, 0), t(10, 30)))
            .await
            .expect("Failed to insert session");

        assert_eq!(session.day_of_week, DayOfWeek::Monday);
        assert_eq!(session.duration, 1.5);
        assert_eq!(session.status, SessionStatus::Scheduled);

        let stored = find_session_by_id(&f.pool, &session.id).await.unwrap().unwrap();
        assert_eq!(stored.start_time, t(9, 0));
        assert_eq!(stored.end_time, t(10, 30));
        assert_eq!(stored.date, march(4));
    }

    #[tokio::test]
    async fn test_insert_rejects_inverted_interval() {
        let f = fixture().await;
        let err = insert_session(&f.pool, request(&f.teacher_id, &f.subject_id, march(4), t(10, 0), t(9, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_double_booking_is_rejected_at_write_time() {
        let f = fixture().await;
        insert_session(&f.pool, request(&f.teacher_id, &f.subject_id, march(4), t(9, 0), t(10, 0)))
            .await
            .unwrap();

        let err = insert_session(&f.pool, request(&f.teacher_id, &f.subject_id, march(4), t(9, 30), t(10, 30)))
            .await
            .unwrap_err();
        match err {
            AppError::Conflict(message) => {
                assert!(message.contains("Asha Sen"), "{}", message);
                assert!(message.contains("Mathematics"), "{}", message);
                assert!(message.contains("09:00 to 10:00"), "{}", message);
            }
            other => panic!("expected conflict, got {:?}", other),
        }

        insert_session(&f.pool, request(&f.teacher_id, &f.subject_id, march(4), t(10, 0), t(11, 0)))
            .await
            .expect("back-to-back session is allowed");
        insert_session(&f.pool, request(&f.other_teacher_id, &f.subject_id, march(4), t(9, 0), t(10, 0)))
            .await
            .expect("another teacher may use the same slot");
    }

    #[tokio::test]
    async fn test_cancelled_sessions_free_the_slot() {
        let f = fixture().await;
        let first = insert_session(&f.pool, request(&f.teacher_id, &f.subject_id, march(4), t(9, 0), t(10, 0)))
            .await
            .unwrap();
        update_session(
            &f.pool,
            &first.id,
            UpdateSessionRequest {
                status: Some(SessionStatus::Cancelled),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        insert_session(&f.pool, request(&f.teacher_id, &f.subject_id, march(4), t(9, 0), t(10, 0)))
            .await
            .expect("slot of a cancelled session can be reused");

        let err = update_session(
            &f.pool,
            &first.id,
            UpdateSessionRequest {
                status: Some(SessionStatus::Scheduled),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_editing_a_session_does_not_conflict_with_itself() {
        let f = fixture().await;
        let session = insert_session(&f.pool, request(&f.teacher_id, &f.subject_id, march(4), t(9, 0), t(10, 0)))
            .await
            .unwrap();

        let updated = update_session(
            &f.pool,
            &session.id,
            UpdateSessionRequest {
                end_time: Some(t(10, 30)),
                notes: Some("extended".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.duration, 1.5);

        let check = check_strict(
            &f.pool,
            &ConflictQuery {
                teacher_id: f.teacher_id.clone(),
                date: march(4),
                start_time: t(9, 0),
                end_time: t(10, 30),
                exclude_session_id: Some(session.id.clone()),
            },
        )
        .await
        .unwrap();
        assert!(!check.has_conflict);
    }

    #[tokio::test]
    async fn test_sqlite_store_answers_the_march_scenario() {
        let f = fixture().await;
        insert_session(&f.pool, request(&f.teacher_id, &f.subject_id, march(4), t(9, 0), t(10, 0)))
            .await
            .unwrap();

        let ask = |date, start, end| ConflictQuery {
            teacher_id: f.teacher_id.clone(),
            date,
            start_time: start,
            end_time: end,
            exclude_session_id: None,
        };

        let hit = check_strict(&f.pool, &ask(march(4), t(9, 30), t(10, 30))).await.unwrap();
        assert!(hit.has_conflict);
        assert!(hit.message.unwrap().contains("09:00 - 10:00"));
        assert!(!check_strict(&f.pool, &ask(march(4), t(10, 0), t(11, 0))).await.unwrap().has_conflict);
        assert!(!check_strict(&f.pool, &ask(march(5), t(9, 0), t(10, 0))).await.unwrap().has_conflict);
    }

    #[tokio::test]
    async fn test_day_of_week_must_match_date() {
        let f = fixture().await;
        let mut req = request(&f.teacher_id, &f.subject_id, march(4), t(9, 0), t(10, 0));
        req.day_of_week = Some(DayOfWeek::Friday);
        let err = insert_session(&f.pool, req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_list_sessions_filters_by_teacher_and_status() {
        let f = fixture().await;
        insert_session(&f.pool, request(&f.teacher_id, &f.subject_id, march(4), t(9, 0), t(10, 0)))
            .await
            .unwrap();
        let mut done = request(&f.other_teacher_id, &f.subject_id, march(5), t(9, 0), t(10, 0));
        done.status = Some(SessionStatus::Completed);
        insert_session(&f.pool, done).await.unwrap();

        let mine = list_sessions(
            &f.pool,
            &SessionFilter {
                teacher_id: Some(f.teacher_id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.items[0].teacher_name, "Asha Sen");
        assert_eq!(mine.items[0].subject_name, "Mathematics");

        let completed = list_sessions(
            &f.pool,
            &SessionFilter {
                status: Some(SessionStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(completed.total, 1);
        assert_eq!(completed.items[0].day_of_week, DayOfWeek::Tuesday);
    }
}
