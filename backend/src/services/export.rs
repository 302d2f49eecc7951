use std::borrow::Cow;
use std::collections::HashMap;

use chrono::Local;
use csv::{Writer, WriterBuilder};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::sessions::{self, ScheduleFilter};
use crate::db::stats::{self, DateRange};
use crate::db::{attendance, departments, teachers};
use crate::error::AppError;
use crate::models::{AttendanceExportRow, DepartmentSummary, ScheduleRow, Teacher, TeacherSubject};

const NOTES_MAX_CHARS: usize = 100;
const PROFILE_ATTENDANCE_LIMIT: i64 = 100;
const MISSING: &str = "N/A";

/// A rendered CSV document and the name it should be downloaded as.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

/// Signed numbers and phone numbers such as `+91 98765 43210` or `-2.5`.
fn is_plain_number(value: &str) -> bool {
    let body = &value[1..];
    body.chars().any(|c| c.is_ascii_digit())
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '.' | '-' | '(' | ')'))
}

fn needs_formula_guard(value: &str) -> bool {
    match value.chars().next() {
        Some('=' | '@') => true,
        Some('+' | '-') => !is_plain_number(value),
        _ => false,
    }
}

/// Prefixes cells a spreadsheet would evaluate as a formula. Numbers and
/// phone numbers pass through unchanged.
pub fn guard_cell(value: &str) -> Cow<'_, str> {
    if needs_formula_guard(value) {
        Cow::Owned(format!("'{}", value))
    } else {
        Cow::Borrowed(value)
    }
}

fn write_row<I, S>(writer: &mut Writer<Vec<u8>>, fields: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let guarded: Vec<String> = fields
        .into_iter()
        .map(|f| guard_cell(f.as_ref()).into_owned())
        .collect();
    writer.write_record(&guarded)?;
    Ok(())
}

fn blank_row(writer: &mut Writer<Vec<u8>>) -> Result<(), AppError> {
    write_row(writer, [""])
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String, AppError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|_| AppError::InternalServerError)
}

pub(crate) fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub(crate) fn generated_at() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

fn or_missing(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| MISSING.to_string())
}

fn hm(time: chrono::NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn render_attendance(rows: &[AttendanceExportRow]) -> Result<String, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    write_row(
        &mut writer,
        [
            "Date",
            "Teacher",
            "Subject",
            "Session Date",
            "Status",
            "Check In",
            "Check Out",
            "Notes",
        ],
    )?;

    for row in rows {
        write_row(
            &mut writer,
            [
                row.date.format("%Y-%m-%d").to_string(),
                format!("{} {}", row.teacher_first_name, row.teacher_last_name),
                or_missing(row.subject_name.clone()),
                or_missing(row.session_date.map(|d| d.format("%Y-%m-%d").to_string())),
                row.status.label().to_string(),
                or_missing(row.check_in_time.map(hm)),
                or_missing(row.check_out_time.map(hm)),
                truncate(&row.notes, NOTES_MAX_CHARS),
            ],
        )?;
    }
    finish(writer)
}

/// Weekly timetable: one row per session.
pub fn render_schedule(rows: &[ScheduleRow]) -> Result<String, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    write_row(
        &mut writer,
        [
            "Day",
            "Time",
            "Teacher",
            "Subject",
            "Program",
            "Room",
            "Duration (hrs)",
            "Status",
        ],
    )?;

    for row in rows {
        write_row(
            &mut writer,
            [
                row.session.day_of_week.label().to_string(),
                row.session.formatted_time(),
                row.teacher_name.clone(),
                row.subject_name.clone(),
                row.program_name.clone(),
                or_missing(Some(row.session.room.clone())),
                format!("{:.2}", row.session.duration),
                row.session.status.label().to_string(),
            ],
        )?;
    }
    finish(writer)
}

fn department_names(list: Vec<DepartmentSummary>) -> HashMap<String, String> {
    list.into_iter().map(|d| (d.id, d.name)).collect()
}

fn department_of(names: &HashMap<String, String>, teacher: &Teacher) -> Option<String> {
    teacher
        .department_id
        .as_ref()
        .and_then(|id| names.get(id).cloned())
}

pub fn render_teachers(
    list: &[Teacher],
    names: &HashMap<String, String>,
    hours: &HashMap<String, (f64, i64)>,
) -> Result<String, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    write_row(
        &mut writer,
        [
            "Employee ID",
            "First Name",
            "Last Name",
            "Email",
            "Phone",
            "Department",
            "Qualification",
            "Specialization",
            "Experience (Years)",
            "Hourly Rate",
            "Status",
            "Hire Date",
            "Total Hours",
            "Sessions",
        ],
    )?;

    for teacher in list {
        let (total_hours, session_count) = hours.get(&teacher.id).copied().unwrap_or((0.0, 0));
        write_row(
            &mut writer,
            [
                teacher.employee_id.clone(),
                teacher.first_name.clone(),
                teacher.last_name.clone(),
                teacher.email.clone(),
                teacher.phone.clone(),
                or_missing(department_of(names, teacher)),
                teacher.qualification.clone(),
                teacher.specialization.clone(),
                teacher.experience_years.to_string(),
                format!("{:.2}", teacher.hourly_rate),
                teacher.status.label().to_string(),
                or_missing(teacher.hire_date.map(|d| d.format("%Y-%m-%d").to_string())),
                format!("{:.2}", total_hours),
                session_count.to_string(),
            ],
        )?;
    }
    finish(writer)
}

/// Teachers with each of their sessions on its own row. A teacher without
/// sessions still gets one "No sessions" row.
pub fn render_teacher_details(
    list: &[Teacher],
    names: &HashMap<String, String>,
    sessions_by_teacher: &HashMap<String, Vec<ScheduleRow>>,
) -> Result<String, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    write_row(
        &mut writer,
        [
            "Teacher Name",
            "Employee ID",
            "Email",
            "Department",
            "Qualification",
            "Subject",
            "Program",
            "Day",
            "Time",
            "Room",
            "Duration (hrs)",
            "Status",
            "Session Date",
        ],
    )?;

    for teacher in list {
        let identity = [
            teacher.full_name(),
            teacher.employee_id.clone(),
            teacher.email.clone(),
            or_missing(department_of(names, teacher)),
            or_missing(Some(teacher.qualification.clone())),
        ];

        let rows = sessions_by_teacher.get(&teacher.id).map(Vec::as_slice).unwrap_or(&[]);
        if rows.is_empty() {
            let empty = ["No sessions", "", "", "", "", "0", "", ""].map(String::from);
            write_row(&mut writer, identity.iter().cloned().chain(empty))?;
            continue;
        }
        for row in rows {
            let session = [
                row.subject_name.clone(),
                row.program_name.clone(),
                row.session.day_of_week.label().to_string(),
                row.session.formatted_time(),
                or_missing(Some(row.session.room.clone())),
                format!("{:.2}", row.session.duration),
                row.session.status.label().to_string(),
                row.session.date.format("%Y-%m-%d").to_string(),
            ];
            write_row(&mut writer, identity.iter().cloned().chain(session))?;
        }
    }
    finish(writer)
}

/// Everything the single-teacher report prints.
#[derive(Debug, Clone)]
pub struct TeacherProfile {
    pub teacher: Teacher,
    pub department: Option<String>,
    pub subjects: Vec<TeacherSubject>,
    pub range: DateRange,
    pub sessions: Vec<ScheduleRow>,
    pub attendance: Vec<AttendanceExportRow>,
    pub generated_at: String,
}

/// Sectioned profile: personal and professional details, emergency contact,
/// assigned subjects, class summary, classes and recent attendance.
pub fn render_teacher_profile(profile: &TeacherProfile) -> Result<String, AppError> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
    let teacher = &profile.teacher;
    let date = |d: Option<chrono::NaiveDate>| or_missing(d.map(|d| d.format("%Y-%m-%d").to_string()));

    write_row(&mut writer, ["FACULTY TRACKER - TEACHER PROFILE REPORT"])?;
    blank_row(&mut writer)?;

    write_row(&mut writer, ["PERSONAL INFORMATION"])?;
    let personal = [
        ("Full Name", teacher.full_name()),
        ("Employee ID", teacher.employee_id.clone()),
        ("Email", teacher.email.clone()),
        ("Phone", teacher.phone.clone()),
        ("Address", or_missing(Some(teacher.address.clone()))),
        ("Date of Birth", date(teacher.date_of_birth)),
        ("Gender", teacher.gender.label().to_string()),
    ];
    for (field, value) in personal {
        write_row(&mut writer, [field.to_string(), value])?;
    }
    blank_row(&mut writer)?;

    write_row(&mut writer, ["PROFESSIONAL INFORMATION"])?;
    let professional = [
        (
            "Department",
            profile
                .department
                .clone()
                .unwrap_or_else(|| "Not Assigned".to_string()),
        ),
        ("Qualification", or_missing(Some(teacher.qualification.clone()))),
        ("Specialization", or_missing(Some(teacher.specialization.clone()))),
        ("Experience (Years)", teacher.experience_years.to_string()),
        ("Hourly Rate", format!("{:.2}", teacher.hourly_rate)),
        ("Status", teacher.status.label().to_string()),
        ("Hire Date", date(teacher.hire_date)),
    ];
    for (field, value) in professional {
        write_row(&mut writer, [field.to_string(), value])?;
    }
    blank_row(&mut writer)?;

    write_row(&mut writer, ["EMERGENCY CONTACT"])?;
    write_row(
        &mut writer,
        [
            "Contact Name".to_string(),
            or_missing(Some(teacher.emergency_contact_name.clone())),
        ],
    )?;
    write_row(
        &mut writer,
        [
            "Contact Phone".to_string(),
            or_missing(Some(teacher.emergency_contact_phone.clone())),
        ],
    )?;
    blank_row(&mut writer)?;

    write_row(&mut writer, ["ASSIGNED SUBJECTS"])?;
    write_row(
        &mut writer,
        ["Subject Code", "Subject Name", "Program", "Type", "Semester"],
    )?;
    for subject in &profile.subjects {
        write_row(
            &mut writer,
            [
                subject.code.clone(),
                subject.name.clone(),
                subject.program_name.clone(),
                subject.subject_type.label().to_string(),
                format!("Semester {}", subject.semester),
            ],
        )?;
    }
    if profile.subjects.is_empty() {
        write_row(&mut writer, ["No subjects assigned"])?;
    }
    blank_row(&mut writer)?;

    let total_hours: f64 = profile.sessions.iter().map(|r| r.session.duration).sum();
    write_row(&mut writer, ["CLASS SUMMARY"])?;
    write_row(
        &mut writer,
        [
            "Period".to_string(),
            format!(
                "{} to {}",
                profile
                    .range
                    .start_date
                    .map_or("All Time".to_string(), |d| d.to_string()),
                profile
                    .range
                    .end_date
                    .map_or("Present".to_string(), |d| d.to_string()),
            ),
        ],
    )?;
    write_row(
        &mut writer,
        [
            "Total Classes Conducted".to_string(),
            profile.sessions.len().to_string(),
        ],
    )?;
    write_row(
        &mut writer,
        ["Total Teaching Hours".to_string(), format!("{:.2}", total_hours)],
    )?;
    blank_row(&mut writer)?;

    write_row(&mut writer, ["DETAILED CLASSES"])?;
    write_row(
        &mut writer,
        [
            "Day",
            "Date",
            "Time",
            "Subject",
            "Program",
            "Room",
            "Duration (hrs)",
            "Status",
            "Notes",
        ],
    )?;
    for row in &profile.sessions {
        write_row(
            &mut writer,
            [
                row.session.day_of_week.label().to_string(),
                row.session.date.format("%Y-%m-%d").to_string(),
                row.session.formatted_time(),
                row.subject_name.clone(),
                row.program_name.clone(),
                or_missing(Some(row.session.room.clone())),
                format!("{:.2}", row.session.duration),
                row.session.status.label().to_string(),
                truncate(&row.session.notes, NOTES_MAX_CHARS),
            ],
        )?;
    }
    if profile.sessions.is_empty() {
        write_row(&mut writer, ["No classes scheduled"])?;
    }
    blank_row(&mut writer)?;

    write_row(&mut writer, ["ATTENDANCE RECORDS"])?;
    write_row(
        &mut writer,
        ["Date", "Subject", "Status", "Check In", "Check Out", "Notes"],
    )?;
    for record in &profile.attendance {
        write_row(
            &mut writer,
            [
                record.date.format("%Y-%m-%d").to_string(),
                or_missing(record.subject_name.clone()),
                record.status.label().to_string(),
                or_missing(record.check_in_time.map(hm)),
                or_missing(record.check_out_time.map(hm)),
                truncate(&record.notes, NOTES_MAX_CHARS),
            ],
        )?;
    }
    if profile.attendance.is_empty() {
        write_row(&mut writer, ["No attendance records"])?;
    }
    blank_row(&mut writer)?;

    write_row(&mut writer, [format!("Report Generated: {}", profile.generated_at)])?;
    finish(writer)
}

async fn render_off_thread<F>(render: F) -> Result<String, AppError>
where
    F: FnOnce() -> Result<String, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(render)
        .await
        .map_err(|_| AppError::InternalServerError)?
}

pub async fn attendance_csv(db: &SqlitePool, range: DateRange) -> Result<CsvExport, AppError> {
    let rows = attendance::fetch_export_rows(db, range.start_date, range.end_date).await?;
    info!("exporting {} attendance rows", rows.len());

    Ok(CsvExport {
        filename: format!("attendance_report_{}.csv", timestamp()),
        body: render_off_thread(move || render_attendance(&rows)).await?,
    })
}

pub async fn schedule_csv(db: &SqlitePool, filter: &ScheduleFilter) -> Result<CsvExport, AppError> {
    let rows = sessions::fetch_schedule(db, filter).await?;
    info!("exporting {} scheduled sessions", rows.len());

    Ok(CsvExport {
        filename: format!("schedule_report_{}.csv", timestamp()),
        body: render_off_thread(move || render_schedule(&rows)).await?,
    })
}

pub async fn teachers_csv(db: &SqlitePool) -> Result<CsvExport, AppError> {
    let list = teachers::fetch_all_teachers(db).await?;
    let names = department_names(departments::fetch_departments(db).await?);
    let hours: HashMap<String, (f64, i64)> =
        stats::fetch_teacher_workloads(db, DateRange::default(), false, -1)
            .await?
            .into_iter()
            .map(|w| (w.id, (w.total_hours, w.session_count)))
            .collect();
    info!("exporting {} teachers", list.len());

    Ok(CsvExport {
        filename: format!("teachers_{}.csv", timestamp()),
        body: render_off_thread(move || render_teachers(&list, &names, &hours)).await?,
    })
}

pub async fn teacher_details_csv(db: &SqlitePool, range: DateRange) -> Result<CsvExport, AppError> {
    let list = teachers::fetch_all_teachers(db).await?;
    let names = department_names(departments::fetch_departments(db).await?);
    let filter = ScheduleFilter {
        start_date: range.start_date,
        end_date: range.end_date,
        ..Default::default()
    };
    let mut sessions_by_teacher: HashMap<String, Vec<ScheduleRow>> = HashMap::new();
    for row in sessions::fetch_schedule(db, &filter).await? {
        sessions_by_teacher
            .entry(row.session.teacher_id.clone())
            .or_default()
            .push(row);
    }
    info!("exporting session details for {} teachers", list.len());

    Ok(CsvExport {
        filename: format!("teacher_details_{}.csv", timestamp()),
        body: render_off_thread(move || render_teacher_details(&list, &names, &sessions_by_teacher))
            .await?,
    })
}

pub async fn teacher_csv(
    db: &SqlitePool,
    teacher_id: &str,
    range: DateRange,
) -> Result<Option<CsvExport>, AppError> {
    let Some(teacher) = teachers::find_teacher_by_id(db, teacher_id).await? else {
        return Ok(None);
    };
    let names = department_names(departments::fetch_departments(db).await?);
    let filter = ScheduleFilter {
        teacher_id: Some(teacher.id.clone()),
        start_date: range.start_date,
        end_date: range.end_date,
        ..Default::default()
    };

    let profile = TeacherProfile {
        department: department_of(&names, &teacher),
        subjects: teachers::fetch_teacher_subjects(db, teacher_id).await?,
        range,
        sessions: sessions::fetch_schedule(db, &filter).await?,
        attendance: attendance::fetch_teacher_records(db, teacher_id, PROFILE_ATTENDANCE_LIMIT)
            .await?,
        generated_at: generated_at(),
        teacher,
    };

    Ok(Some(CsvExport {
        filename: format!(
            "teacher_profile_{}_{}.csv",
            profile.teacher.employee_id,
            timestamp()
        ),
        body: render_teacher_profile(&profile)?,
    }))
}
