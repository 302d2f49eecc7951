use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime};
use rand::prelude::IndexedRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::conflict::{ConflictQuery, check_strict};
use crate::db::{classrooms, departments, programs, sessions, subjects, teachers};
use crate::error::AppError;
use crate::models::{
    DayOfWeek, Gender, NewClassRoomRequest, NewDepartmentRequest, NewProgramRequest,
    NewSessionRequest, NewSubjectRequest, NewTeacherRequest, ProgramType, RoomType,
    SessionStatus, SubjectType, TeacherStatus, UpdateSubjectRequest,
};

pub const DEFAULT_SEED: u64 = 42;
pub const MAX_ATTEMPTS: usize = 5;

const SEED_DAYS: [DayOfWeek; 6] = [
    DayOfWeek::Monday,
    DayOfWeek::Tuesday,
    DayOfWeek::Wednesday,
    DayOfWeek::Thursday,
    DayOfWeek::Friday,
    DayOfWeek::Saturday,
];

const TIME_SLOTS: [((u32, u32), (u32, u32)); 9] = [
    ((8, 0), (9, 0)),
    ((9, 0), (10, 0)),
    ((10, 0), (11, 0)),
    ((11, 0), (12, 0)),
    ((14, 0), (15, 0)),
    ((15, 0), (16, 0)),
    ((16, 0), (17, 0)),
    ((9, 0), (11, 0)),
    ((14, 0), (16, 0)),
];

const DEPARTMENTS: [(&str, &str); 5] = [
    ("Computer Science & Engineering", "Software development and computing"),
    ("Electrical Engineering", "Electrical systems and circuit design"),
    ("Mechanical Engineering", "Mechanical systems and design"),
    ("Electronics & Communication", "Electronic systems and communication"),
    ("Basic Sciences", "Physics, Chemistry and Mathematics"),
];

const CLASSROOMS: [(&str, &str, &str, i64, RoomType); 7] = [
    ("Room 101", "Main Building", "1st Floor", 50, RoomType::Classroom),
    ("Room 102", "Main Building", "1st Floor", 45, RoomType::Classroom),
    ("Room 201", "Main Building", "2nd Floor", 40, RoomType::Classroom),
    ("Room 202", "Main Building", "2nd Floor", 35, RoomType::Classroom),
    ("Lab CS-1", "Tech Block", "1st Floor", 30, RoomType::Lab),
    ("Lab CS-2", "Tech Block", "1st Floor", 30, RoomType::Lab),
    ("Auditorium", "Main Building", "Ground Floor", 250, RoomType::Auditorium),
];

/// (code, name, type, semester, credits, hours)
type SubjectTemplate = (&'static str, &'static str, SubjectType, i64, i64, f64);

const BTECH_SUBJECTS: [SubjectTemplate; 8] = [
    ("CS101", "Introduction to Programming", SubjectType::Both, 1, 4, 40.0),
    ("CS102", "Data Structures", SubjectType::Both, 1, 4, 45.0),
    ("MA101", "Mathematics-I", SubjectType::Theory, 1, 4, 40.0),
    ("CS201", "Algorithms", SubjectType::Theory, 2, 4, 40.0),
    ("CS202", "Database Systems", SubjectType::Both, 2, 4, 50.0),
    ("CS301", "Operating Systems", SubjectType::Theory, 3, 3, 40.0),
    ("CS302", "Computer Networks", SubjectType::Theory, 3, 4, 45.0),
    ("CS401", "Machine Learning", SubjectType::Both, 4, 4, 50.0),
];

const MTECH_SUBJECTS: [SubjectTemplate; 3] = [
    ("MT101", "Advanced Algorithms", SubjectType::Theory, 1, 4, 45.0),
    ("MT102", "Research Methodology", SubjectType::Theory, 1, 3, 35.0),
    ("MT104", "Deep Learning", SubjectType::Both, 1, 4, 50.0),
];

/// (first, last, specialization, qualification)
const TEACHERS: [(&str, &str, &str, &str); 10] = [
    ("John", "Smith", "Data Structures", "Ph.D. Computer Science"),
    ("Sarah", "Johnson", "Algorithms", "M.Tech Computer Science"),
    ("Michael", "Williams", "Machine Learning", "Ph.D. AI"),
    ("Emily", "Brown", "Web Development", "M.Sc Computer Science"),
    ("David", "Jones", "Database Systems", "B.Tech Computer Science"),
    ("Jessica", "Davis", "Operating Systems", "M.Tech Computer Science"),
    ("Robert", "Miller", "Computer Networks", "Ph.D. Computer Science"),
    ("Amanda", "Wilson", "Software Engineering", "M.Sc Software Engineering"),
    ("James", "Moore", "Cyber Security", "M.Tech Cyber Security"),
    ("Ashley", "Taylor", "Cloud Computing", "Ph.D. Computer Science"),
];

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub teachers: usize,
    pub sessions_per_teacher: usize,
    pub clear: bool,
    pub seed: u64,
    pub today: NaiveDate,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            teachers: 10,
            sessions_per_teacher: 10,
            clear: false,
            seed: DEFAULT_SEED,
            today: Local::now().date_naive(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SeedStats {
    pub departments: usize,
    pub classrooms: usize,
    pub programs: usize,
    pub subjects: usize,
    pub teachers: usize,
    pub assignments: usize,
    /// Sessions written.
    pub created: usize,
    /// Candidates dropped after hitting an existing booking.
    pub skipped: usize,
}

/// Fills the database with demo data. Every session candidate goes through
/// the same conflict check as a form submission.
pub struct DemoSeeder {
    db: SqlitePool,
    rng: StdRng,
    today: NaiveDate,
}

/// First `day` strictly after `today`.
pub fn next_weekday(today: NaiveDate, day: DayOfWeek) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let mut ahead = day.index() as i64 - current;
    if ahead <= 0 {
        ahead += 7;
    }
    today + Duration::days(ahead)
}

fn hm(h: u32, m: u32) -> Result<NaiveTime, AppError> {
    NaiveTime::from_hms_opt(h, m, 0).ok_or(AppError::InternalServerError)
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

impl DemoSeeder {
    pub fn new(db: SqlitePool, seed: u64, today: NaiveDate) -> Self {
        Self {
            db,
            rng: StdRng::seed_from_u64(seed),
            today,
        }
    }

    pub async fn run(db: SqlitePool, options: &SeedOptions) -> Result<SeedStats, AppError> {
        let mut seeder = DemoSeeder::new(db, options.seed, options.today);
        if options.clear {
            seeder.clear().await?;
        }
        seeder
            .seed_all(options.teachers, options.sessions_per_teacher)
            .await
    }

    pub async fn seed_all(
        &mut self,
        teacher_count: usize,
        sessions_per_teacher: usize,
    ) -> Result<SeedStats, AppError> {
        info!("Starting seed...");
        let mut stats = SeedStats::default();

        stats.departments = self.seed_departments().await?;
        stats.classrooms = self.seed_classrooms().await?;
        stats.programs = self.seed_programs().await?;
        stats.subjects = self.seed_subjects().await?;
        info!(
            "Reference data: {} departments, {} classrooms, {} programs, {} subjects",
            stats.departments, stats.classrooms, stats.programs, stats.subjects
        );

        stats.teachers = self.seed_teachers(teacher_count).await?;
        stats.assignments = self.assign_subjects().await?;
        info!(
            "Created {} teachers and {} subject assignments",
            stats.teachers, stats.assignments
        );

        let (created, skipped) = self.seed_sessions(sessions_per_teacher).await?;
        stats.created = created;
        stats.skipped = skipped;

        info!("Seed completed: {:?}", stats);
        Ok(stats)
    }

    /// Removes every row, children first.
    pub async fn clear(&self) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        for table in [
            "attendance",
            "sessions",
            "subject_teachers",
            "subjects",
            "teachers",
            "programs",
            "classrooms",
            "departments",
        ] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        warn!("Cleared all existing data");
        Ok(())
    }

    async fn seed_departments(&self) -> Result<usize, AppError> {
        let existing: Vec<String> = departments::fetch_departments(&self.db)
            .await?
            .into_iter()
            .map(|d| d.name.to_lowercase())
            .collect();

        let mut created = 0;
        for (name, description) in DEPARTMENTS {
            if existing.contains(&name.to_lowercase()) {
                debug!("department {} already exists", name);
                continue;
            }
            departments::insert_department(
                &self.db,
                NewDepartmentRequest {
                    name: name.to_string(),
                    description: description.to_string(),
                },
            )
            .await?;
            created += 1;
        }
        Ok(created)
    }

    async fn seed_classrooms(&self) -> Result<usize, AppError> {
        let existing: Vec<String> = classrooms::fetch_classrooms(&self.db)
            .await?
            .into_iter()
            .map(|r| r.name.to_lowercase())
            .collect();

        let mut created = 0;
        for (name, building, floor, capacity, room_type) in CLASSROOMS {
            if existing.contains(&name.to_lowercase()) {
                continue;
            }
            classrooms::insert_classroom(
                &self.db,
                NewClassRoomRequest {
                    name: name.to_string(),
                    building: building.to_string(),
                    floor: floor.to_string(),
                    capacity: Some(capacity),
                    room_type: Some(room_type),
                    has_projector: room_type != RoomType::Classroom,
                    has_whiteboard: None,
                    has_computer: room_type == RoomType::Lab,
                    is_available: None,
                    notes: String::new(),
                },
            )
            .await?;
            created += 1;
        }
        Ok(created)
    }

    async fn seed_programs(&self) -> Result<usize, AppError> {
        let existing: Vec<String> = programs::fetch_programs(&self.db)
            .await?
            .into_iter()
            .map(|p| p.code)
            .collect();

        let year = self.today.year();
        let plans = [
            (
                "B.Tech",
                "BTECH",
                ProgramType::Btech,
                4,
                ymd(year - 3, 8, 1),
                "Bachelor of Technology - 4 Year Program",
            ),
            (
                "M.Tech",
                "MTECH",
                ProgramType::Mtech,
                2,
                ymd(year - 1, 8, 1),
                "Master of Technology - 2 Year Program",
            ),
        ];

        let mut created = 0;
        for (name, code, program_type, years, start_date, description) in plans {
            if existing.iter().any(|c| c == code) {
                continue;
            }
            programs::insert_program(
                &self.db,
                NewProgramRequest {
                    name: name.to_string(),
                    code: code.to_string(),
                    program_type: Some(program_type),
                    duration_years: Some(years),
                    start_date,
                    end_date: ymd(year + 1, 5, 31),
                    description: description.to_string(),
                },
            )
            .await?;
            created += 1;
        }
        Ok(created)
    }

    async fn seed_subjects(&self) -> Result<usize, AppError> {
        let mut created = 0;
        for program in programs::fetch_programs(&self.db).await? {
            let templates: &[SubjectTemplate] = match program.code.as_str() {
                "MTECH" => &MTECH_SUBJECTS,
                _ => &BTECH_SUBJECTS,
            };
            for (code, name, subject_type, semester, credits, hours) in templates.iter().cloned() {
                let result = subjects::insert_subject(
                    &self.db,
                    NewSubjectRequest {
                        code: code.to_string(),
                        name: name.to_string(),
                        program_id: program.id.clone(),
                        description: String::new(),
                        subject_type: Some(subject_type),
                        semester: Some(semester),
                        credits: Some(credits),
                        total_hours: Some(hours),
                        teacher_ids: Vec::new(),
                    },
                )
                .await;
                match result {
                    Ok(_) => created += 1,
                    Err(AppError::Conflict(_)) => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(created)
    }

    async fn seed_teachers(&mut self, count: usize) -> Result<usize, AppError> {
        let department_ids: Vec<String> = departments::fetch_departments(&self.db)
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();

        let mut created = 0;
        for i in 0..count {
            let (first, last, specialization, qualification) = TEACHERS[i % TEACHERS.len()];
            let req = NewTeacherRequest {
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: format!(
                    "{}.{}{}@easy2learning.com",
                    first.to_lowercase(),
                    last.to_lowercase(),
                    i
                ),
                phone: format!("+91 98765{}", self.rng.random_range(10000..=99999)),
                address: format!("{} Academic Way, Kolkata", self.rng.random_range(1..=100)),
                date_of_birth: ymd(1975, 1, 1)
                    .map(|d| d + Duration::days(self.rng.random_range(1..=3650))),
                gender: [Gender::Male, Gender::Female].choose(&mut self.rng).copied(),
                employee_id: format!("FAC{:04}", i + 1),
                department_id: department_ids.choose(&mut self.rng).cloned(),
                qualification: qualification.to_string(),
                specialization: specialization.to_string(),
                experience_years: self.rng.random_range(3..=15),
                hourly_rate: self.rng.random_range(80_000..=250_099) as f64 / 100.0,
                status: Some(TeacherStatus::Active),
                emergency_contact_name: format!("{} Family", first),
                emergency_contact_phone: format!("+91 98765{}", self.rng.random_range(10000..=99999)),
                hire_date: Some(self.today - Duration::days(self.rng.random_range(365..=2000))),
            };

            match teachers::insert_teacher(&self.db, req).await {
                Ok(teacher) => {
                    debug!("created teacher {} ({})", teacher.full_name(), teacher.employee_id);
                    created += 1;
                }
                Err(AppError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }

    /// Gives each subject two to four active teachers.
    async fn assign_subjects(&mut self) -> Result<usize, AppError> {
        let active: Vec<String> = teachers::fetch_active_teachers(&self.db)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        if active.is_empty() {
            return Ok(0);
        }

        let mut assignments = 0;
        for subject in subjects::fetch_active_subjects(&self.db).await? {
            let amount = if active.len() < 2 {
                active.len()
            } else {
                self.rng.random_range(2..=active.len().min(4))
            };
            let picked: Vec<String> = active.choose_multiple(&mut self.rng, amount).cloned().collect();
            assignments += picked.len();
            subjects::update_subject(
                &self.db,
                &subject.id,
                UpdateSubjectRequest {
                    teacher_ids: Some(picked),
                    ..Default::default()
                },
            )
            .await?;
        }
        Ok(assignments)
    }

    /// Returns `(created, skipped)`.
    async fn seed_sessions(&mut self, per_teacher: usize) -> Result<(usize, usize), AppError> {
        let active = teachers::fetch_active_teachers(&self.db).await?;
        let room_names: Vec<String> = classrooms::fetch_classrooms(&self.db)
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect();
        let all_subjects: Vec<String> = subjects::fetch_active_subjects(&self.db)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        if all_subjects.is_empty() {
            warn!("No active subjects, skipping sessions");
            return Ok((0, 0));
        }

        let mut created = 0;
        let mut skipped = 0;
        for teacher in &active {
            let mut subject_ids: Vec<String> = teachers::fetch_teacher_subjects(&self.db, &teacher.id)
                .await?
                .into_iter()
                .map(|s| s.id)
                .collect();
            if subject_ids.is_empty() {
                subject_ids = all_subjects.clone();
            }

            let mut created_for_teacher = 0;
            for _ in 0..per_teacher {
                for attempt in 1..=MAX_ATTEMPTS {
                    let candidate = self.draw_candidate(&teacher.id, &subject_ids, &room_names)?;

                    let check = check_strict(
                        &self.db,
                        &ConflictQuery {
                            teacher_id: teacher.id.clone(),
                            date: candidate.date,
                            start_time: candidate.start_time,
                            end_time: candidate.end_time,
                            exclude_session_id: None,
                        },
                    )
                    .await?;
                    if check.has_conflict {
                        debug!("attempt {} for {} hit a booking", attempt, teacher.employee_id);
                        skipped += 1;
                        continue;
                    }

                    match sessions::insert_session(&self.db, candidate).await {
                        Ok(_) => {
                            created += 1;
                            created_for_teacher += 1;
                            break;
                        }
                        Err(AppError::Conflict(_)) => skipped += 1,
                        Err(e) => return Err(e),
                    }
                }
            }
            info!("{}: {} sessions created", teacher.full_name(), created_for_teacher);
        }
        Ok((created, skipped))
    }

    fn draw_candidate(
        &mut self,
        teacher_id: &str,
        subject_ids: &[String],
        rooms: &[String],
    ) -> Result<NewSessionRequest, AppError> {
        let subject_id = subject_ids
            .choose(&mut self.rng)
            .cloned()
            .ok_or(AppError::InternalServerError)?;
        let day = *SEED_DAYS.choose(&mut self.rng).ok_or(AppError::InternalServerError)?;
        let ((sh, sm), (eh, em)) = *TIME_SLOTS.choose(&mut self.rng).ok_or(AppError::InternalServerError)?;
        let weeks_out = self.rng.random_range(0..=2);
        let date = next_weekday(self.today, day) + Duration::weeks(weeks_out);
        let room = rooms
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| format!("Room {}", self.rng.random_range(1..=10)));
        let status = *[SessionStatus::Scheduled, SessionStatus::Completed]
            .choose(&mut self.rng)
            .ok_or(AppError::InternalServerError)?;

        Ok(NewSessionRequest {
            teacher_id: teacher_id.to_string(),
            subject_id,
            date,
            day_of_week: Some(day),
            start_time: hm(sh, sm)?,
            end_time: hm(eh, em)?,
            room,
            status: Some(status),
            notes: "Seeded class".to_string(),
            is_recurring: self.rng.random_bool(0.5),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::TimeRange;
    use crate::db::connect_in_memory;
    use sqlx::FromRow;

    #[derive(Debug, PartialEq, FromRow)]
    struct SeededSession {
        employee_id: String,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        status: SessionStatus,
    }

    async fn seeded_sessions(pool: &SqlitePool) -> Vec<SeededSession> {
        sqlx::query_as::<_, SeededSession>(
            r#"
            SELECT t.employee_id, s.date, s.start_time, s.end_time, s.status
            FROM sessions s JOIN teachers t ON t.id = s.teacher_id
            ORDER BY t.employee_id, s.date, s.start_time, s.end_time, s.status
            "#,
        )
        .fetch_all(pool)
        .await
        .unwrap()
    }

    fn assert_no_double_bookings(rows: &[SeededSession]) {
        let scheduled: Vec<&SeededSession> = rows
            .iter()
            .filter(|r| r.status == SessionStatus::Scheduled)
            .collect();
        for (i, a) in scheduled.iter().enumerate() {
            for b in &scheduled[i + 1..] {
                if a.employee_id != b.employee_id || a.date != b.date {
                    continue;
                }
                let first = TimeRange {
                    start: a.start_time,
                    end: a.end_time,
                };
                let second = TimeRange {
                    start: b.start_time,
                    end: b.end_time,
                };
                assert!(!first.overlaps(&second), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    fn options() -> SeedOptions {
        SeedOptions {
            teachers: 3,
            sessions_per_teacher: 6,
            clear: false,
            seed: DEFAULT_SEED,
            today: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        }
    }

    #[test]
    fn next_weekday_is_strictly_after_today() {
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(
            next_weekday(monday, DayOfWeek::Monday),
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
        assert_eq!(
            next_weekday(monday, DayOfWeek::Wednesday),
            NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()
        );
    }

    #[tokio::test]
    async fn test_seeded_schedule_has_no_double_bookings() {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let stats = DemoSeeder::run(pool.clone(), &options()).await.unwrap();

        assert_eq!(stats.departments, 5);
        assert_eq!(stats.classrooms, 7);
        assert_eq!(stats.programs, 2);
        assert_eq!(stats.subjects, 11);
        assert_eq!(stats.teachers, 3);
        assert!(stats.created > 0);
        assert!(stats.created <= 18);

        let rows = seeded_sessions(&pool).await;
        assert_eq!(rows.len(), stats.created);

        assert_no_double_bookings(&rows);

        for row in &rows {
            assert!(row.date > options().today);
            assert!(row.date <= options().today + Duration::days(21));
        }
    }

    #[tokio::test]
    async fn test_crowded_schedule_skips_clashing_candidates() {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let crowded = SeedOptions {
            teachers: 1,
            sessions_per_teacher: 120,
            ..options()
        };
        let stats = DemoSeeder::run(pool.clone(), &crowded).await.unwrap();

        assert!(stats.skipped > 0, "{:?}", stats);
        assert!(stats.created > 0);
        assert!(stats.created <= 120);

        let rows = seeded_sessions(&pool).await;
        assert_eq!(rows.len(), stats.created);
        assert_no_double_bookings(&rows);
    }

    #[tokio::test]
    async fn test_same_seed_gives_same_schedule() {
        let first = connect_in_memory().await.expect("Failed to create test db");
        let second = connect_in_memory().await.expect("Failed to create test db");

        let a = DemoSeeder::run(first.clone(), &options()).await.unwrap();
        let b = DemoSeeder::run(second.clone(), &options()).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(seeded_sessions(&first).await, seeded_sessions(&second).await);
    }

    #[tokio::test]
    async fn test_reseeding_reuses_reference_data_and_clear_wipes_it() {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        DemoSeeder::run(pool.clone(), &options()).await.unwrap();

        let again = DemoSeeder::run(
            pool.clone(),
            &SeedOptions {
                sessions_per_teacher: 0,
                ..options()
            },
        )
        .await
        .unwrap();
        assert_eq!(again.departments, 0);
        assert_eq!(again.programs, 0);
        assert_eq!(again.teachers, 0);

        let cleared = DemoSeeder::run(
            pool.clone(),
            &SeedOptions {
                clear: true,
                sessions_per_teacher: 0,
                ..options()
            },
        )
        .await
        .unwrap();
        assert_eq!(cleared.departments, 5);
        assert_eq!(cleared.teachers, 3);
        assert!(seeded_sessions(&pool).await.is_empty());
    }
}
