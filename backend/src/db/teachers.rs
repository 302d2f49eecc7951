use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{new_id, now, page_offset, push_clause};
use crate::error::{AppError, unique_violation};
use crate::models::{
    Gender, NewTeacherRequest, Page, Teacher, TeacherStatus, TeacherSubject, UpdateTeacherRequest,
};

pub const TEACHERS_PER_PAGE: i64 = 10;

const TEACHER_COLUMNS: &str = "id, first_name, last_name, email, phone, address, date_of_birth, \
     gender, employee_id, department_id, qualification, specialization, experience_years, \
     hourly_rate, status, emergency_contact_name, emergency_contact_phone, hire_date, \
     created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeacherFilter {
    pub search: Option<String>,
    pub status: Option<TeacherStatus>,
    pub department_id: Option<String>,
    pub page: Option<i64>,
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &TeacherFilter) {
    let mut has_clause = false;
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        push_clause(builder, &mut has_clause);
        builder
            .push("(first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern.clone())
            .push(" OR employee_id LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = filter.status {
        push_clause(builder, &mut has_clause);
        builder.push("status = ").push_bind(status);
    }
    if let Some(department_id) = filter.department_id.clone() {
        push_clause(builder, &mut has_clause);
        builder.push("department_id = ").push_bind(department_id);
    }
}

pub async fn list_teachers(
    db: &SqlitePool,
    filter: &TeacherFilter,
) -> Result<Page<Teacher>, sqlx::Error> {
    let (page, offset) = page_offset(filter.page, TEACHERS_PER_PAGE);

    let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM teachers");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM teachers", TEACHER_COLUMNS));
    push_filters(&mut builder, filter);
    builder
        .push(" ORDER BY last_name, first_name LIMIT ")
        .push_bind(TEACHERS_PER_PAGE)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = builder.build_query_as::<Teacher>().fetch_all(db).await?;

    Ok(Page {
        items,
        page,
        per_page: TEACHERS_PER_PAGE,
        total,
    })
}

pub async fn fetch_all_teachers(db: &SqlitePool) -> Result<Vec<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "SELECT {} FROM teachers ORDER BY last_name, first_name",
        TEACHER_COLUMNS
    ))
    .fetch_all(db)
    .await
}

pub async fn fetch_active_teachers(db: &SqlitePool) -> Result<Vec<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "SELECT {} FROM teachers WHERE status = 'active' ORDER BY last_name, first_name",
        TEACHER_COLUMNS
    ))
    .fetch_all(db)
    .await
}

pub async fn find_teacher_by_id(db: &SqlitePool, id: &str) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!("SELECT {} FROM teachers WHERE id = ?", TEACHER_COLUMNS))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_teacher_subjects(
    db: &SqlitePool,
    teacher_id: &str,
) -> Result<Vec<TeacherSubject>, sqlx::Error> {
    sqlx::query_as::<_, TeacherSubject>(
        r#"
        SELECT DISTINCT s.id, s.code, s.name, p.name AS program_name, s.subject_type, s.semester
        FROM subjects s
        JOIN subject_teachers st ON st.subject_id = s.id
        JOIN programs p ON p.id = s.program_id
        WHERE st.teacher_id = ?
        ORDER BY s.code
        "#,
    )
    .bind(teacher_id)
    .fetch_all(db)
    .await
}

async fn ensure_unique(
    db: &SqlitePool,
    email: &str,
    employee_id: &str,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let email_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM teachers WHERE email = ?1 AND (?2 IS NULL OR id != ?2))",
    )
    .bind(email)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;
    if email_taken {
        return Err(AppError::Conflict(
            "A teacher with this email already exists.".to_string(),
        ));
    }

    let employee_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM teachers WHERE employee_id = ?1 AND (?2 IS NULL OR id != ?2))",
    )
    .bind(employee_id)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;
    if employee_taken {
        return Err(AppError::Conflict(
            "A teacher with this employee ID already exists.".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_department(db: &SqlitePool, department_id: Option<&str>) -> Result<(), AppError> {
    if let Some(id) = department_id {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM departments WHERE id = ?)")
            .bind(id)
            .fetch_one(db)
            .await?;
        if !exists {
            return Err(AppError::BadRequest(format!("department {} does not exist", id)));
        }
    }
    Ok(())
}

pub async fn insert_teacher(db: &SqlitePool, req: NewTeacherRequest) -> Result<Teacher, AppError> {
    ensure_unique(db, &req.email, &req.employee_id, None).await?;
    ensure_department(db, req.department_id.as_deref()).await?;

    let now = now();
    let teacher = Teacher {
        id: new_id(),
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        phone: req.phone,
        address: req.address,
        date_of_birth: req.date_of_birth,
        gender: req.gender.unwrap_or(Gender::PreferNotToSay),
        employee_id: req.employee_id,
        department_id: req.department_id,
        qualification: req.qualification,
        specialization: req.specialization,
        experience_years: req.experience_years,
        hourly_rate: req.hourly_rate,
        status: req.status.unwrap_or(TeacherStatus::Active),
        emergency_contact_name: req.emergency_contact_name,
        emergency_contact_phone: req.emergency_contact_phone,
        hire_date: req.hire_date,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(&format!(
        "INSERT INTO teachers ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        TEACHER_COLUMNS
    ))
    .bind(&teacher.id)
    .bind(&teacher.first_name)
    .bind(&teacher.last_name)
    .bind(&teacher.email)
    .bind(&teacher.phone)
    .bind(&teacher.address)
    .bind(teacher.date_of_birth)
    .bind(teacher.gender)
    .bind(&teacher.employee_id)
    .bind(&teacher.department_id)
    .bind(&teacher.qualification)
    .bind(&teacher.specialization)
    .bind(teacher.experience_years)
    .bind(teacher.hourly_rate)
    .bind(teacher.status)
    .bind(&teacher.emergency_contact_name)
    .bind(&teacher.emergency_contact_phone)
    .bind(teacher.hire_date)
    .bind(&teacher.created_at)
    .bind(&teacher.updated_at)
    .execute(db)
    .await
    .map_err(|e| unique_violation(e, "A teacher with this email or employee ID already exists."))?;

    Ok(teacher)
}

pub async fn update_teacher(
    db: &SqlitePool,
    id: &str,
    req: UpdateTeacherRequest,
) -> Result<Option<Teacher>, AppError> {
    let mut current = match find_teacher_by_id(db, id).await? {
        Some(t) => t,
        None => return Ok(None),
    };

    if let Some(first_name) = req.first_name {
        current.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        current.last_name = last_name;
    }
    if let Some(email) = req.email {
        current.email = email;
    }
    if let Some(phone) = req.phone {
        current.phone = phone;
    }
    if let Some(address) = req.address {
        current.address = address;
    }
    if req.date_of_birth.is_some() {
        current.date_of_birth = req.date_of_birth;
    }
    if let Some(gender) = req.gender {
        current.gender = gender;
    }
    if let Some(employee_id) = req.employee_id {
        current.employee_id = employee_id;
    }
    if req.department_id.is_some() {
        current.department_id = req.department_id;
    }
    if let Some(qualification) = req.qualification {
        current.qualification = qualification;
    }
    if let Some(specialization) = req.specialization {
        current.specialization = specialization;
    }
    if let Some(experience_years) = req.experience_years {
        current.experience_years = experience_years;
    }
    if let Some(hourly_rate) = req.hourly_rate {
        current.hourly_rate = hourly_rate;
    }
    if let Some(status) = req.status {
        current.status = status;
    }
    if let Some(name) = req.emergency_contact_name {
        current.emergency_contact_name = name;
    }
    if let Some(phone) = req.emergency_contact_phone {
        current.emergency_contact_phone = phone;
    }
    if req.hire_date.is_some() {
        current.hire_date = req.hire_date;
    }

    ensure_unique(db, &current.email, &current.employee_id, Some(id)).await?;
    ensure_department(db, current.department_id.as_deref()).await?;
    current.updated_at = now();

    sqlx::query(
        r#"
        UPDATE teachers
        SET first_name = ?, last_name = ?, email = ?, phone = ?, address = ?,
            date_of_birth = ?, gender = ?, employee_id = ?, department_id = ?,
            qualification = ?, specialization = ?, experience_years = ?, hourly_rate = ?,
            status = ?, emergency_contact_name = ?, emergency_contact_phone = ?,
            hire_date = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&current.first_name)
    .bind(&current.last_name)
    .bind(&current.email)
    .bind(&current.phone)
    .bind(&current.address)
    .bind(current.date_of_birth)
    .bind(current.gender)
    .bind(&current.employee_id)
    .bind(&current.department_id)
    .bind(&current.qualification)
    .bind(&current.specialization)
    .bind(current.experience_years)
    .bind(current.hourly_rate)
    .bind(current.status)
    .bind(&current.emergency_contact_name)
    .bind(&current.emergency_contact_phone)
    .bind(current.hire_date)
    .bind(&current.updated_at)
    .bind(id)
    .execute(db)
    .await
    .map_err(|e| unique_violation(e, "A teacher with this email or employee ID already exists."))?;

    Ok(Some(current))
}

pub async fn delete_teacher(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM teachers WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}
