use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TeacherStatus {
    Active,
    Inactive,
    OnLeave,
}

impl TeacherStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TeacherStatus::Active => "Active",
            TeacherStatus::Inactive => "Inactive",
            TeacherStatus::OnLeave => "On Leave",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::PreferNotToSay => "Prefer not to say",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Teacher {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
    pub employee_id: String,
    pub department_id: Option<String>,
    pub qualification: String,
    pub specialization: String,
    pub experience_years: i64,
    pub hourly_rate: f64,
    pub status: TeacherStatus,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub hire_date: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

impl Teacher {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == TeacherStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTeacherRequest {
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    #[validate(length(min = 1, max = 20))]
    pub employee_id: String,
    pub department_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub qualification: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub specialization: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub experience_years: i64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Hourly rate cannot be negative."))]
    pub hourly_rate: f64,
    pub status: Option<TeacherStatus>,
    #[serde(default)]
    pub emergency_contact_name: String,
    #[serde(default)]
    pub emergency_contact_phone: String,
    pub hire_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTeacherRequest {
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    #[validate(length(min = 1, max = 20))]
    pub employee_id: Option<String>,
    pub department_id: Option<String>,
    pub qualification: Option<String>,
    pub specialization: Option<String>,
    #[validate(range(min = 0))]
    pub experience_years: Option<i64>,
    #[validate(range(min = 0.0, message = "Hourly rate cannot be negative."))]
    pub hourly_rate: Option<f64>,
    pub status: Option<TeacherStatus>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub hire_date: Option<NaiveDate>,
}

/// Row shape for the autocomplete endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherOption {
    pub id: String,
    pub name: String,
    pub email: String,
    pub specialization: String,
}

/// Teacher joined with aggregate workload numbers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeacherWorkload {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub total_hours: f64,
    pub session_count: i64,
}
