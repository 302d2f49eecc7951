use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProgramType {
    Jelet,
    Wbjee,
    Diploma,
    Btech,
    Mtech,
    Others,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Program {
    pub id: String,
    pub name: String,
    pub code: String,
    pub program_type: ProgramType,
    pub duration_years: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgramSummary {
    pub id: String,
    pub name: String,
    pub code: String,
    pub program_type: ProgramType,
    pub is_active: bool,
    pub total_subjects: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProgramRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    pub program_type: Option<ProgramType>,
    #[validate(range(min = 1, max = 5))]
    pub duration_years: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProgramRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    pub program_type: Option<ProgramType>,
    #[validate(range(min = 1, max = 5))]
    pub duration_years: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Rejects a date range whose end does not fall after its start.
pub fn check_program_dates(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<(), String> {
    match (start_date, end_date) {
        (Some(start), Some(end)) if end <= start => {
            Err("End date must be after start date.".to_string())
        }
        _ => Ok(()),
    }
}
