use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SubjectType {
    Theory,
    Practical,
    Both,
}

impl SubjectType {
    pub fn label(&self) -> &'static str {
        match self {
            SubjectType::Theory => "Theory",
            SubjectType::Practical => "Practical",
            SubjectType::Both => "Theory + Practical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subject {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: String,
    pub program_id: String,
    pub subject_type: SubjectType,
    pub semester: i64,
    pub credits: i64,
    pub total_hours: f64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Subject with its program name and assigned teacher ids, as listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub program_name: String,
    pub teacher_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeacherSubject {
    pub id: String,
    pub code: String,
    pub name: String,
    pub program_name: String,
    pub subject_type: SubjectType,
    pub semester: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSubjectRequest {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub program_id: String,
    #[serde(default)]
    pub description: String,
    pub subject_type: Option<SubjectType>,
    #[validate(range(min = 1, max = 10))]
    pub semester: Option<i64>,
    #[validate(range(min = 0))]
    pub credits: Option<i64>,
    #[validate(range(min = 0.0))]
    pub total_hours: Option<f64>,
    #[serde(default)]
    pub teacher_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateSubjectRequest {
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub program_id: Option<String>,
    pub description: Option<String>,
    pub subject_type: Option<SubjectType>,
    #[validate(range(min = 1, max = 10))]
    pub semester: Option<i64>,
    #[validate(range(min = 0))]
    pub credits: Option<i64>,
    #[validate(range(min = 0.0))]
    pub total_hours: Option<f64>,
    pub is_active: Option<bool>,
    pub teacher_ids: Option<Vec<String>>,
}
