use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RoomType {
    Classroom,
    Lab,
    Auditorium,
    MeetingRoom,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassRoom {
    pub id: String,
    pub name: String,
    pub building: String,
    pub floor: String,
    pub capacity: i64,
    pub room_type: RoomType,
    pub has_projector: bool,
    pub has_whiteboard: bool,
    pub has_computer: bool,
    pub is_available: bool,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewClassRoomRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub floor: String,
    #[validate(range(min = 1))]
    pub capacity: Option<i64>,
    pub room_type: Option<RoomType>,
    #[serde(default)]
    pub has_projector: bool,
    pub has_whiteboard: Option<bool>,
    #[serde(default)]
    pub has_computer: bool,
    pub is_available: Option<bool>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateClassRoomRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    pub building: Option<String>,
    pub floor: Option<String>,
    #[validate(range(min = 1))]
    pub capacity: Option<i64>,
    pub room_type: Option<RoomType>,
    pub has_projector: Option<bool>,
    pub has_whiteboard: Option<bool>,
    pub has_computer: Option<bool>,
    pub is_available: Option<bool>,
    pub notes: Option<String>,
}
