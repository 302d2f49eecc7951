use sqlx::SqlitePool;

use crate::db::{new_id, now};
use crate::error::{AppError, unique_violation};
use crate::models::{ClassRoom, NewClassRoomRequest, RoomType, UpdateClassRoomRequest};

const DUPLICATE_NAME: &str = "A room with this name already exists.";

const CLASSROOM_COLUMNS: &str = "id, name, building, floor, capacity, room_type, has_projector, \
     has_whiteboard, has_computer, is_available, notes, created_at, updated_at";

pub async fn fetch_classrooms(db: &SqlitePool) -> Result<Vec<ClassRoom>, sqlx::Error> {
    sqlx::query_as::<_, ClassRoom>(&format!(
        "SELECT {} FROM classrooms ORDER BY building, name",
        CLASSROOM_COLUMNS
    ))
    .fetch_all(db)
    .await
}

pub async fn find_classroom_by_id(db: &SqlitePool, id: &str) -> Result<Option<ClassRoom>, sqlx::Error> {
    sqlx::query_as::<_, ClassRoom>(&format!(
        "SELECT {} FROM classrooms WHERE id = ?",
        CLASSROOM_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_classroom(db: &SqlitePool, req: NewClassRoomRequest) -> Result<ClassRoom, AppError> {
    let now = now();
    let room = ClassRoom {
        id: new_id(),
        name: req.name.trim().to_string(),
        building: req.building,
        floor: req.floor,
        capacity: req.capacity.unwrap_or(30),
        room_type: req.room_type.unwrap_or(RoomType::Classroom),
        has_projector: req.has_projector,
        has_whiteboard: req.has_whiteboard.unwrap_or(true),
        has_computer: req.has_computer,
        is_available: req.is_available.unwrap_or(true),
        notes: req.notes,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(&format!(
        "INSERT INTO classrooms ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        CLASSROOM_COLUMNS
    ))
    .bind(&room.id)
    .bind(&room.name)
    .bind(&room.building)
    .bind(&room.floor)
    .bind(room.capacity)
    .bind(room.room_type)
    .bind(room.has_projector)
    .bind(room.has_whiteboard)
    .bind(room.has_computer)
    .bind(room.is_available)
    .bind(&room.notes)
    .bind(&room.created_at)
    .bind(&room.updated_at)
    .execute(db)
    .await
    .map_err(|e| unique_violation(e, DUPLICATE_NAME))?;

    Ok(room)
}

pub async fn update_classroom(
    db: &SqlitePool,
    id: &str,
    req: UpdateClassRoomRequest,
) -> Result<Option<ClassRoom>, AppError> {
    let Some(mut current) = find_classroom_by_id(db, id).await? else {
        return Ok(None);
    };

    if let Some(name) = req.name {
        current.name = name.trim().to_string();
    }
    if let Some(building) = req.building {
        current.building = building;
    }
    if let Some(floor) = req.floor {
        current.floor = floor;
    }
    if let Some(capacity) = req.capacity {
        current.capacity = capacity;
    }
    if let Some(room_type) = req.room_type {
        current.room_type = room_type;
    }
    if let Some(v) = req.has_projector {
        current.has_projector = v;
    }
    if let Some(v) = req.has_whiteboard {
        current.has_whiteboard = v;
    }
    if let Some(v) = req.has_computer {
        current.has_computer = v;
    }
    if let Some(v) = req.is_available {
        current.is_available = v;
    }
    if let Some(notes) = req.notes {
        current.notes = notes;
    }
    current.updated_at = now();

    sqlx::query(
        r#"
        UPDATE classrooms
        SET name = ?, building = ?, floor = ?, capacity = ?, room_type = ?, has_projector = ?,
            has_whiteboard = ?, has_computer = ?, is_available = ?, notes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&current.name)
    .bind(&current.building)
    .bind(&current.floor)
    .bind(current.capacity)
    .bind(current.room_type)
    .bind(current.has_projector)
    .bind(current.has_whiteboard)
    .bind(current.has_computer)
    .bind(current.is_available)
    .bind(&current.notes)
    .bind(&current.updated_at)
    .bind(id)
    .execute(db)
    .await
    .map_err(|e| unique_violation(e, DUPLICATE_NAME))?;

    Ok(Some(current))
}

pub async fn delete_classroom(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM classrooms WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}
