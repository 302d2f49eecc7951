#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower::ServiceExt;

use faculty_backend::api::router;
use faculty_backend::db;
use faculty_backend::state::AppState;

pub async fn test_app() -> (Router, SqlitePool) {
    let pool = db::connect_in_memory().await.expect("Failed to create test db");
    (router(AppState::new(pool.clone())), pool)
}

pub async fn send_bytes(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("call router");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, headers, bytes.to_vec())
}

pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, String) {
    let (status, headers, bytes) = send_bytes(app, method, uri, body).await;
    (status, headers, String::from_utf8(bytes).expect("utf-8 body"))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, text) = send_raw(app, method, uri, body).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).expect("json body")
    };
    (status, value)
}

pub async fn create_teacher(app: &Router, first_name: &str, employee_id: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/teachers",
        Some(json!({
            "first_name": first_name,
            "last_name": "Sen",
            "email": format!("{}@example.edu", employee_id.to_lowercase()),
            "phone": "+91 9876500000",
            "employee_id": employee_id,
            "specialization": "Mathematics",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().expect("teacher id").to_string()
}

pub async fn create_subject(app: &Router, code: &str) -> String {
    let (status, program) = send(
        app,
        Method::POST,
        "/programs",
        Some(json!({
            "name": format!("Program {}", code),
            "code": format!("P{}", code),
            "program_type": "btech",
            "description": "Undergraduate engineering",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", program);

    let (status, subject) = send(
        app,
        Method::POST,
        "/subjects",
        Some(json!({
            "code": code,
            "name": "Mathematics",
            "program_id": program["id"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", subject);
    subject["id"].as_str().expect("subject id").to_string()
}

pub async fn create_session(
    app: &Router,
    teacher_id: &str,
    subject_id: &str,
    date: &str,
    start: &str,
    end: &str,
) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/sessions",
        Some(json!({
            "teacher_id": teacher_id,
            "subject_id": subject_id,
            "date": date,
            "start_time": start,
            "end_time": end,
            "room": "Room 101",
        })),
    )
    .await
}
