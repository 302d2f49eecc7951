use axum::http::{Method, StatusCode};
use serde_json::json;

#[path = "support/mod.rs"]
mod support;

use support::{create_session, create_subject, create_teacher, send, test_app};

#[tokio::test]
async fn double_booking_is_refused_with_409() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;
    let subject = create_subject(&app, "MA101").await;

    let (status, first) =
        create_session(&app, &teacher, &subject, "2024-03-04", "09:00:00", "10:00:00").await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["day_of_week"], "monday");
    assert_eq!(first["duration"], 1.0);

    let (status, body) =
        create_session(&app, &teacher, &subject, "2024-03-04", "09:30:00", "10:30:00").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["message"],
        "Teacher Asha Sen already has Mathematics scheduled from 09:00 to 10:00 on 2024-03-04."
    );

    let (status, _) =
        create_session(&app, &teacher, &subject, "2024-03-04", "10:00:00", "11:00:00").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) =
        create_session(&app, &teacher, &subject, "2024-03-05", "09:00:00", "10:00:00").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = send(
        &app,
        Method::GET,
        &format!("/sessions?teacher_id={}&day_of_week=monday", teacher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["per_page"], 15);
    assert_eq!(page["items"][0]["start_time"], "09:00:00");
    assert_eq!(page["items"][1]["start_time"], "10:00:00");
}

#[tokio::test]
async fn editing_a_session_checks_against_the_others_only() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;
    let subject = create_subject(&app, "MA101").await;

    let (_, morning) =
        create_session(&app, &teacher, &subject, "2024-03-04", "09:00:00", "10:00:00").await;
    let (_, late) =
        create_session(&app, &teacher, &subject, "2024-03-04", "11:00:00", "12:00:00").await;
    let morning_id = morning["id"].as_str().unwrap();
    let late_id = late["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/sessions/{}", morning_id),
        Some(json!({ "end_time": "10:30:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["duration"], 1.5);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/sessions/{}", late_id),
        Some(json!({ "start_time": "10:00:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/sessions/{}", morning_id),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/sessions/{}", late_id),
        Some(json!({ "start_time": "09:00:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["start_time"], "09:00:00");
}

#[tokio::test]
async fn invalid_sessions_are_rejected() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;
    let subject = create_subject(&app, "MA101").await;

    let (status, body) =
        create_session(&app, &teacher, &subject, "2024-03-04", "10:00:00", "09:00:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "End time must be after start time.");

    let (status, _) =
        create_session(&app, "missing", &subject, "2024-03-04", "09:00:00", "10:00:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/sessions/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/sessions/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inactive_teachers_cannot_be_scheduled() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;
    let subject = create_subject(&app, "MA101").await;

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/teachers/{}", teacher),
        Some(json!({ "status": "on_leave" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        create_session(&app, &teacher, &subject, "2024-03-04", "09:00:00", "10:00:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("not active"));

    let (status, active) = send(&app, Method::GET, "/teachers/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active, json!([]));
}
