use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;

use support::{create_session, create_subject, create_teacher, send, test_app};

async fn check(app: &axum::Router, query: &str) -> Value {
    let (status, body) = send(
        app,
        Method::GET,
        &format!("/sessions/check-conflicts?{}", query),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn pre_submit_check_reports_the_clashing_session() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;
    let other = create_teacher(&app, "Ravi", "EMP002").await;
    let subject = create_subject(&app, "MA101").await;
    let (_, session) =
        create_session(&app, &teacher, &subject, "2024-03-04", "09:00:00", "10:00:00").await;

    let hit = check(
        &app,
        &format!("teacher_id={}&date=2024-03-04&start_time=09:30&end_time=10:30", teacher),
    )
    .await;
    assert_eq!(
        hit,
        json!({ "has_conflict": true, "message": "Conflict with Mathematics (09:00 - 10:00)" })
    );

    let adjacent = check(
        &app,
        &format!("teacher_id={}&date=2024-03-04&start_time=10:00&end_time=11:00", teacher),
    )
    .await;
    assert_eq!(
        adjacent,
        json!({ "has_conflict": false, "message": "No conflicts found" })
    );

    let next_day = check(
        &app,
        &format!("teacher_id={}&date=2024-03-05&start_time=09:00&end_time=10:00", teacher),
    )
    .await;
    assert_eq!(next_day["has_conflict"], false);

    let other_teacher = check(
        &app,
        &format!("teacher_id={}&date=2024-03-04&start_time=09:00&end_time=10:00", other),
    )
    .await;
    assert_eq!(other_teacher["has_conflict"], false);

    let itself = check(
        &app,
        &format!(
            "teacher_id={}&date=2024-03-04&start_time=09:00&end_time=10:00&exclude_id={}",
            teacher,
            session["id"].as_str().unwrap()
        ),
    )
    .await;
    assert_eq!(itself["has_conflict"], false);
}

#[tokio::test]
async fn weekday_scope_matches_any_date_on_that_day() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;
    let subject = create_subject(&app, "MA101").await;
    create_session(&app, &teacher, &subject, "2024-03-11", "14:00:00", "15:00:00").await;

    let monday = check(
        &app,
        &format!("teacher_id={}&day_of_week=monday&start_time=14:30&end_time=15:30", teacher),
    )
    .await;
    assert_eq!(monday["has_conflict"], true);

    let tuesday = check(
        &app,
        &format!("teacher_id={}&day_of_week=tue&start_time=14:30&end_time=15:30", teacher),
    )
    .await;
    assert_eq!(tuesday["has_conflict"], false);
}

#[tokio::test]
async fn malformed_input_never_reports_a_conflict() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;

    let missing = check(&app, "start_time=09:00&end_time=10:00").await;
    assert_eq!(missing, json!({ "has_conflict": false, "message": "Incomplete data" }));

    let no_day = check(&app, &format!("teacher_id={}&start_time=09:00&end_time=10:00", teacher)).await;
    assert_eq!(no_day["message"], "Incomplete data");

    let bad_time = check(
        &app,
        &format!("teacher_id={}&date=2024-03-04&start_time=nine&end_time=10:00", teacher),
    )
    .await;
    assert_eq!(
        bad_time,
        json!({ "has_conflict": false, "message": "Invalid time format, expected HH:MM" })
    );

    let bad_date = check(
        &app,
        &format!("teacher_id={}&date=04/03/2024&start_time=09:00&end_time=10:00", teacher),
    )
    .await;
    assert_eq!(bad_date["has_conflict"], false);
    assert!(bad_date["message"].as_str().unwrap().starts_with("Invalid date"));

    let unknown = check(
        &app,
        "teacher_id=nobody&date=2024-03-04&start_time=09:00&end_time=10:00",
    )
    .await;
    assert_eq!(unknown["has_conflict"], false);
}
