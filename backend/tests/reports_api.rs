use axum::http::{Method, StatusCode, header};
use serde_json::json;

#[path = "support/mod.rs"]
mod support;

use support::{create_session, create_subject, create_teacher, send, send_bytes, send_raw, test_app};

#[tokio::test]
async fn attendance_export_is_a_guarded_csv_attachment() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;
    let subject = create_subject(&app, "MA101").await;
    let (_, session) =
        create_session(&app, &teacher, &subject, "2024-03-04", "09:00:00", "10:00:00").await;

    let record = json!({
        "session_id": session["id"],
        "teacher_id": teacher,
        "date": "2024-03-04",
        "check_in_time": "08:55:00",
        "notes": "=1+1",
    });
    let (status, _) = send(&app, Method::POST, "/attendance", Some(record.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, "/attendance", Some(record)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["message"],
        "Attendance record already exists for Asha Sen on 2024-03-04 for this session."
    );

    let (status, headers, csv) = send_raw(
        &app,
        Method::GET,
        "/reports/export/attendance.csv?start_date=2024-03-01&end_date=2024-03-31",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"attendance_report_"));

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Date,Teacher,Subject,Session Date,Status,Check In,Check Out,Notes");
    assert_eq!(
        lines[1],
        "2024-03-04,Asha Sen,Mathematics,2024-03-04,Present,08:55,N/A,'=1+1"
    );

    let (_, _, empty) = send_raw(
        &app,
        Method::GET,
        "/reports/export/attendance.csv?start_date=2024-04-01",
        None,
    )
    .await;
    assert_eq!(empty.lines().count(), 1);
}

#[tokio::test]
async fn teacher_exports_and_summary() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;
    let subject = create_subject(&app, "MA101").await;
    create_session(&app, &teacher, &subject, "2024-03-04", "09:00:00", "11:00:00").await;

    let (status, _, csv) = send_raw(&app, Method::GET, "/reports/export/teachers.csv", None).await;
    assert_eq!(status, StatusCode::OK);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Employee ID,First Name,Last Name"));
    assert!(lines[1].starts_with("EMP001,Asha,Sen,emp001@example.edu,+91 9876500000,"));
    assert!(lines[1].ends_with(",2.00,1"));

    let (status, headers, csv) = send_raw(
        &app,
        Method::GET,
        &format!("/teachers/{}/export.csv", teacher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("teacher_profile_EMP001_")
    );
    let lines: Vec<&str> = csv.lines().collect();
    for expected in [
        "PERSONAL INFORMATION",
        "Phone,+91 9876500000",
        "EMERGENCY CONTACT",
        "Period,All Time to Present",
        "Total Classes Conducted,1",
        "Total Teaching Hours,2.00",
        "Monday,2024-03-04,09:00 AM - 11:00 AM,Mathematics,Program MA101,Room 101,2.00,Scheduled,",
        "No attendance records",
    ] {
        assert!(lines.contains(&expected), "missing {:?} in\n{}", expected, csv);
    }

    let (status, _, csv) = send_raw(
        &app,
        Method::GET,
        &format!("/teachers/{}/export.csv?start_date=2024-03-05", teacher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let lines: Vec<&str> = csv.lines().collect();
    assert!(lines.contains(&"Period,2024-03-05 to Present"));
    assert!(lines.contains(&"Total Classes Conducted,0"));
    assert!(lines.contains(&"No classes scheduled"));

    let (status, summary) = send(&app, Method::GET, &format!("/teachers/{}/summary", teacher), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["employee_id"], "EMP001");
    assert_eq!(summary["total_hours"], 2.0);
    assert_eq!(summary["session_count"], 1);
    assert_eq!(summary["recent_sessions"].as_array().unwrap().len(), 1);

    let (status, _, _) = send_raw(&app, Method::GET, "/teachers/missing/export.csv", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schedule_export_filters_by_teacher_and_day() {
    let (app, _pool) = test_app().await;
    let asha = create_teacher(&app, "Asha", "EMP001").await;
    let ravi = create_teacher(&app, "Ravi", "EMP002").await;
    let subject = create_subject(&app, "MA101").await;
    create_session(&app, &asha, &subject, "2024-03-05", "14:00:00", "15:00:00").await;
    create_session(&app, &asha, &subject, "2024-03-04", "09:00:00", "11:00:00").await;
    create_session(&app, &ravi, &subject, "2024-03-04", "09:00:00", "10:00:00").await;

    let (status, headers, csv) =
        send_raw(&app, Method::GET, "/reports/export/schedule.csv", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("schedule_report_")
    );
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "Day,Time,Teacher,Subject,Program,Room,Duration (hrs),Status"
    );
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("Monday,09:00 AM - "));
    assert!(lines[2].starts_with("Monday,09:00 AM - "));
    assert_eq!(
        lines[3],
        "Tuesday,02:00 PM - 03:00 PM,Asha Sen,Mathematics,Program MA101,Room 101,1.00,Scheduled"
    );

    let (_, _, csv) = send_raw(
        &app,
        Method::GET,
        &format!("/reports/export/schedule.csv?teacher={}&day=monday", asha),
        None,
    )
    .await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[1..],
        ["Monday,09:00 AM - 11:00 AM,Asha Sen,Mathematics,Program MA101,Room 101,2.00,Scheduled"]
    );

    let (_, _, csv) = send_raw(
        &app,
        Method::GET,
        "/reports/export/schedule.csv?start_date=2024-03-05&end_date=2024-03-31",
        None,
    )
    .await;
    assert_eq!(csv.lines().count(), 2);
}

#[tokio::test]
async fn teacher_details_export_keeps_idle_teachers() {
    let (app, _pool) = test_app().await;
    let asha = create_teacher(&app, "Asha", "EMP001").await;
    create_teacher(&app, "Ravi", "EMP002").await;
    let subject = create_subject(&app, "MA101").await;
    create_session(&app, &asha, &subject, "2024-03-04", "09:00:00", "11:00:00").await;
    create_session(&app, &asha, &subject, "2024-03-05", "09:00:00", "10:00:00").await;

    let (status, headers, csv) = send_raw(
        &app,
        Method::GET,
        "/reports/export/teacher-details.csv",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("teacher_details_")
    );
    let lines: Vec<&str> = csv.lines().collect();
    assert!(lines[0].starts_with("Teacher Name,Employee ID,Email,Department"));
    assert_eq!(lines.len(), 4);
    assert_eq!(lines.iter().filter(|l| l.starts_with("Asha Sen,EMP001,")).count(), 2);
    assert!(lines.iter().any(|l| l.ends_with(
        ",Mathematics,Program MA101,Monday,09:00 AM - 11:00 AM,Room 101,2.00,Scheduled,2024-03-04"
    )));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("Ravi Sen,EMP002,") && l.ends_with(",No sessions,,,,,0,,")));

    let (_, _, csv) = send_raw(
        &app,
        Method::GET,
        "/reports/export/teacher-details.csv?start_date=2024-03-05",
        None,
    )
    .await;
    assert_eq!(
        csv.lines().filter(|l| l.starts_with("Asha Sen,EMP001,")).count(),
        1
    );
}

#[tokio::test]
async fn faculty_report_is_a_pdf_attachment() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;
    let subject = create_subject(&app, "MA101").await;
    create_session(&app, &teacher, &subject, "2024-03-04", "09:00:00", "11:00:00").await;

    let (status, headers, body) = send_bytes(
        &app,
        Method::GET,
        "/reports/export/report.pdf?start_date=2024-03-01&end_date=2024-03-31",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert!(
        headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"faculty_report_")
    );
    assert!(body.starts_with(b"%PDF"));

    let (status, _, _) = send_bytes(
        &app,
        Method::GET,
        "/reports/export/report.pdf?start_date=2024-03-31&end_date=2024-03-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_and_dashboard_aggregate_sessions() {
    let (app, _pool) = test_app().await;
    let teacher = create_teacher(&app, "Asha", "EMP001").await;
    create_teacher(&app, "Ravi", "EMP002").await;
    let subject = create_subject(&app, "MA101").await;
    create_session(&app, &teacher, &subject, "2024-03-04", "09:00:00", "11:00:00").await;
    create_session(&app, &teacher, &subject, "2024-03-20", "09:00:00", "10:00:00").await;

    let (status, report) = send(
        &app,
        Method::GET,
        "/reports?start_date=2024-03-01&end_date=2024-03-10",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_sessions"], 1);
    assert_eq!(report["total_hours"], 2.0);
    assert_eq!(report["teacher_utilization"].as_array().unwrap().len(), 1);
    assert_eq!(report["weekly_trends"].as_array().unwrap().len(), 8);
    assert_eq!(report["weekly_trends"][7]["week"], "Week 8");
    assert_eq!(report["weekly_trends"][7]["count"], 1);

    let (status, _) = send(
        &app,
        Method::GET,
        "/reports?start_date=2024-03-10&end_date=2024-03-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, dashboard) = send(&app, Method::GET, "/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["total_teachers"], 2);
    assert_eq!(dashboard["active_teachers"], 2);
    assert_eq!(dashboard["total_sessions"], 2);
    assert_eq!(dashboard["teacher_hours"][0]["total_hours"], 3.0);
}

#[tokio::test]
async fn health_and_catalog_endpoints() {
    let (app, _pool) = test_app().await;
    let (status, _) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, department) = send(
        &app,
        Method::POST,
        "/departments",
        Some(json!({ "name": "Basic Sciences", "description": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/departments",
        Some(json!({ "name": "basic sciences", "description": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, room) = send(
        &app,
        Method::POST,
        "/classrooms",
        Some(json!({ "name": "Lab CS-1", "room_type": "lab", "capacity": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(room["has_whiteboard"], true);

    let (status, _) = send(
        &app,
        Method::POST,
        "/classrooms",
        Some(json!({ "name": "Tiny", "capacity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/departments/{}", department["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, list) = send(&app, Method::GET, "/departments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}
