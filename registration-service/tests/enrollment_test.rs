//! Enrollment lifecycle against PostgreSQL.

mod common;

use common::TestApp;
use serde_json::{json, Value};
use uuid::Uuid;

async fn paid_registration(app: &TestApp, token: &str, student_id: Uuid) -> String {
    let registration = app.create_registration(token, student_id, "ONE_MONTH").await;
    let response = app
        .post(
            "/api/registration-payments/pay",
            token,
            json!({
                "registrationId": registration["id"],
                "paymentMethod": "CASH",
                "receiptNumber": format!("RCPT-{}", student_id.simple()),
                "paidAmount": 1500
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    registration["id"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn enroll_unenroll_and_enroll_again() {
    let app = TestApp::spawn().await;
    let fx = app.seed(30).await;
    let token = app.token_for(&fx.admin);
    let registration_id = paid_registration(&app, &token, fx.student_id).await;

    let enroll = json!({ "registrationId": registration_id, "classId": fx.class_id });

    let response = app.post("/api/enrollments", &token, enroll.clone()).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["registration"]["status"], "ENROLLED");
    assert_eq!(body["enrollment"]["status"], "ACTIVE");
    assert_eq!(body["enrollment"]["classId"], fx.class_id.to_string());

    let duplicate = app.post("/api/enrollments", &token, enroll.clone()).await;
    assert_eq!(duplicate.status().as_u16(), 400);
    let body: Value = duplicate.json().await.unwrap();
    assert_eq!(body["error"], "Student already enrolled");

    let response = app
        .post(
            "/api/enrollments/unenroll",
            &token,
            json!({ "registrationId": registration_id }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["registration"]["status"], "PAYMENT_COMPLETED");

    let again = app.post("/api/enrollments", &token, enroll).await;
    assert_eq!(again.status().as_u16(), 200);

    let active: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE status = 'ACTIVE'")
            .fetch_one(app.db.pool())
            .await
            .unwrap();
    assert_eq!(active, 1);
    assert_eq!(app.count("enrollments").await, 2);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn unpaid_registration_cannot_be_enrolled() {
    let app = TestApp::spawn().await;
    let fx = app.seed(30).await;
    let token = app.token_for(&fx.admin);
    let registration = app.create_registration(&token, fx.student_id, "ONE_MONTH").await;

    let response = app
        .post(
            "/api/enrollments",
            &token,
            json!({ "registrationId": registration["id"], "classId": fx.class_id }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Registration payment not completed");
    assert_eq!(app.count("enrollments").await, 0);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn full_class_rejects_enrollment() {
    let app = TestApp::spawn().await;
    let fx = app.seed(1).await;
    let token = app.token_for(&fx.admin);
    let sibling = app
        .insert_student(fx.school_id, fx.branch_id, fx.grade_id, "Hana", "Tesfaye")
        .await;

    let first = paid_registration(&app, &token, fx.student_id).await;
    let second = paid_registration(&app, &token, sibling).await;

    let response = app
        .post(
            "/api/enrollments",
            &token,
            json!({ "registrationId": first, "classId": fx.class_id }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .post(
            "/api/enrollments",
            &token,
            json!({ "registrationId": second, "classId": fx.class_id }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Class is at full capacity");

    let stats = app.get("/api/enrollments/stats", &token).await;
    assert_eq!(stats.status().as_u16(), 200);
    let body: Value = stats.json().await.unwrap();
    assert_eq!(body["enrolled"], 1);
    assert_eq!(body["readyForEnrollment"], 1);
    assert_eq!(body["totalRegistrations"], 2);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn enrolled_students_export_as_csv() {
    let app = TestApp::spawn().await;
    let fx = app.seed(30).await;
    let token = app.token_for(&fx.admin);
    let registration_id = paid_registration(&app, &token, fx.student_id).await;

    app.post(
        "/api/enrollments",
        &token,
        json!({ "registrationId": registration_id, "classId": fx.class_id }),
    )
    .await;

    let response = app.get("/api/enrollments/export", &token).await;
    assert_eq!(response.status().as_u16(), 200);
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .starts_with("text/csv"));
    assert!(response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .contains("enrolled-students"));

    let body = response.text().await.unwrap();
    assert_eq!(body.lines().count(), 2);
    assert!(body.contains("Sara"));

    app.cleanup().await;
}
