//! Receipts and FS numbers against PostgreSQL.

mod common;

use common::TestApp;
use serde_json::{json, Value};

async fn paid_invoice(app: &TestApp, token: &str, student_id: uuid::Uuid) -> String {
    let registration = app.create_registration(token, student_id, "ONE_MONTH").await;
    let response = app
        .post(
            "/api/registration-payments/pay",
            token,
            json!({
                "registrationId": registration["id"],
                "paymentMethod": "CASH",
                "receiptNumber": "RCPT-100",
                "paidAmount": 1500
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    body["invoice"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn receipt_waits_for_fs_number() {
    let app = TestApp::spawn().await;
    let fx = app.seed(30).await;
    let token = app.token_for(&fx.admin);
    let invoice_id = paid_invoice(&app, &token, fx.student_id).await;

    let response = app.get(&format!("/api/receipts/{}", invoice_id), &token).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "FS number required");
    assert_eq!(body["needsFsNumber"], true);
    assert_eq!(body["invoicesNeedingFs"][0]["id"], invoice_id);
    assert_eq!(body["invoicesNeedingFs"][0]["studentName"], "Sara Tesfaye");

    let check = app
        .get(&format!("/api/receipts/{}/check-fs", invoice_id), &token)
        .await;
    let body: Value = check.json().await.unwrap();
    assert_eq!(body["hasFs"], false);
    assert_eq!(body["needsFsNumber"], true);

    let response = app
        .put(
            &format!("/api/receipts/{}/fs-number", invoice_id),
            &token,
            json!({ "fsNumber": " FS-0042 " }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "FS number updated successfully");
    assert_eq!(body["fsNumber"], "FS-0042");

    let response = app.get(&format!("/api/receipts/{}", invoice_id), &token).await;
    assert_eq!(response.status().as_u16(), 200);
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .starts_with("text/html"));
    let html = response.text().await.unwrap();
    assert!(html.contains("Sara Tesfaye"));
    assert!(html.contains("1 Month"));
    assert!(html.contains("FS-0042"));
    assert!(html.contains("Bright Future Academy"));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn fs_number_is_assigned_once() {
    let app = TestApp::spawn().await;
    let fx = app.seed(30).await;
    let token = app.token_for(&fx.admin);
    let invoice_id = paid_invoice(&app, &token, fx.student_id).await;
    let path = format!("/api/receipts/{}/fs-number", invoice_id);

    let first = app.put(&path, &token, json!({ "fsNumber": "FS-1" })).await;
    assert_eq!(first.status().as_u16(), 200);

    let same = app.put(&path, &token, json!({ "fsNumber": "FS-1" })).await;
    assert_eq!(same.status().as_u16(), 200);

    let other = app.put(&path, &token, json!({ "fsNumber": "FS-2" })).await;
    assert_eq!(other.status().as_u16(), 400);
    let body: Value = other.json().await.unwrap();
    assert_eq!(body["error"], "FS number already assigned");

    let blank = app.put(&path, &token, json!({ "fsNumber": "  " })).await;
    assert_eq!(blank.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn parent_lookup_and_combined_receipt() {
    let app = TestApp::spawn().await;
    let fx = app.seed(30).await;
    let token = app.token_for(&fx.admin);
    let sibling = app
        .insert_student(fx.school_id, fx.branch_id, fx.grade_id, "Hana", "Tesfaye")
        .await;
    app.link_parent(sibling, fx.parent_id).await;

    let first = paid_invoice(&app, &token, fx.student_id).await;
    let second = paid_invoice(&app, &token, sibling).await;

    let response = app
        .get(
            &format!("/api/receipts/parent-invoices/{}", fx.parent_phone),
            &token,
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["invoices"].as_array().unwrap().len(), 2);
    assert_eq!(body["parent"]["name"], "Tesfaye Alemu");
    assert_eq!(body["parent"]["phone"], fx.parent_phone.as_str());

    let combined_path = format!("/api/receipts/combined/{}", fx.parent_id);
    let response = app.get(&combined_path, &token).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Some invoices require FS numbers");
    assert_eq!(body["invoicesNeedingFs"].as_array().unwrap().len(), 2);

    for invoice_id in [&first, &second] {
        app.put(
            &format!("/api/receipts/{}/fs-number", invoice_id),
            &token,
            json!({ "fsNumber": format!("FS-{}", &invoice_id[..8]) }),
        )
        .await;
    }

    let response = app.get(&combined_path, &token).await;
    assert_eq!(response.status().as_u16(), 200);
    let html = response.text().await.unwrap();
    assert!(html.contains("Sara Tesfaye"));
    assert!(html.contains("Hana Tesfaye"));
    assert!(html.contains("Tesfaye Alemu"));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn unknown_parent_has_no_combined_receipt() {
    let app = TestApp::spawn().await;
    let fx = app.seed(30).await;
    let token = app.token_for(&fx.admin);

    let response = app
        .get(
            &format!("/api/receipts/combined/{}", uuid::Uuid::new_v4()),
            &token,
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No invoices found for this parent");

    let response = app
        .get("/api/receipts/parent-invoices/0900000000", &token)
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["invoices"].as_array().unwrap().len(), 0);
    assert!(body["parent"].is_null());

    app.cleanup().await;
}
