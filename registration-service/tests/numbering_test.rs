//! Sequence allocation against PostgreSQL.

mod common;

use common::TestApp;
use registration_service::services::numbering::{next_value, registration_scope};
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn same_scope_yields_consecutive_values() {
    let app = TestApp::spawn().await;
    let scope = registration_scope(Uuid::new_v4());

    let mut tx = app.db.pool().begin().await.unwrap();
    let first = next_value(&mut tx, &scope).await.unwrap();
    let second = next_value(&mut tx, &scope).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 2);

    let mut tx = app.db.pool().begin().await.unwrap();
    let other = next_value(&mut tx, "invoice").await.unwrap();
    let third = next_value(&mut tx, &scope).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(other, 1);
    assert_eq!(third, 3);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn rolled_back_allocation_is_reused() {
    let app = TestApp::spawn().await;

    let mut tx = app.db.pool().begin().await.unwrap();
    assert_eq!(next_value(&mut tx, "payment").await.unwrap(), 1);
    tx.rollback().await.unwrap();

    let mut tx = app.db.pool().begin().await.unwrap();
    assert_eq!(next_value(&mut tx, "payment").await.unwrap(), 1);
    tx.commit().await.unwrap();

    app.cleanup().await;
}
