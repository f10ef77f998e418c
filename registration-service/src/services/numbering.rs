//! Document numbering backed by the `number_sequences` table.
//!
//! Each scope is one row. Allocation upserts the row and returns the new
//! value, so the row lock taken by the upsert serialises concurrent
//! allocators until the surrounding transaction ends. A rolled back
//! transaction gives its value back.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::services::metrics::DB_QUERY_DURATION;

pub const INVOICE_SCOPE: &str = "invoice";
pub const PAYMENT_SCOPE: &str = "payment";

pub fn registration_scope(branch_id: Uuid) -> String {
    format!("registration:{}", branch_id)
}

/// Allocate the next value of `scope` inside the caller's transaction.
pub async fn next_value(conn: &mut PgConnection, scope: &str) -> Result<i64, sqlx::Error> {
    let timer = DB_QUERY_DURATION
        .with_label_values(&["next_sequence_value"])
        .start_timer();

    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO number_sequences (scope, last_value)
        VALUES ($1, 1)
        ON CONFLICT (scope) DO UPDATE SET last_value = number_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(scope)
    .fetch_one(conn)
    .await?;

    timer.observe_duration();

    Ok(value)
}

pub fn invoice_number(now: DateTime<Utc>, sequence: i64) -> String {
    format!("INV-{}-{:04}", now.timestamp_millis(), sequence)
}

pub fn payment_number(now: DateTime<Utc>, sequence: i64) -> String {
    format!("PAY-{}-{:04}", now.timestamp_millis(), sequence)
}

pub fn registration_number(branch_code: &str, sequence: i64) -> String {
    format!("REG-{}-{:05}", branch_code, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn numbers_carry_prefix_timestamp_and_padded_sequence() {
        let now = Utc.timestamp_millis_opt(1_730_000_000_123).unwrap();
        assert_eq!(invoice_number(now, 7), "INV-1730000000123-0007");
        assert_eq!(payment_number(now, 12345), "PAY-1730000000123-12345");
        assert_eq!(registration_number("BOL", 42), "REG-BOL-00042");
    }

    #[test]
    fn registration_scope_is_per_branch() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(registration_scope(a), registration_scope(b));
        assert!(registration_scope(a).starts_with("registration:"));
    }
}
