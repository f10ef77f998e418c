//! Registration model: a student's fee obligation for an academic year.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Page;

/// Registration lifecycle status.
///
/// Moves forward PENDING_PAYMENT -> PAYMENT_COMPLETED -> ENROLLED. Unenrolling
/// moves ENROLLED back to PAYMENT_COMPLETED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    PendingPayment,
    PaymentCompleted,
    Enrolled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::PendingPayment => "PENDING_PAYMENT",
            RegistrationStatus::PaymentCompleted => "PAYMENT_COMPLETED",
            RegistrationStatus::Enrolled => "ENROLLED",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "PAYMENT_COMPLETED" => RegistrationStatus::PaymentCompleted,
            "ENROLLED" => RegistrationStatus::Enrolled,
            _ => RegistrationStatus::PendingPayment,
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many months of tuition are paid up front with the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentDuration {
    OneMonth,
    TwoMonths,
    Quarter,
    ThreeMonths,
    FourMonths,
    FiveMonths,
    TenMonths,
}

impl PaymentDuration {
    pub const ALL: [PaymentDuration; 7] = [
        PaymentDuration::OneMonth,
        PaymentDuration::TwoMonths,
        PaymentDuration::Quarter,
        PaymentDuration::ThreeMonths,
        PaymentDuration::FourMonths,
        PaymentDuration::FiveMonths,
        PaymentDuration::TenMonths,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentDuration::OneMonth => "ONE_MONTH",
            PaymentDuration::TwoMonths => "TWO_MONTHS",
            PaymentDuration::Quarter => "QUARTER",
            PaymentDuration::ThreeMonths => "THREE_MONTHS",
            PaymentDuration::FourMonths => "FOUR_MONTHS",
            PaymentDuration::FiveMonths => "FIVE_MONTHS",
            PaymentDuration::TenMonths => "TEN_MONTHS",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "TWO_MONTHS" => PaymentDuration::TwoMonths,
            "QUARTER" => PaymentDuration::Quarter,
            "THREE_MONTHS" => PaymentDuration::ThreeMonths,
            "FOUR_MONTHS" => PaymentDuration::FourMonths,
            "FIVE_MONTHS" => PaymentDuration::FiveMonths,
            "TEN_MONTHS" => PaymentDuration::TenMonths,
            _ => PaymentDuration::OneMonth,
        }
    }

    /// Monthly-fee multiplier. A quarter bills two and a half months.
    pub fn months(&self) -> Decimal {
        match self {
            PaymentDuration::OneMonth => Decimal::ONE,
            PaymentDuration::TwoMonths => Decimal::from(2),
            PaymentDuration::Quarter => Decimal::new(25, 1),
            PaymentDuration::ThreeMonths => Decimal::from(3),
            PaymentDuration::FourMonths => Decimal::from(4),
            PaymentDuration::FiveMonths => Decimal::from(5),
            PaymentDuration::TenMonths => Decimal::from(10),
        }
    }

    /// Label shown in the payment-option picker.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentDuration::OneMonth => "1 Month",
            PaymentDuration::TwoMonths => "2 Months",
            PaymentDuration::Quarter => "Quarter (2.5 Months)",
            PaymentDuration::ThreeMonths => "3 Months",
            PaymentDuration::FourMonths => "4 Months",
            PaymentDuration::FiveMonths => "5 Months",
            PaymentDuration::TenMonths => "10 Months",
        }
    }

    /// Description of the tuition line on the invoice.
    pub fn fee_description(&self) -> &'static str {
        match self {
            PaymentDuration::OneMonth => "Monthly Fee (1 Month)",
            PaymentDuration::TwoMonths => "Monthly Fee (1st & Last Month)",
            PaymentDuration::Quarter => "Quarterly Fee (2.5 Months)",
            PaymentDuration::ThreeMonths => "Monthly Fee (3 Months)",
            PaymentDuration::FourMonths => "Monthly Fee (4 Months)",
            PaymentDuration::FiveMonths => "Monthly Fee (5 Months)",
            PaymentDuration::TenMonths => "Annual Fee (10 Months)",
        }
    }
}

/// Registration record with its fee snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    pub student_id: Uuid,
    pub branch_id: Uuid,
    pub grade_id: Uuid,
    pub academic_year_id: Uuid,
    pub registration_number: String,
    pub status: String,
    pub registration_fee: Decimal,
    pub additional_fee: Decimal,
    pub service_fee: Decimal,
    pub total_amount: Decimal,
    pub discount_percentage: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
    pub payment_duration: String,
    pub payment_due_date: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub enrolled_at: Option<DateTime<Utc>>,
    pub enrolled_by_id: Option<Uuid>,
    pub created_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn status(&self) -> RegistrationStatus {
        RegistrationStatus::from_string(&self.status)
    }

    pub fn payment_duration(&self) -> PaymentDuration {
        PaymentDuration::from_string(&self.payment_duration)
    }
}

/// Registration joined with student, branch, grade and its latest invoice/payment.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationListRow {
    pub id: Uuid,
    pub registration_number: String,
    pub status: String,
    pub payment_duration: String,
    pub registration_fee: Decimal,
    pub additional_fee: Decimal,
    pub service_fee: Decimal,
    pub total_amount: Decimal,
    pub discount_amount: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
    pub payment_due_date: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub enrolled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub student_id: Uuid,
    pub student_code: String,
    pub student_first_name: String,
    pub student_last_name: String,
    pub student_email: String,
    pub student_phone: Option<String>,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub branch_code: String,
    pub grade_id: Uuid,
    pub grade_name: String,
    pub grade_level: i32,
    pub latest_invoice_id: Option<Uuid>,
    pub latest_invoice_number: Option<String>,
    pub latest_invoice_status: Option<String>,
    pub latest_invoice_total: Option<Decimal>,
    pub latest_invoice_paid: Option<Decimal>,
    pub latest_payment_id: Option<Uuid>,
    pub latest_payment_number: Option<String>,
    pub latest_payment_method: Option<String>,
    pub latest_payment_status: Option<String>,
    pub latest_payment_amount: Option<Decimal>,
    pub latest_payment_created_at: Option<DateTime<Utc>>,
}

/// Filter parameters for listing registrations.
#[derive(Debug, Clone, Default)]
pub struct ListRegistrationsFilter {
    pub page: Page,
    pub search: Option<String>,
    pub status: Option<RegistrationStatus>,
    pub payment_duration: Option<PaymentDuration>,
    pub branch_id: Option<Uuid>,
    pub grade_id: Option<Uuid>,
}

/// Input for opening a registration.
#[derive(Debug, Clone)]
pub struct CreateRegistration {
    pub student_id: Uuid,
    pub grade_id: Option<Uuid>,
    pub payment_duration: PaymentDuration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_round_trips_through_storage_string() {
        for duration in PaymentDuration::ALL {
            assert_eq!(PaymentDuration::from_string(duration.as_str()), duration);
        }
    }

    #[test]
    fn quarter_bills_two_and_a_half_months() {
        assert_eq!(PaymentDuration::Quarter.months().to_string(), "2.5");
        assert_eq!(
            PaymentDuration::Quarter.fee_description(),
            "Quarterly Fee (2.5 Months)"
        );
        assert_eq!(
            PaymentDuration::TwoMonths.fee_description(),
            "Monthly Fee (1st & Last Month)"
        );
    }

    #[test]
    fn status_serializes_in_upper_snake_case() {
        let json = serde_json::to_string(&RegistrationStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"PENDING_PAYMENT\"");
        assert_eq!(
            RegistrationStatus::from_string("ENROLLED"),
            RegistrationStatus::Enrolled
        );
    }
}
