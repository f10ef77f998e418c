//! Pricing schema model for a branch and grade pair.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{round_money, PaymentDuration};

/// Fee schedule for one branch and grade.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PricingSchema {
    pub id: Uuid,
    pub school_id: Uuid,
    pub branch_id: Uuid,
    pub grade_id: Uuid,
    pub registration_fee: Decimal,
    pub monthly_fee: Decimal,
    pub service_fee: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PricingSchema {
    /// Tuition billed for the chosen duration.
    pub fn additional_fee(&self, duration: PaymentDuration) -> Decimal {
        round_money(self.monthly_fee * duration.months())
    }

    /// Every payment option with its tuition amount.
    pub fn payment_options(&self) -> Vec<PaymentOption> {
        PaymentDuration::ALL
            .iter()
            .map(|duration| PaymentOption {
                duration: *duration,
                label: duration.label().to_string(),
                months: duration.months(),
                additional_fee: self.additional_fee(*duration),
            })
            .collect()
    }
}

/// Pricing schema joined with branch and grade names.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PricingSchemaDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub schema: PricingSchema,
    pub branch_name: String,
    pub grade_name: String,
}

/// One selectable payment duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    pub duration: PaymentDuration,
    pub label: String,
    pub months: Decimal,
    pub additional_fee: Decimal,
}

/// Input for creating or replacing a pricing schema.
#[derive(Debug, Clone)]
pub struct UpsertPricingSchema {
    pub school_id: Uuid,
    pub branch_id: Uuid,
    pub grade_id: Uuid,
    pub registration_fee: Decimal,
    pub monthly_fee: Decimal,
    pub service_fee: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(monthly_fee: &str) -> PricingSchema {
        PricingSchema {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            grade_id: Uuid::new_v4(),
            registration_fee: "500".parse().unwrap(),
            monthly_fee: monthly_fee.parse().unwrap(),
            service_fee: "25".parse().unwrap(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn payment_options_cover_every_duration() {
        let options = schema("1000").payment_options();
        assert_eq!(options.len(), 7);

        let quarter = options
            .iter()
            .find(|o| o.duration == PaymentDuration::Quarter)
            .unwrap();
        assert_eq!(quarter.label, "Quarter (2.5 Months)");
        assert_eq!(quarter.additional_fee, "2500".parse::<Decimal>().unwrap());

        let annual = options.last().unwrap();
        assert_eq!(annual.duration, PaymentDuration::TenMonths);
        assert_eq!(annual.additional_fee, "10000".parse::<Decimal>().unwrap());
    }

    #[test]
    fn additional_fee_is_rounded_to_cents() {
        let fee = schema("333.33").additional_fee(PaymentDuration::Quarter);
        assert_eq!(fee, "833.33".parse::<Decimal>().unwrap());
    }
}
