use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{round_money, PaymentOption, PricingSchema, PricingSchemaDetails, UpsertPricingSchema};
use crate::services::ServiceError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingQuery {
    pub branch_id: Option<Uuid>,
    pub grade_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePricingSchemaRequest {
    pub branch_id: Option<Uuid>,
    pub grade_id: Option<Uuid>,
    pub registration_fee: Option<Decimal>,
    pub monthly_fee: Option<Decimal>,
    pub service_fee: Option<Decimal>,
}

impl SavePricingSchemaRequest {
    /// Every field present and every fee non-negative, rounded to 2 dp.
    pub fn validated(&self, school_id: Uuid) -> Result<UpsertPricingSchema, ServiceError> {
        let (
            Some(branch_id),
            Some(grade_id),
            Some(registration_fee),
            Some(monthly_fee),
            Some(service_fee),
        ) = (
            self.branch_id,
            self.grade_id,
            self.registration_fee,
            self.monthly_fee,
            self.service_fee,
        )
        else {
            return Err(ServiceError::validation("All fields are required"));
        };

        if [registration_fee, monthly_fee, service_fee]
            .iter()
            .any(|fee| *fee < Decimal::ZERO)
        {
            return Err(ServiceError::validation(
                "Fees must be greater than or equal to 0",
            ));
        }

        Ok(UpsertPricingSchema {
            school_id,
            branch_id,
            grade_id,
            registration_fee: round_money(registration_fee),
            monthly_fee: round_money(monthly_fee),
            service_fee: round_money(service_fee),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPricingResponse {
    pub pricing_schema: PricingSchemaDetails,
    pub payment_options: Vec<PaymentOption>,
}

impl From<PricingSchemaDetails> for GetPricingResponse {
    fn from(details: PricingSchemaDetails) -> Self {
        Self {
            payment_options: details.schema.payment_options(),
            pricing_schema: details,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePricingResponse {
    pub message: String,
    pub pricing_schema: PricingSchema,
}
