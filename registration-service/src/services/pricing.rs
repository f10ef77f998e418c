//! Pricing schema lookups and upserts.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::dtos::SavePricingSchemaRequest;
use crate::models::{Actor, PricingSchema, PricingSchemaDetails, Role, UpsertPricingSchema};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::{Database, ServiceError};

#[derive(Clone)]
pub struct PricingService {
    db: Database,
}

impl PricingService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Active schema for a branch and grade. There is no fallback schema.
    #[instrument(skip(self))]
    pub async fn get_pricing_schema(
        &self,
        branch_id: Option<Uuid>,
        grade_id: Option<Uuid>,
    ) -> Result<PricingSchemaDetails, ServiceError> {
        let (branch_id, grade_id) = branch_id
            .zip(grade_id)
            .ok_or_else(|| ServiceError::validation("Branch ID and Grade ID are required"))?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_pricing_schema"])
            .start_timer();

        let schema = sqlx::query_as::<_, PricingSchemaDetails>(
            r#"
            SELECT ps.id, ps.school_id, ps.branch_id, ps.grade_id, ps.registration_fee,
                   ps.monthly_fee, ps.service_fee, ps.is_active, ps.created_at, ps.updated_at,
                   b.name AS branch_name, g.name AS grade_name
            FROM pricing_schemas ps
            JOIN branches b ON b.id = ps.branch_id
            JOIN grades g ON g.id = ps.grade_id
            WHERE ps.branch_id = $1 AND ps.grade_id = $2 AND ps.is_active = TRUE
            "#,
        )
        .bind(branch_id)
        .bind(grade_id)
        .fetch_optional(self.db.pool())
        .await?;

        timer.observe_duration();

        schema.ok_or(ServiceError::PricingNotFound)
    }

    /// Create or replace the schema for a branch and grade.
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn save_pricing_schema(
        &self,
        actor: &Actor,
        request: &SavePricingSchemaRequest,
    ) -> Result<PricingSchema, ServiceError> {
        actor.require_any(Role::PRICING_ADMINS)?;
        let school_id = actor
            .school_id
            .ok_or_else(|| ServiceError::validation("User school not found"))?;
        let input = request.validated(school_id)?;
        actor.require_branch(input.branch_id)?;

        let schema = self.upsert(&input).await?;

        info!(
            pricing_schema_id = %schema.id,
            branch_id = %schema.branch_id,
            grade_id = %schema.grade_id,
            "Pricing schema saved"
        );

        Ok(schema)
    }

    async fn upsert(&self, input: &UpsertPricingSchema) -> Result<PricingSchema, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_pricing_schema"])
            .start_timer();

        let schema = sqlx::query_as::<_, PricingSchema>(
            r#"
            INSERT INTO pricing_schemas
                (school_id, branch_id, grade_id, registration_fee, monthly_fee, service_fee, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            ON CONFLICT (branch_id, grade_id) DO UPDATE SET
                school_id = EXCLUDED.school_id,
                registration_fee = EXCLUDED.registration_fee,
                monthly_fee = EXCLUDED.monthly_fee,
                service_fee = EXCLUDED.service_fee,
                is_active = TRUE,
                updated_at = now()
            RETURNING id, school_id, branch_id, grade_id, registration_fee, monthly_fee,
                      service_fee, is_active, created_at, updated_at
            "#,
        )
        .bind(input.school_id)
        .bind(input.branch_id)
        .bind(input.grade_id)
        .bind(input.registration_fee)
        .bind(input.monthly_fee)
        .bind(input.service_fee)
        .fetch_one(self.db.pool())
        .await?;

        timer.observe_duration();

        Ok(schema)
    }
}
