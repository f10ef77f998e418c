//! Registration payment: invoice, lines, payment and status change in one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::dtos::ProcessPaymentRequest;
use crate::models::{
    Actor, Invoice, InvoiceItem, InvoiceStatus, ParentContact, Payment, PaymentMethod,
    PaymentStatus, Registration, RegistrationStatus, Role, StudentRecord,
};
use crate::services::fees::{invoice_lines, FeeBreakdown};
use crate::services::metrics::{DB_QUERY_DURATION, INVOICES_TOTAL, PAYMENTS_TOTAL};
use crate::services::{lookups, numbering, Database, ServiceError, SmsNotifier};

/// Payment request that passed the checks which need no database access.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayment {
    pub registration_id: Uuid,
    pub method: PaymentMethod,
    pub discount_percentage: Option<Decimal>,
    pub reference: Option<String>,
    pub paid_amount: Option<Decimal>,
    pub notes: Option<String>,
    pub payment_date: DateTime<Utc>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Required fields, then manual-method evidence, then the discount range.
pub fn validate_payment_request(
    request: &ProcessPaymentRequest,
) -> Result<ValidatedPayment, ServiceError> {
    let method = non_blank(&request.payment_method);
    let (registration_id, method) = match (request.registration_id, method) {
        (Some(id), Some(method)) => (id, method),
        _ => {
            return Err(ServiceError::validation(
                "Registration ID and payment method are required",
            ))
        }
    };
    let method = PaymentMethod::parse(&method)
        .ok_or_else(|| ServiceError::validation(format!("Invalid payment method: {}", method)))?;

    let receipt_number = non_blank(&request.receipt_number);
    let transaction_number = non_blank(&request.transaction_number);

    if method.is_manual() {
        if receipt_number.is_none() && transaction_number.is_none() {
            return Err(ServiceError::validation(
                "Receipt number or transaction number is required for manual payments",
            ));
        }
        if !request.paid_amount.is_some_and(|amount| amount > Decimal::ZERO) {
            return Err(ServiceError::validation(
                "Paid amount must be greater than 0 for manual payments",
            ));
        }
    }

    if let Some(pct) = request.discount_percentage {
        if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
            return Err(ServiceError::validation(
                "Discount percentage must be between 0 and 100",
            ));
        }
    }

    Ok(ValidatedPayment {
        registration_id,
        method,
        discount_percentage: request.discount_percentage,
        reference: transaction_number.or(receipt_number),
        paid_amount: request.paid_amount,
        notes: non_blank(&request.notes),
        payment_date: request.payment_date.unwrap_or_else(Utc::now),
    })
}

/// Everything written by one payment.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub registration: Registration,
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payment: Payment,
}

impl PaymentOutcome {
    pub fn is_settled(&self) -> bool {
        self.payment.status() == PaymentStatus::Completed
    }
}

struct Committed {
    outcome: PaymentOutcome,
    student: Option<StudentRecord>,
    parent: Option<ParentContact>,
}

#[derive(Clone)]
pub struct PaymentProcessor {
    db: Database,
    notifier: SmsNotifier,
}

impl PaymentProcessor {
    pub fn new(db: Database, notifier: SmsNotifier) -> Self {
        Self { db, notifier }
    }

    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn handle_payment(
        &self,
        actor: &Actor,
        request: &ProcessPaymentRequest,
    ) -> Result<PaymentOutcome, ServiceError> {
        actor.require_any(Role::STAFF)?;
        let payment = validate_payment_request(request)?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["handle_payment"])
            .start_timer();

        let mut tx = self.db.pool().begin().await?;
        let committed = match Self::write_payment(&mut tx, actor, &payment).await {
            Ok(committed) => committed,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };
        tx.commit().await?;
        timer.observe_duration();

        let outcome = committed.outcome;
        let settled = outcome.is_settled();
        PAYMENTS_TOTAL
            .with_label_values(&[payment.method.as_str(), outcome.payment.status.as_str()])
            .inc();
        INVOICES_TOTAL
            .with_label_values(&[outcome.invoice.status.as_str()])
            .inc();

        info!(
            registration_id = %outcome.registration.id,
            invoice_number = %outcome.invoice.invoice_number,
            payment_number = %outcome.payment.payment_number,
            method = payment.method.as_str(),
            final_amount = %outcome.invoice.final_amount,
            "Registration payment processed"
        );

        if let Some(phone) = committed.parent.and_then(|p| p.phone) {
            if settled {
                let student_name = committed
                    .student
                    .map(|s| s.full_name())
                    .unwrap_or_default();
                self.notifier.notify_enrollment_ready(
                    phone,
                    &outcome.registration.registration_number,
                    &student_name,
                );
            } else {
                self.notifier
                    .notify_payment_link(phone, outcome.invoice.final_amount, outcome.invoice.id);
            }
        }

        Ok(outcome)
    }

    async fn write_payment(
        tx: &mut Transaction<'_, Postgres>,
        actor: &Actor,
        payment: &ValidatedPayment,
    ) -> Result<Committed, ServiceError> {
        let registration = lookups::registration_for_update(&mut **tx, payment.registration_id)
            .await?
            .ok_or(ServiceError::RegistrationNotFound)?;

        if registration.status() != RegistrationStatus::PendingPayment {
            return Err(ServiceError::RegistrationNotPending {
                status: registration.status.clone(),
            });
        }
        if actor.role.is_branch_scoped() {
            actor.require_branch(registration.branch_id)?;
        }

        let manual = payment.method.is_manual();
        let fees = FeeBreakdown::compute(
            registration.registration_fee,
            registration.additional_fee,
            payment.discount_percentage,
        );
        let actual_paid = fees.actual_paid_amount(payment.method, payment.paid_amount);
        let now = Utc::now();

        let invoice_sequence = numbering::next_value(&mut **tx, numbering::INVOICE_SCOPE).await?;
        let payment_sequence = numbering::next_value(&mut **tx, numbering::PAYMENT_SCOPE).await?;

        let invoice_status = if manual {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Pending
        };
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                id, invoice_number, student_id, branch_id, registration_id, total_amount,
                discount_amount, final_amount, paid_amount, status, due_date, created_by_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(numbering::invoice_number(now, invoice_sequence))
        .bind(registration.student_id)
        .bind(registration.branch_id)
        .bind(registration.id)
        .bind(fees.base_total)
        .bind(fees.discount_amount)
        .bind(fees.final_amount)
        .bind(actual_paid)
        .bind(invoice_status.as_str())
        .bind(registration.payment_due_date)
        .bind(actor.user_id)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        let mut items = Vec::new();
        for line in invoice_lines(
            registration.registration_fee,
            registration.additional_fee,
            registration.payment_duration(),
        ) {
            let fee_type_id = match lookups::fee_type_id(&mut **tx, line.fee_type).await? {
                Some(id) => id,
                None => lookups::insert_fee_type(&mut **tx, line.fee_type).await?,
            };
            let item = sqlx::query_as::<_, InvoiceItem>(
                r#"
                INSERT INTO invoice_items (id, invoice_id, fee_type_id, description, amount, quantity)
                VALUES ($1, $2, $3, $4, $5, 1)
                RETURNING id, invoice_id, fee_type_id, description, amount, quantity
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice.id)
            .bind(fee_type_id)
            .bind(&line.description)
            .bind(line.amount)
            .fetch_one(&mut **tx)
            .await?;
            items.push(item);
        }

        let payment_status = if manual {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Pending
        };
        let payment_row = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, payment_number, invoice_id, student_id, registration_id, branch_id, amount,
                payment_method, status, transaction_id, notes, payment_date, processed_by_id,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(numbering::payment_number(now, payment_sequence))
        .bind(invoice.id)
        .bind(registration.student_id)
        .bind(registration.id)
        .bind(registration.branch_id)
        .bind(actual_paid)
        .bind(payment.method.as_str())
        .bind(payment_status.as_str())
        .bind(payment.reference.as_deref())
        .bind(payment.notes.as_deref())
        .bind(payment.payment_date)
        .bind(actor.user_id)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        let registration = if manual {
            sqlx::query_as::<_, Registration>(
                r#"
                UPDATE registrations
                SET status = $2, paid_amount = $3, completed_at = $4,
                    discount_percentage = $5, discount_amount = $6, updated_at = $4
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(registration.id)
            .bind(RegistrationStatus::PaymentCompleted.as_str())
            .bind(actual_paid)
            .bind(now)
            .bind(payment.discount_percentage)
            .bind(fees.discount_amount)
            .fetch_one(&mut **tx)
            .await?
        } else {
            sqlx::query_as::<_, Registration>(
                r#"
                UPDATE registrations
                SET discount_percentage = $2, discount_amount = $3, updated_at = $4
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(registration.id)
            .bind(payment.discount_percentage)
            .bind(fees.discount_amount)
            .bind(now)
            .fetch_one(&mut **tx)
            .await?
        };

        let student = lookups::student(&mut **tx, registration.student_id).await?;
        let parent = lookups::primary_parent(&mut **tx, registration.student_id).await?;

        Ok(Committed {
            outcome: PaymentOutcome {
                registration,
                invoice,
                items,
                payment: payment_row,
            },
            student,
            parent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str) -> ProcessPaymentRequest {
        ProcessPaymentRequest {
            registration_id: Some(Uuid::new_v4()),
            payment_method: Some(method.to_string()),
            discount_percentage: None,
            receipt_number: Some("RCPT-001".to_string()),
            transaction_number: None,
            paid_amount: Some("1350".parse().unwrap()),
            notes: None,
            payment_date: None,
        }
    }

    fn message(err: ServiceError) -> String {
        assert!(matches!(err, ServiceError::Validation(_)));
        err.to_string()
    }

    #[test]
    fn missing_method_is_rejected_first() {
        let mut req = request("CASH");
        req.payment_method = None;
        req.discount_percentage = Some("150".parse().unwrap());
        assert_eq!(
            message(validate_payment_request(&req).unwrap_err()),
            "Registration ID and payment method are required"
        );
    }

    #[test]
    fn manual_payment_needs_a_reference_and_amount() {
        let mut req = request("BANK_TRANSFER");
        req.receipt_number = Some("   ".to_string());
        assert!(message(validate_payment_request(&req).unwrap_err()).contains("Receipt number"));

        let mut req = request("CASH");
        req.paid_amount = Some(Decimal::ZERO);
        assert!(message(validate_payment_request(&req).unwrap_err()).contains("Paid amount"));
    }

    #[test]
    fn online_payment_needs_no_reference() {
        let mut req = request("TELEBIRR");
        req.receipt_number = None;
        req.paid_amount = None;
        let validated = validate_payment_request(&req).unwrap();
        assert_eq!(validated.method, PaymentMethod::Telebirr);
        assert_eq!(validated.reference, None);
    }

    #[test]
    fn discount_outside_range_is_rejected() {
        for pct in ["-0.01", "100.01", "250"] {
            let mut req = request("CASH");
            req.discount_percentage = Some(pct.parse().unwrap());
            assert!(message(validate_payment_request(&req).unwrap_err()).contains("between 0 and 100"));
        }

        let mut req = request("CASH");
        req.discount_percentage = Some(Decimal::ONE_HUNDRED);
        assert!(validate_payment_request(&req).is_ok());
    }

    #[test]
    fn transaction_number_wins_over_receipt_number() {
        let mut req = request("CASH");
        req.transaction_number = Some("TX-9".to_string());
        assert_eq!(
            validate_payment_request(&req).unwrap().reference.as_deref(),
            Some("TX-9")
        );
    }

    #[test]
    fn unknown_method_is_a_validation_error() {
        let req = request("CHEQUE");
        assert!(message(validate_payment_request(&req).unwrap_err()).contains("Invalid payment method"));
    }
}
