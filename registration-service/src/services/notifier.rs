//! Post-commit SMS notifications to parents.
//!
//! Delivery runs on a detached task. Failures are logged and counted, never
//! returned to the request that triggered them.

use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::services::metrics::SMS_TOTAL;
use crate::services::providers::{SmsMessage, SmsProvider};

#[derive(Clone)]
pub struct SmsNotifier {
    provider: Arc<dyn SmsProvider>,
    app_url: String,
}

impl SmsNotifier {
    pub fn new(provider: Arc<dyn SmsProvider>, app_url: impl Into<String>) -> Self {
        Self {
            provider,
            app_url: app_url.into(),
        }
    }

    pub fn payment_link(&self, invoice_id: Uuid) -> String {
        format!("{}/payment/{}", self.app_url, invoice_id)
    }

    pub fn enrollment_ready_text(registration_number: &str, student_name: &str) -> String {
        format!(
            "Payment received for {} (registration {}). The student is ready for enrollment.",
            student_name, registration_number
        )
    }

    pub fn payment_link_text(amount: Decimal, link: &str) -> String {
        format!(
            "Please complete the registration payment of {} ETB here: {}",
            amount, link
        )
    }

    pub fn notify_enrollment_ready(
        &self,
        phone: String,
        registration_number: &str,
        student_name: &str,
    ) {
        let body = Self::enrollment_ready_text(registration_number, student_name);
        self.dispatch("enrollment_ready", phone, body);
    }

    pub fn notify_payment_link(&self, phone: String, amount: Decimal, invoice_id: Uuid) {
        let body = Self::payment_link_text(amount, &self.payment_link(invoice_id));
        self.dispatch("payment_link", phone, body);
    }

    fn dispatch(&self, kind: &'static str, to: String, body: String) {
        if !self.provider.is_enabled() {
            tracing::info!(kind, "SMS provider disabled, skipping notification");
            SMS_TOTAL.with_label_values(&[kind, "skipped"]).inc();
            return;
        }

        let provider = self.provider.clone();
        tokio::spawn(async move {
            match provider.send(&SmsMessage { to, body }).await {
                Ok(response) => {
                    SMS_TOTAL.with_label_values(&[kind, "sent"]).inc();
                    tracing::info!(
                        kind,
                        provider_id = ?response.provider_id,
                        "SMS notification sent"
                    );
                }
                Err(e) => {
                    SMS_TOTAL.with_label_values(&[kind, "failed"]).inc();
                    tracing::warn!(kind, error = %e, "SMS notification failed");
                }
            }
        });
    }
}
