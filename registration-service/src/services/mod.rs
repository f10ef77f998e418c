//! Services layer for registration-service.
//!
//! Business logic for pricing, registrations, payments, invoices,
//! enrollments and receipts, plus the database, metrics and SMS plumbing
//! they share.

mod database;
pub mod enrollments;
pub mod error;
pub mod export;
pub mod fees;
pub mod invoices;
mod jwt;
pub mod lookups;
pub mod metrics;
mod notifier;
pub mod numbering;
pub mod payment_processor;
pub mod pricing;
pub mod providers;
pub mod receipt_format;
pub mod receipt_render;
pub mod receipts;
pub mod registrations;

pub use database::Database;
pub use enrollments::EnrollmentService;
pub use error::{ErrorKind, ServiceError};
pub use invoices::{InvoiceDetails, InvoiceService, ResentLink};
pub use jwt::{AccessTokenClaims, JwtService};
pub use metrics::{get_metrics, init_metrics};
pub use notifier::SmsNotifier;
pub use payment_processor::{PaymentOutcome, PaymentProcessor};
pub use pricing::PricingService;
pub use receipts::{ReceiptOutcome, ReceiptService};
pub use registrations::RegistrationService;
