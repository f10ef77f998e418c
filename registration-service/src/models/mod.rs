//! Domain models for registration-service.

pub mod enrollment;
pub mod invoice;
pub mod payment;
pub mod people;
pub mod pricing;
pub mod registration;
pub mod user;

pub use enrollment::{
    AcademicYear, ClassRecord, EnrolledStudentRow, Enrollment, EnrollmentStats, EnrollmentStatus,
    ExportEnrolledFilter,
};
pub use invoice::{
    FeeTypeCode, Invoice, InvoiceItem, InvoiceListRow, InvoiceStatus, ListInvoicesFilter,
};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use people::{BranchRecord, ParentContact, StudentRecord};
pub use pricing::{PaymentOption, PricingSchema, PricingSchemaDetails, UpsertPricingSchema};
pub use registration::{
    CreateRegistration, ListRegistrationsFilter, PaymentDuration, Registration,
    RegistrationListRow, RegistrationStatus,
};
pub use user::{Actor, Role};

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a currency amount to 2 decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Page/limit pair shared by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
