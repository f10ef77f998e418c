use service_core::error::AppError;
use thiserror::Error;

use crate::services::metrics::ERRORS_TOTAL;

/// Coarse classification the HTTP boundary maps to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidState,
    Conflict,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Registration not found")]
    RegistrationNotFound,

    #[error("Invoice not found")]
    InvoiceNotFound,

    #[error("Invoice(s) not found")]
    InvoicesNotFound,

    #[error("No invoices found for this parent")]
    NoInvoicesForParent,

    #[error("Class not found")]
    ClassNotFound,

    #[error("Student not found")]
    StudentNotFound,

    #[error("Pricing schema not found for this branch and grade")]
    PricingNotFound,

    #[error("No active academic year found")]
    NoActiveAcademicYear,

    #[error("Registration is not pending payment (status: {status})")]
    RegistrationNotPending { status: String },

    #[error("Student already enrolled")]
    AlreadyEnrolled,

    #[error("Registration payment not completed")]
    PaymentNotCompleted,

    #[error("Student not enrolled")]
    NotEnrolled,

    #[error("Class is at full capacity")]
    ClassFull,

    #[error("Invoice already paid")]
    InvoiceAlreadyPaid,

    #[error("No pending payment found")]
    NoPendingPayment,

    #[error("No pending online payment found")]
    NoPendingOnlinePayment,

    #[error("Parent phone number not found")]
    ParentPhoneMissing,

    #[error("FS number already assigned")]
    FsNumberAlreadyAssigned,

    #[error("Student already has a registration for this academic year")]
    DuplicateRegistration,

    #[error("Access denied to this branch")]
    BranchAccessDenied,

    #[error("Access denied")]
    AccessDenied,

    #[error("Insufficient permissions.")]
    InsufficientPermissions,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::RegistrationNotFound
            | ServiceError::InvoiceNotFound
            | ServiceError::InvoicesNotFound
            | ServiceError::NoInvoicesForParent
            | ServiceError::ClassNotFound
            | ServiceError::StudentNotFound
            | ServiceError::PricingNotFound => ErrorKind::NotFound,

            ServiceError::NoActiveAcademicYear
            | ServiceError::RegistrationNotPending { .. }
            | ServiceError::AlreadyEnrolled
            | ServiceError::PaymentNotCompleted
            | ServiceError::NotEnrolled
            | ServiceError::ClassFull
            | ServiceError::InvoiceAlreadyPaid
            | ServiceError::NoPendingPayment
            | ServiceError::NoPendingOnlinePayment
            | ServiceError::ParentPhoneMissing
            | ServiceError::FsNumberAlreadyAssigned => ErrorKind::InvalidState,

            ServiceError::DuplicateRegistration => ErrorKind::Conflict,

            ServiceError::BranchAccessDenied
            | ServiceError::AccessDenied
            | ServiceError::InsufficientPermissions => ErrorKind::Forbidden,

            ServiceError::Validation(_) => ErrorKind::Validation,

            ServiceError::Database(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                ErrorKind::Conflict
            }
            ServiceError::Database(_) | ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let kind = err.kind();
        ERRORS_TOTAL.with_label_values(&[kind.as_str()]).inc();

        match (kind, err) {
            (_, ServiceError::Database(e)) if kind == ErrorKind::Conflict => {
                tracing::warn!(error = %e, "Unique constraint violated");
                AppError::Conflict(anyhow::anyhow!("Resource already exists"))
            }
            (_, ServiceError::Database(e)) => AppError::DatabaseError(anyhow::Error::new(e)),
            (_, ServiceError::Internal(e)) => AppError::InternalError(e),
            (ErrorKind::NotFound, e) => AppError::NotFound(anyhow::anyhow!(e.to_string())),
            (ErrorKind::Forbidden, e) => AppError::Forbidden(anyhow::anyhow!(e.to_string())),
            (ErrorKind::Conflict, e) => AppError::Conflict(anyhow::anyhow!(e.to_string())),
            (_, e) => AppError::BadRequest(anyhow::anyhow!(e.to_string())),
        }
    }
}
