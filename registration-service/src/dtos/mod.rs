pub mod enrollments;
pub mod invoices;
pub mod payments;
pub mod pricing;
pub mod receipts;
pub mod registrations;

pub use enrollments::*;
pub use invoices::*;
pub use payments::*;
pub use pricing::*;
pub use receipts::*;
pub use registrations::*;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::Page;
use crate::services::ServiceError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: Page, total: i64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            pages: page.pages(total),
        }
    }
}

/// Parse an optional enum filter from a query string value.
///
/// Blank values and `ALL` mean "no filter"; anything else must name a variant.
pub(crate) fn parse_filter<T: DeserializeOwned>(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<T>, ServiceError> {
    let value = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => return Ok(None),
        Some(v) => v,
    };

    serde_json::from_value(serde_json::Value::String(value.to_uppercase()))
        .map(Some)
        .map_err(|_| ServiceError::validation(format!("Invalid {}: {}", field, value)))
}
