use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::services::receipts::{FsPending, ParentInvoiceSummary, ParentInvoices, ReceiptParent};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReceiptRequest {
    #[serde(default)]
    pub invoice_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFsNumberRequest {
    #[validate(length(max = 50, message = "FS number is too long"))]
    pub fs_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFsNumberResponse {
    pub message: String,
    pub fs_number: String,
}

/// 400 body returned instead of a receipt while FS numbers are missing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedsFsNumberResponse {
    pub error: String,
    pub needs_fs_number: bool,
    pub invoices_needing_fs: Vec<FsPending>,
}

impl NeedsFsNumberResponse {
    pub fn new(error: &str, invoices_needing_fs: Vec<FsPending>) -> Self {
        Self {
            error: error.to_string(),
            needs_fs_number: true,
            invoices_needing_fs,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParentInfo {
    pub name: String,
    pub phone: Option<String>,
}

impl From<ReceiptParent> for ParentInfo {
    fn from(parent: ReceiptParent) -> Self {
        Self {
            name: parent.name,
            phone: parent.phone,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParentInvoicesResponse {
    pub invoices: Vec<ParentInvoiceSummary>,
    pub parent: Option<ParentInfo>,
}

impl From<ParentInvoices> for ParentInvoicesResponse {
    fn from(found: ParentInvoices) -> Self {
        Self {
            invoices: found.invoices,
            parent: found.parent.map(ParentInfo::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_fs_body_shape() {
        let id = Uuid::new_v4();
        let body = NeedsFsNumberResponse::new(
            "FS number required",
            vec![FsPending {
                id,
                student_name: "Sara Tesfaye".to_string(),
            }],
        );
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["error"], "FS number required");
        assert_eq!(json["needsFsNumber"], true);
        assert_eq!(json["invoicesNeedingFs"][0]["studentName"], "Sara Tesfaye");
        assert_eq!(json["invoicesNeedingFs"][0]["id"], id.to_string());
    }

    #[test]
    fn generate_request_defaults_to_no_ids() {
        let req: GenerateReceiptRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(req.invoice_ids.is_empty());
    }
}
