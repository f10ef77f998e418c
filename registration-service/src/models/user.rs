//! Authenticated actor and role model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::ServiceError;

/// Back-office role carried in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    BranchAdmin,
    Registrar,
    Cashier,
    Teacher,
    Student,
    Parent,
}

impl Role {
    /// Roles allowed to read pricing, take payments and print receipts.
    pub const STAFF: &'static [Role] = &[
        Role::SuperAdmin,
        Role::BranchAdmin,
        Role::Registrar,
        Role::Cashier,
    ];

    /// Roles allowed to open registrations and manage enrollments.
    pub const REGISTRARS: &'static [Role] = &[Role::SuperAdmin, Role::BranchAdmin, Role::Registrar];

    /// Roles allowed to edit pricing schemas.
    pub const PRICING_ADMINS: &'static [Role] = &[Role::SuperAdmin, Role::BranchAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::BranchAdmin => "BRANCH_ADMIN",
            Role::Registrar => "REGISTRAR",
            Role::Cashier => "CASHIER",
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
            Role::Parent => "PARENT",
        }
    }

    /// Branch-bound roles only see their own branch's records.
    pub fn is_branch_scoped(&self) -> bool {
        matches!(self, Role::BranchAdmin | Role::Registrar | Role::Cashier)
    }
}

/// The user on whose behalf a request runs, taken from validated token claims.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    pub school_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Actor {
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Super admins reach every branch; everyone else only their own.
    pub fn can_access_branch(&self, branch_id: Uuid) -> bool {
        self.is_super_admin() || self.branch_id == Some(branch_id)
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), ServiceError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ServiceError::InsufficientPermissions)
        }
    }

    pub fn require_branch(&self, branch_id: Uuid) -> Result<(), ServiceError> {
        if self.can_access_branch(branch_id) {
            Ok(())
        } else {
            Err(ServiceError::BranchAccessDenied)
        }
    }

    /// Branch filter for list queries. Super admins keep whatever they asked
    /// for; other roles are pinned to their own branch.
    pub fn resolve_branch_filter(
        &self,
        requested: Option<Uuid>,
    ) -> Result<Option<Uuid>, ServiceError> {
        if self.is_super_admin() {
            return Ok(requested);
        }
        self.branch_id.map(Some).ok_or(ServiceError::AccessDenied)
    }
}
