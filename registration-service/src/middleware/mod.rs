pub mod auth;
pub mod metrics;

pub use auth::{auth_middleware, require_registrar, require_staff, AuthUser, AUTH_COOKIE};
pub use metrics::metrics_middleware;
